//! Case-insensitive, order-preserving header storage.

use std::collections::HashMap;

use http::HeaderName;

use crate::ensure;
use crate::protocol::InvalidHeaderValue;

/// Header names mapped to their ordered values.
///
/// Names keep the casing they were last set with; lookups are case-insensitive
/// through a lowercase index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// Values stored under `name`, empty when the header is absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.position(name).map(|i| self.entries[i].1.as_slice()).unwrap_or_default()
    }

    /// Values of `name` joined by `", "`.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Canonical name the header is stored under.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].0.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Replaces every value of `name`, storing it under the new casing at the end.
    pub(crate) fn set(&mut self, name: &str, values: Vec<String>) {
        self.remove(name);
        self.push(name.to_string(), values);
    }

    /// Merges `values` into an existing header, dropping duplicates while keeping
    /// first-seen order, or adds the header when absent.
    pub(crate) fn append(&mut self, name: &str, values: Vec<String>) {
        let Some(i) = self.position(name) else {
            self.push(name.to_string(), values);
            return;
        };

        let current = &mut self.entries[i].1;
        let mut merged: Vec<String> = Vec::with_capacity(current.len() + values.len());
        for value in current.drain(..).chain(values) {
            if !merged.contains(&value) {
                merged.push(value);
            }
        }
        *current = merged;
    }

    /// Sets a single-valued header and moves it to the front, keeping any
    /// existing casing of the name.
    pub(crate) fn set_first(&mut self, name: &str, value: String) {
        let canonical = self.canonical_name(name).unwrap_or(name).to_string();
        self.remove(name);
        self.entries.insert(0, (canonical, vec![value]));
        self.reindex();
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        match self.index.remove(&name.to_ascii_lowercase()) {
            Some(i) => {
                self.entries.remove(i);
                self.reindex();
                true
            }
            None => false,
        }
    }

    fn push(&mut self, name: String, values: Vec<String>) {
        self.index.insert(name.to_ascii_lowercase(), self.entries.len());
        self.entries.push((name, values));
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, (name, _)) in self.entries.iter().enumerate() {
            self.index.insert(name.to_ascii_lowercase(), i);
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Checks that `name` is a non-empty http token.
pub fn validate_name(name: &str) -> Result<(), InvalidHeaderValue> {
    ensure!(!name.is_empty(), InvalidHeaderValue::new("header name can not be empty"));
    HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|_| InvalidHeaderValue::new(format!("`{name}` is not a valid header name")))
}

/// A single header value: a string or a number.
pub trait HeaderScalar {
    fn into_header_value(self) -> String;
}

/// Anything that can be stored as the values of one header.
///
/// Scalars become one value; vectors, slices and arrays of scalars become one value
/// per element. Values are trimmed of surrounding spaces and tabs, and fail when
/// they contain CR, LF or NUL or when a sequence is empty.
pub trait IntoHeaderValues {
    fn into_header_values(self) -> Result<Vec<String>, InvalidHeaderValue>;
}

macro_rules! header_scalars {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HeaderScalar for $ty {
                #[inline]
                fn into_header_value(self) -> String {
                    self.to_string()
                }
            }

            impl IntoHeaderValues for $ty {
                fn into_header_values(self) -> Result<Vec<String>, InvalidHeaderValue> {
                    normalize(vec![self.into_header_value()])
                }
            }
        )*
    };
}

header_scalars!(&str, String, &String, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: HeaderScalar> IntoHeaderValues for Vec<T> {
    fn into_header_values(self) -> Result<Vec<String>, InvalidHeaderValue> {
        normalize(self.into_iter().map(HeaderScalar::into_header_value).collect())
    }
}

impl<T: HeaderScalar + Clone> IntoHeaderValues for &[T] {
    fn into_header_values(self) -> Result<Vec<String>, InvalidHeaderValue> {
        normalize(self.iter().cloned().map(HeaderScalar::into_header_value).collect())
    }
}

impl<T: HeaderScalar, const N: usize> IntoHeaderValues for [T; N] {
    fn into_header_values(self) -> Result<Vec<String>, InvalidHeaderValue> {
        normalize(self.into_iter().map(HeaderScalar::into_header_value).collect())
    }
}

fn normalize(values: Vec<String>) -> Result<Vec<String>, InvalidHeaderValue> {
    ensure!(!values.is_empty(), InvalidHeaderValue::new("header value can not be an empty sequence"));

    values
        .into_iter()
        .map(|value| {
            ensure!(
                !value.contains(['\r', '\n', '\0']),
                InvalidHeaderValue::new(format!("`{}` contains CR, LF or NUL", value.escape_debug()))
            );
            Ok(value.trim_matches([' ', '\t']).to_string())
        })
        .collect()
}
