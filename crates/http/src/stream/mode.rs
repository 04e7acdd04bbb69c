use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;

use crate::protocol::StreamError;

/// The fopen-style mode a handle was opened with.
///
/// Only the capability flags matter to a [`Stream`](super::Stream); the creation
/// semantics are kept so [`OpenMode::open_options`] can open files consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    base: Base,
    plus: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    /// `r`
    Read,
    /// `w`: truncate or create
    Write,
    /// `a`: append, create
    Append,
    /// `x`: create, fail when present
    CreateNew,
    /// `c`: create, never truncate
    Create,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode { base: Base::Read, plus: false };
    pub const READ_WRITE: OpenMode = OpenMode { base: Base::Read, plus: true };
    pub const WRITE: OpenMode = OpenMode { base: Base::Write, plus: false };

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.plus || self.base == Base::Read
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.plus || self.base != Base::Read
    }

    /// Builds the [`OpenOptions`] matching this mode.
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.is_readable());
        match self.base {
            Base::Read => options.write(self.plus),
            Base::Write => options.write(true).create(true).truncate(true),
            Base::Append => options.append(true).create(true),
            Base::CreateNew => options.write(true).create_new(true),
            Base::Create => options.write(true).create(true),
        };
        options
    }
}

impl FromStr for OpenMode {
    type Err = StreamError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        // binary and text flags carry no meaning here
        let trimmed = mode.trim_end_matches(['b', 't']);
        let (base, plus) = match trimmed.strip_suffix('+') {
            Some(base) => (base, true),
            None => (trimmed, false),
        };

        let (base, plus) = match base {
            "r" => (Base::Read, plus),
            "rw" => (Base::Read, true),
            "w" => (Base::Write, plus),
            "a" => (Base::Append, plus),
            "x" => (Base::CreateNew, plus),
            "c" => (Base::Create, plus),
            _ => return Err(StreamError::state(format!("unknown open mode `{mode}`"))),
        };

        Ok(OpenMode { base, plus })
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base {
            Base::Read => "r",
            Base::Write => "w",
            Base::Append => "a",
            Base::CreateNew => "x",
            Base::Create => "c",
        };
        f.write_str(base)?;
        if self.plus {
            f.write_str("+")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_flags() {
        let cases = [
            ("r", true, false),
            ("rb", true, false),
            ("rt", true, false),
            ("r+", true, true),
            ("r+b", true, true),
            ("rw", true, true),
            ("w", false, true),
            ("wb", false, true),
            ("w+", true, true),
            ("w+t", true, true),
            ("a", false, true),
            ("a+", true, true),
            ("x", false, true),
            ("x+b", true, true),
            ("c", false, true),
            ("c+", true, true),
        ];

        for (mode, readable, writable) in cases {
            let parsed: OpenMode = mode.parse().unwrap();
            assert_eq!(parsed.is_readable(), readable, "readable flag of `{mode}`");
            assert_eq!(parsed.is_writable(), writable, "writable flag of `{mode}`");
        }
    }

    #[test]
    fn unknown_modes() {
        for mode in ["", "q", "+", "rr", "wx"] {
            let err = mode.parse::<OpenMode>().unwrap_err();
            assert!(err.is_state());
        }
    }

    #[test]
    fn display() {
        assert_eq!("r+b".parse::<OpenMode>().unwrap().to_string(), "r+");
        assert_eq!(OpenMode::WRITE.to_string(), "w");
    }
}
