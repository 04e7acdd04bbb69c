mod head_decoder;
mod head_encoder;

pub use head_decoder::{HeadDecoder, ResponseHead};
pub use head_encoder::{HeadEncoder, RequestHead};
