#![warn(clippy::pedantic)]

pub mod encoder;
pub mod error;
pub mod writer;

pub use encoder::CarEncoder;
pub use error::EncodeError;
pub use writer::{CarWriter, DEFAULT_CHANNEL_CAPACITY, WriterState};
