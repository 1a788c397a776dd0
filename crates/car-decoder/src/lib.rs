#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod indexer;
pub mod reader;
pub mod streaming;

mod frame_io;

pub use config::ReaderConfig;
pub use error::DecodeError;
pub use indexer::{BlockIndex, StreamingIndexer};
pub use reader::CarReader;
pub use streaming::StreamingDecoder;
