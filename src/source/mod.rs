pub mod normalize;
pub mod reader;

pub use normalize::{NormalizedRecord, Normalizer};
pub use reader::{LogReader, ReaderError};
