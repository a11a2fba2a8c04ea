//! Data module - instrument file decoding, parsing and loop segmentation

mod encoding;
mod header;
mod loader;
mod model;
mod segmenter;
mod units;

pub use encoding::{decode_attempts, decode_first, read_bytes, DecodedText};
pub use header::{HeaderLocation, HeaderLocator, MetadataExtractor};
pub use loader::{DataLoader, LoaderError};
pub use model::{MeasurementMetadata, RawSample, DISPLAY_KEYS, MISSING_VALUE};
pub use segmenter::{LoopBranch, LoopSegmenter, LoopSegments, SegmentError};
pub use units::{SampleGeometry, OE_TO_TESLA, TESLA_TO_OE};
