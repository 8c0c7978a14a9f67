//! Per-image geometric stages: decoding and validity filtering.

pub mod decode;
pub mod filter;

pub use decode::BoxDecoder;
pub use filter::ValidityFilter;
