//! Byte-stream reassembly: framing, page assembly and metadata extraction.

pub mod framing;
pub mod metadata;
pub mod page;

pub use framing::{Framer, RequestOutcome};
pub use page::{ByteSink, PageAssembler, PageBuffer, PageLayout, Placement, StreamPosition};
