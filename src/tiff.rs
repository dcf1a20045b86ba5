//! This module contains the TIFF plumbing: header, IFDs,
//! tags, strip decoding, and a writer. Purely for I/O
//! operations, it knows nothing about labels or features.

mod file_format;
mod ifd;
mod imagej;
mod reader;
mod strips;
mod tags;
pub mod writer;

pub use tags::{Tag, TiffTagID, FieldType};
pub use ifd::{IFD, TiffIFD, BigTiffIFD};
pub use file_format::{FileFormat, TiffVariant};
pub use imagej::HyperstackLayout;
pub use reader::{open_stack, read_stack};
pub use strips::SampleFormat;
pub use writer::write_imagej;
