//! Decides which reader handles a file and owns the
//! fallback path for files the TIFF reader rejects.

pub mod file_types;
mod raster;

pub use file_types::FileType;
pub use raster::open_raster;
