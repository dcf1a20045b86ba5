use std::path::PathBuf;

use crate::data::image::{AxesError, DimensionsError};

/// Errors that can occur anywhere between opening the
/// input files and writing the spreadsheet. Reader problems
/// surface as `Io` or `Format`, array bookkeeping problems
/// as `Axes` or `Dimensions`.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),

    #[error("FormatError: {0}")]
    Format(String),

    #[error("Unsupported format `.{extension}` for {}", path.display())]
    UnsupportedFormat { path : PathBuf, extension : String },

    #[error("DecodeError: {0}")]
    Decode(#[from] image::ImageError),

    #[error("AxesError: {0}")]
    Axes(#[from] AxesError),

    #[error("DimensionsError: {0}")]
    Dimensions(#[from] DimensionsError),

    #[error("Label images must hold non-negative integers, found {0}")]
    InvalidLabel(f64),

    #[error("Unknown region property `{0}`")]
    UnknownProperty(String),

    #[error("Property `{0}` requires an intensity image")]
    MissingIntensity(String),

    #[error("ExportError: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl From<binrw::Error> for MetricsError {
    fn from(err : binrw::Error) -> Self {
        match err {
            binrw::Error::Io(io) => MetricsError::Io(io),
            other => MetricsError::Format(other.to_string()),
        }
    }
}
