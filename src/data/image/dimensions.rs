//! Page dimensions and the shape checks made between
//! pages of a stack and between intensity and label arrays.

/// Width (`xdim`) and height (`ydim`) of one TIFF page
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Dimensions {
    pub xdim : u64,
    pub ydim : u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DimensionsError {
    #[error("Mismatched shapes. Labels: {labels:?}, Intensity: {intensity:?}")]
    MismatchedShapes{ labels : Vec<usize>, intensity : Vec<usize> },
    #[error("Pages in the stack did not have consistent dimensions.")]
    NoConsistentDimensions,
    #[error("Expected {expected} bytes of pixel data, found {found}.")]
    ByteCount{ expected : u64, found : u64 },
    #[error("The file contains no pages.")]
    EmptyStack,
}

impl Dimensions {
    pub fn new(xdim : u64, ydim : u64) -> Dimensions {
        Dimensions {
            xdim,
            ydim,
        }
    }

    /// `(y, x)`, the order of an ndarray shape
    pub fn to_tuple(&self) -> (u64, u64) {
        (self.ydim, self.xdim)
    }

    /// `None` if the product overflows
    pub fn num_pixels(&self) -> Option<u64> {
        self.xdim.checked_mul(self.ydim)
    }
}

/// Checks that an intensity array can be measured against a
/// label array: identical shape, or identical shape followed
/// by one trailing channel axis.
///
/// ## Returns
///
/// * `Ok(n_channels)` - `1` when the shapes are identical
pub fn check_shapes(labels : &[usize], intensity : &[usize]) -> Result<usize, DimensionsError> {
    let mismatch = || DimensionsError::MismatchedShapes {
        labels : labels.to_vec(),
        intensity : intensity.to_vec(),
    };
    if intensity.len() == labels.len() {
        return if intensity == labels { Ok(1) } else { Err(mismatch()) };
    }
    if intensity.len() == labels.len() + 1 && &intensity[..labels.len()] == labels {
        return Ok(intensity[labels.len()]);
    }
    Err(mismatch())
}
