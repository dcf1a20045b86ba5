//! `Image`
//! 
//! Contains the in-memory image structures: n-dimensional
//! stacks, the axis orders describing them, and the shape
//! checks between intensity and label images.

mod axes;
mod dimensions;
mod stack;

pub use axes::{AxisOrder, AxesError, reorder_axes, conform_axes, IMAGE_AXES, LABEL_AXES};
pub use dimensions::{Dimensions, DimensionsError, check_shapes};
pub use stack::ImageStack;
