//! Axis orders: which physical meaning (depth, rows, columns,
//! channels, ...) each dimension of an array carries, and how
//! to permute arrays between two such orders.
//!
//! Everything here is a view permutation through `ndarray`,
//! so reordering never copies pixel data.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use ndarray::{ArrayBase, Axis, IxDyn, RawData};

/// Canonical order intensity images are conformed to.
pub const IMAGE_AXES : &str = "ZYXC";
/// Canonical order label images are conformed to.
pub const LABEL_AXES : &str = "ZYX";

/// Things that can go wrong when interpreting or applying
/// an axis-order string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AxesError {
    #[error("Axis order is empty")]
    Empty,
    #[error("`{0}` is not a valid axis label")]
    InvalidAxis(char),
    #[error("Axis `{0}` appears more than once")]
    DuplicateAxis(char),
    #[error("Expected {ndim} axes, got `{axes}`")]
    CountMismatch { axes : String, ndim : usize },
    #[error("Cannot reorder `{from}` into `{to}`: axis sets differ")]
    MismatchedAxes { from : String, to : String },
    #[error("Axis `{axis}` has length {len} and cannot be dropped")]
    NonSingleton { axis : char, len : usize },
}

/// A validated axis order: distinct upper-case ASCII letters,
/// one per array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisOrder(Vec<char>);

impl AxisOrder {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, axis : char) -> Option<usize> {
        self.0.iter().position(|&a| a == axis)
    }

    pub fn contains(&self, axis : char) -> bool {
        self.0.contains(&axis)
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }

    /// Index permutation that takes an array laid out in `self`
    /// to one laid out in `target`: `perm[i]` is the axis of
    /// `self` that becomes axis `i`.
    ///
    /// ## Errors
    ///
    /// * `AxesError::MismatchedAxes` - if `target` is not a permutation
    /// of the same letters
    pub fn permutation_to(&self, target : &AxisOrder) -> Result<Vec<usize>, AxesError> {
        let mismatch = || AxesError::MismatchedAxes {
            from : self.to_string(),
            to : target.to_string(),
        };
        if self.len() != target.len() {
            return Err(mismatch());
        }
        target.chars()
            .map(|axis| self.position(axis).ok_or_else(mismatch))
            .collect()
    }

    /// The letters of `self` in the order they appear in `canonical`,
    /// skipping letters that `canonical` does not know.
    pub fn restricted_to(&self, canonical : &AxisOrder) -> AxisOrder {
        AxisOrder(canonical.chars().filter(|&a| self.contains(a)).collect())
    }
}

impl FromStr for AxisOrder {
    type Err = AxesError;

    fn from_str(s : &str) -> Result<Self, Self::Err> {
        let axes : Vec<char> = s.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
        if axes.is_empty() {
            return Err(AxesError::Empty);
        }
        if let Some(&bad) = axes.iter().find(|c| !c.is_ascii_uppercase()) {
            return Err(AxesError::InvalidAxis(bad));
        }
        if let Some(dup) = axes.iter().duplicates().next() {
            return Err(AxesError::DuplicateAxis(*dup));
        }
        Ok(AxisOrder(axes))
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.iter().collect::<String>())
    }
}

fn check_count<S : RawData>(data : &ArrayBase<S, IxDyn>, axes : &AxisOrder) -> Result<(), AxesError> {
    if axes.len() != data.ndim() {
        return Err(AxesError::CountMismatch {
            axes : axes.to_string(),
            ndim : data.ndim(),
        });
    }
    Ok(())
}

/// Permutes the axes of `data` from the order `from` into the
/// order `to`. Both orders must name the same set of axes, and
/// `from` must have exactly one letter per dimension of `data`.
///
/// ## Arguments
///
/// * `data` - The array (owned or a view) to reorder, consumed
/// * `from` - The axis order `data` is currently in
/// * `to` - The desired axis order
///
/// ## Example
///
/// ```rust, ignore
/// let zyx = Array3::<u16>::zeros((5, 64, 32)).into_dyn();
/// let yxz = reorder_axes(zyx, &"ZYX".parse()?, &"YXZ".parse()?)?;
/// assert_eq!(yxz.shape(), &[64, 32, 5]);
/// ```
pub fn reorder_axes<S : RawData>(
    data : ArrayBase<S, IxDyn>,
    from : &AxisOrder,
    to : &AxisOrder,
    ) -> Result<ArrayBase<S, IxDyn>, AxesError> {
    check_count(&data, from)?;
    let perm = from.permutation_to(to)?;
    Ok(data.permuted_axes(IxDyn(&perm)))
}

/// Brings `data` into the layout given by `canonical` as far as
/// its axes allow. Axes unknown to `canonical` are dropped when
/// they have length 1; the remaining axes are ordered the way
/// `canonical` orders them. Returns the array and its new order.
///
/// ## Example
///
/// ```rust, ignore
/// // (C, Y, X) -> (Y, X, C)
/// let (arr, axes) = conform_axes(cyx, &"CYX".parse()?, &"ZYXC".parse()?)?;
/// assert_eq!(axes.to_string(), "YXC");
/// ```
pub fn conform_axes<S : RawData>(
    data : ArrayBase<S, IxDyn>,
    from : &AxisOrder,
    canonical : &AxisOrder,
    ) -> Result<(ArrayBase<S, IxDyn>, AxisOrder), AxesError> {
    check_count(&data, from)?;

    let mut data = data;
    let mut kept : Vec<char> = Vec::with_capacity(from.len());
    // walk backwards so earlier axis indices stay valid
    for (idx, axis) in from.chars().enumerate().collect::<Vec<_>>().into_iter().rev() {
        if canonical.contains(axis) {
            kept.push(axis);
            continue;
        }
        let len = data.len_of(Axis(idx));
        if len != 1 {
            return Err(AxesError::NonSingleton { axis, len });
        }
        data = data.index_axis_move(Axis(idx), 0);
    }
    kept.reverse();

    let current = AxisOrder(kept);
    let target = current.restricted_to(canonical);
    let data = reorder_axes(data, &current, &target)?;
    Ok((data, target))
}
