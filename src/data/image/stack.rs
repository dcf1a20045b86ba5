use std::path::{Path, PathBuf};

use log::debug;
use ndarray::ArrayD;

use super::axes::{conform_axes, AxesError, AxisOrder};
use crate::MetricsError;

/// An n-dimensional image loaded from disk, along with the
/// axis order its metadata declared (if any) and where it
/// came from.
#[derive(Debug, Clone)]
pub struct ImageStack<A> {
    pub data : ArrayD<A>,
    pub axes : Option<AxisOrder>,
    path : PathBuf,
}

impl<A> ImageStack<A> {
    pub fn new(data : ArrayD<A>, path : impl AsRef<Path>) -> Self {
        ImageStack { data, axes : None, path : path.as_ref().to_path_buf() }
    }

    pub fn with_axes(mut self, axes : Option<AxisOrder>) -> Self {
        self.axes = axes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without its final extension, so
    /// `cells.ome.tif` gives `cells.ome`.
    pub fn stem(&self) -> String {
        self.path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Conforms the data to `canonical` (see `conform_axes`).
    /// A `declared` order takes precedence over the one found in
    /// the file's metadata; with neither, the data is left as-is.
    pub fn conform(
        self,
        declared : Option<&AxisOrder>,
        canonical : &AxisOrder,
        ) -> Result<Self, AxesError> {
        let Some(from) = declared.cloned().or_else(|| self.axes.clone()) else {
            debug!("{}: no axis order known, keeping shape {:?}", self.path.display(), self.shape());
            return Ok(self);
        };
        let (data, axes) = conform_axes(self.data, &from, canonical)?;
        debug!("{}: {} -> {} {:?}", self.path.display(), from, axes, data.shape());
        Ok(ImageStack { data, axes : Some(axes), path : self.path })
    }
}

impl ImageStack<f64> {
    /// Reinterprets decoded samples as object labels. Every value
    /// must be a non-negative integer that fits in a `u32`.
    pub fn into_labels(self) -> Result<ImageStack<u32>, MetricsError> {
        if let Some(&bad) = self.data.iter()
            .find(|&&v| v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64) {
            return Err(MetricsError::InvalidLabel(bad));
        }
        Ok(ImageStack {
            data : self.data.mapv(|v| v as u32),
            axes : self.axes,
            path : self.path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn stem_drops_last_extension_only() {
        let stack = ImageStack::new(Array3::<f64>::zeros((1, 1, 1)).into_dyn(), "/data/cells.ome.tif");
        assert_eq!(stack.stem(), "cells.ome");
    }

    #[test]
    fn declared_axes_override_metadata() {
        let stack = ImageStack::new(Array3::<f64>::zeros((2, 5, 6)).into_dyn(), "a.tif")
            .with_axes(Some("ZYX".parse().unwrap()));

        let conformed = stack
            .conform(Some(&"CYX".parse().unwrap()), &"ZYXC".parse().unwrap())
            .unwrap();
        assert_eq!(conformed.shape(), &[5, 6, 2]);
        assert_eq!(conformed.axes.unwrap().to_string(), "YXC");
    }

    #[test]
    fn unknown_axes_leave_data_alone() {
        let stack = ImageStack::new(Array3::<f64>::zeros((2, 5, 6)).into_dyn(), "a.tif");
        let conformed = stack.conform(None, &"ZYX".parse().unwrap()).unwrap();
        assert_eq!(conformed.shape(), &[2, 5, 6]);
        assert!(conformed.axes.is_none());
    }

    #[test]
    fn labels_must_be_whole_and_non_negative() {
        let mut data = Array3::<f64>::zeros((1, 2, 2)).into_dyn();
        data[[0, 1, 1]] = 7.0;
        let labels = ImageStack::new(data.clone(), "l.tif").into_labels().unwrap();
        assert_eq!(labels.data[[0, 1, 1]], 7);

        data[[0, 0, 1]] = -1.0;
        assert!(matches!(
            ImageStack::new(data.clone(), "l.tif").into_labels(),
            Err(MetricsError::InvalidLabel(v)) if v == -1.0
        ));

        data[[0, 0, 1]] = 2.5;
        assert!(ImageStack::new(data, "l.tif").into_labels().is_err());
    }
}
