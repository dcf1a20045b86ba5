//! Per-object measurements of labeled microscopy images.
//!
//! Loads an intensity image and a label image, brings both
//! into a common axis order, measures every labeled object
//! and writes the results to an `.xlsx` spreadsheet.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

mod utils;
pub mod data;
pub mod tiff;
pub mod file_data;
pub mod measure;
pub mod export;

pub use utils::MetricsError;
pub use data::image::{AxisOrder, ImageStack, IMAGE_AXES, LABEL_AXES};
pub use file_data::FileType;
pub use measure::{
    default_properties,
    parse_properties,
    regionprops_table,
    FeatureTable,
    RequestedProperty,
    DEFAULT_PROPERTIES,
};
pub use export::{output_path, write_xlsx};

/// Everything one run of the analysis needs.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub image_path : PathBuf,
    pub label_path : PathBuf,
    /// Overrides the image's metadata axis order
    pub image_axes : Option<AxisOrder>,
    /// Overrides the label file's metadata axis order
    pub label_axes : Option<AxisOrder>,
    pub output_dir : PathBuf,
    pub properties : Vec<RequestedProperty>,
}

impl Analysis {
    /// An analysis of `image_path` against `label_path` with the
    /// default properties, writing into the working directory.
    pub fn new<P : AsRef<Path>, Q : AsRef<Path>>(image_path : P, label_path : Q) -> Self {
        Analysis {
            image_path : image_path.as_ref().to_path_buf(),
            label_path : label_path.as_ref().to_path_buf(),
            image_axes : None,
            label_axes : None,
            output_dir : PathBuf::from("."),
            properties : default_properties(),
        }
    }
}

/// `open_image(path)` reads an intensity image. TIFF stacks go
/// through the native reader; if it cannot read the file, raster
/// formats are retried once with the `image` crate.
///
/// ## Arguments
///
/// * `path` - Path to the image file
///
/// ## Errors
///
/// * `MetricsError::UnsupportedFormat` - neither reader handles the
/// file's extension
/// * `MetricsError::Io` - the file could not be opened at all
///
/// ## Example
///
/// ```rust, ignore
/// let image = open_image("cells.tif")?;
/// println!("{:?} {:?}", image.shape(), image.axes);
/// ```
pub fn open_image<P : AsRef<Path>>(path : P) -> Result<ImageStack<f64>, MetricsError> {
    let path = path.as_ref();
    let native_err = match tiff::open_stack(path) {
        Ok(stack) => return Ok(stack),
        Err(MetricsError::Io(err))
            if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            return Err(MetricsError::Io(err));
        },
        Err(err) => err,
    };

    let file_type = FileType::discern_filetype(path);
    match file_type {
        FileType::Raster(_) => {
            warn!(
                "{}: {}; decoding .{} with the raster reader instead",
                path.display(), native_err, file_type.extension()
            );
            file_data::open_raster(path)
        },
        FileType::Microscopy(_) | FileType::Other(_) => Err(MetricsError::UnsupportedFormat {
            path : path.to_path_buf(),
            extension : file_type.extension().to_string(),
        }),
    }
}

/// `open_labels(path)` reads a label image with the native TIFF
/// reader. Every sample must be a non-negative integer.
pub fn open_labels<P : AsRef<Path>>(path : P) -> Result<ImageStack<u32>, MetricsError> {
    tiff::open_stack(path)?.into_labels()
}

/// `extract_features(image, labels, properties)` measures every
/// object of `labels` against `image` and prefixes the table with
/// a `file` column holding the image's stem.
///
/// Both stacks should already share an axis order (see
/// `ImageStack::conform`).
pub fn extract_features(
    image : &ImageStack<f64>,
    labels : &ImageStack<u32>,
    properties : &[RequestedProperty],
    ) -> Result<FeatureTable, MetricsError> {
    let mut table = regionprops_table(labels.data.view(), Some(image.data.view()), properties)?;
    table.insert_source(&image.stem());
    Ok(table)
}

/// `analyze(analysis)` runs the whole pipeline: load both images,
/// conform them to `ZYXC` / `ZYX`, measure, and write
/// `nuclei_analysis_<stem>.xlsx` into the output directory.
///
/// ## Returns
///
/// The path of the spreadsheet written.
///
/// ## Example
///
/// ```rust, ignore
/// let mut analysis = Analysis::new("cells.tif", "cells_labels.tif");
/// analysis.image_axes = Some("CZYX".parse()?);
/// let written = analyze(&analysis)?;
/// ```
pub fn analyze(analysis : &Analysis) -> Result<PathBuf, MetricsError> {
    let image = open_image(&analysis.image_path)?
        .conform(analysis.image_axes.as_ref(), &IMAGE_AXES.parse()?)?;
    let labels = open_labels(&analysis.label_path)?
        .conform(analysis.label_axes.as_ref(), &LABEL_AXES.parse()?)?;
    info!(
        "{} {:?} ({}), {} {:?} ({})",
        image.path().display(),
        image.shape(),
        image.axes.as_ref().map_or("?".to_string(), |a| a.to_string()),
        labels.path().display(),
        labels.shape(),
        labels.axes.as_ref().map_or("?".to_string(), |a| a.to_string()),
    );

    let table = extract_features(&image, &labels, &analysis.properties)?;
    let path = output_path(&analysis.output_dir, &image.stem());
    write_xlsx(&table, &path)?;
    Ok(path)
}
