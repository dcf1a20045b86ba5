//! Region measurement: accumulate per-label statistics, then lay
//! the requested properties out as table columns.

mod properties;
mod region;
mod table;

use log::info;
use ndarray::ArrayViewD;

pub use properties::{
    default_properties,
    parse_properties,
    Property,
    RequestedProperty,
    DEFAULT_PROPERTIES,
};
pub use region::{collect_regions, IntensityStats, Region, Regions};
pub use table::{Column, ColumnValues, FeatureTable};

use crate::MetricsError;

/// `regionprops_table(labels, intensity, properties)` measures every
/// nonzero label and returns one row per label, one or more columns
/// per property.
///
/// ## Arguments
///
/// * `labels` - The label image
/// * `intensity` - Optional intensity image, same shape as `labels`
/// or with one extra trailing channel axis
/// * `properties` - What to measure, in column order
///
/// ## Errors
///
/// * `MetricsError::MissingIntensity` - an intensity property was asked
/// for without an intensity image
/// * `MetricsError::Dimensions` - the two images do not line up
///
/// ## Example
///
/// ```rust, ignore
/// let props = parse_properties(&["label", "area", "mean_intensity"])?;
/// let table = regionprops_table(labels.view(), Some(image.view()), &props)?;
/// ```
pub fn regionprops_table(
    labels : ArrayViewD<u32>,
    intensity : Option<ArrayViewD<f64>>,
    properties : &[RequestedProperty],
    ) -> Result<FeatureTable, MetricsError> {

    if intensity.is_none() {
        if let Some(p) = properties.iter().find(|p| p.property.needs_intensity()) {
            return Err(MetricsError::MissingIntensity(p.name.clone()));
        }
    }

    let regions = collect_regions(labels, intensity)?;
    let mut table = FeatureTable::new(regions.regions.len());

    for property in properties {
        let names = property.column_names(&regions);
        let mut columns : Vec<Vec<f64>> = vec![Vec::with_capacity(regions.regions.len()); names.len()];
        for region in &regions.regions {
            for (column, value) in columns.iter_mut().zip(property.values(region)) {
                column.push(value);
            }
        }
        names.into_iter().zip(columns).for_each(|(name, values)| table.push_numeric(name, values));
    }

    info!(
        "Measured {} regions ({} columns, {} channel(s))",
        table.num_rows(), table.num_columns(), regions.channels
    );
    Ok(table)
}
