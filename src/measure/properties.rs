//! The catalogue of measurable region properties, their
//! accepted names, and how each one expands into columns.

use std::str::FromStr;

use itertools::iproduct;

use super::region::{Region, Regions};
use crate::MetricsError;

/// Properties measured when none are requested.
pub const DEFAULT_PROPERTIES : [&str; 6] = [
    "label",
    "centroid",
    "area",
    "max_intensity",
    "mean_intensity",
    "min_intensity",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Label,
    Area,
    AreaBbox,
    Bbox,
    Centroid,
    CentroidWeighted,
    EquivalentDiameterArea,
    Extent,
    IntensityMax,
    IntensityMean,
    IntensityMin,
    IntensityStd,
}

impl Property {
    /// Looks up a property by its current or legacy name
    pub fn from_name(name : &str) -> Option<Property> {
        Some(match name {
            "label" => Property::Label,
            "area" => Property::Area,
            "area_bbox" | "bbox_area" => Property::AreaBbox,
            "bbox" => Property::Bbox,
            "centroid" => Property::Centroid,
            "centroid_weighted" | "weighted_centroid" => Property::CentroidWeighted,
            "equivalent_diameter_area" | "equivalent_diameter" => Property::EquivalentDiameterArea,
            "extent" => Property::Extent,
            "intensity_max" | "max_intensity" => Property::IntensityMax,
            "intensity_mean" | "mean_intensity" => Property::IntensityMean,
            "intensity_min" | "min_intensity" => Property::IntensityMin,
            "intensity_std" | "std_intensity" => Property::IntensityStd,
            _ => return None,
        })
    }

    pub fn needs_intensity(&self) -> bool {
        matches!(
            self,
            Property::CentroidWeighted
            | Property::IntensityMax
            | Property::IntensityMean
            | Property::IntensityMin
            | Property::IntensityStd
        )
    }
}

/// A property as the user asked for it. The column name is the
/// name used in the request, so legacy names stay legacy.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedProperty {
    pub property : Property,
    pub name : String,
}

impl FromStr for RequestedProperty {
    type Err = MetricsError;

    fn from_str(s : &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Property::from_name(name)
            .map(|property| RequestedProperty { property, name : name.to_string() })
            .ok_or_else(|| MetricsError::UnknownProperty(name.to_string()))
    }
}

/// Parses a list of property names, skipping blanks and
/// repeated names.
///
/// ## Example
///
/// ```rust, ignore
/// let props = parse_properties(&["label", " area", "", "label"])?;
/// assert_eq!(props.len(), 2);
/// ```
pub fn parse_properties<S : AsRef<str>>(names : &[S]) -> Result<Vec<RequestedProperty>, MetricsError> {
    let mut parsed : Vec<RequestedProperty> = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.as_ref().trim()).filter(|n| !n.is_empty()) {
        let requested : RequestedProperty = name.parse()?;
        if !parsed.iter().any(|p| p.name == requested.name) {
            parsed.push(requested);
        }
    }
    Ok(parsed)
}

pub fn default_properties() -> Vec<RequestedProperty> {
    parse_properties(&DEFAULT_PROPERTIES).unwrap_or_default()
}

impl RequestedProperty {
    /// Column names this property expands into.
    ///
    /// Multi-valued properties get `-<axis>` suffixes; intensity
    /// properties of a multi-channel image get `-<channel>`.
    pub fn column_names(&self, regions : &Regions) -> Vec<String> {
        let name = &self.name;
        let ndim = regions.ndim;
        let channels = regions.channels;
        match self.property {
            Property::Bbox => (0..2 * ndim).map(|i| format!("{}-{}", name, i)).collect(),
            Property::Centroid => (0..ndim).map(|i| format!("{}-{}", name, i)).collect(),
            Property::CentroidWeighted if regions.multichannel => iproduct!(0..ndim, 0..channels)
                .map(|(d, c)| format!("{}-{}-{}", name, d, c))
                .collect(),
            Property::CentroidWeighted => (0..ndim).map(|d| format!("{}-{}", name, d)).collect(),
            p if p.needs_intensity() && regions.multichannel => {
                (0..channels).map(|c| format!("{}-{}", name, c)).collect()
            },
            _ => vec![name.clone()],
        }
    }

    /// Values of one region, in the order of `column_names`.
    pub fn values(&self, region : &Region) -> Vec<f64> {
        let per_channel = |f : fn(&super::region::IntensityStats) -> f64| {
            region.intensity.iter().map(f).collect::<Vec<f64>>()
        };
        match self.property {
            Property::Label => vec![region.label as f64],
            Property::Area => vec![region.area as f64],
            Property::AreaBbox => vec![region.area_bbox() as f64],
            Property::Bbox => region.bbox.iter().map(|&(lo, _)| lo as f64)
                .chain(region.bbox.iter().map(|&(_, hi)| hi as f64))
                .collect(),
            Property::Centroid => region.centroid.clone(),
            Property::CentroidWeighted => {
                let ndim = region.centroid.len();
                iproduct!(0..ndim, 0..region.intensity.len())
                    .map(|(d, c)| region.intensity[c].weighted_centroid[d])
                    .collect()
            },
            Property::EquivalentDiameterArea => vec![region.equivalent_diameter()],
            Property::Extent => vec![region.extent()],
            Property::IntensityMax => per_channel(|s| s.max),
            Property::IntensityMean => per_channel(|s| s.mean),
            Property::IntensityMin => per_channel(|s| s.min),
            Property::IntensityStd => per_channel(|s| s.std),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::region::IntensityStats;

    fn regions(ndim : usize, channels : usize, multichannel : bool) -> Regions {
        Regions { regions : vec![], ndim, channels, multichannel }
    }

    #[test]
    fn defaults_are_the_six_named() {
        let names : Vec<String> = default_properties().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["label", "centroid", "area", "max_intensity", "mean_intensity", "min_intensity"]
        );
    }

    #[test]
    fn legacy_and_current_names() {
        let legacy : RequestedProperty = "max_intensity".parse().unwrap();
        let current : RequestedProperty = "intensity_max".parse().unwrap();
        assert_eq!(legacy.property, current.property);
        assert_eq!(legacy.name, "max_intensity");
    }

    #[test]
    fn unknown_names_fail() {
        assert!(matches!(
            parse_properties(&["label", "solidity"]),
            Err(MetricsError::UnknownProperty(name)) if name == "solidity"
        ));
    }

    #[test]
    fn blanks_and_repeats_are_skipped() {
        let props = parse_properties(&["label", " area", "", "label"]).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[1].name, "area");
    }

    #[test]
    fn column_expansion() {
        let r = regions(3, 1, false);
        let col = |name : &str, r : &Regions| name.parse::<RequestedProperty>().unwrap().column_names(r);

        assert_eq!(col("centroid", &r), vec!["centroid-0", "centroid-1", "centroid-2"]);
        assert_eq!(col("bbox", &r).len(), 6);
        assert_eq!(col("mean_intensity", &r), vec!["mean_intensity"]);

        let rc = regions(2, 2, true);
        assert_eq!(col("mean_intensity", &rc), vec!["mean_intensity-0", "mean_intensity-1"]);
        assert_eq!(
            col("centroid_weighted", &rc),
            vec!["centroid_weighted-0-0", "centroid_weighted-0-1", "centroid_weighted-1-0", "centroid_weighted-1-1"]
        );
    }

    #[test]
    fn values_line_up_with_columns() {
        let region = Region {
            label : 4,
            area : 3,
            bbox : vec![(1, 3), (2, 4)],
            centroid : vec![1.5, 2.5],
            intensity : vec![
                IntensityStats { min : 1.0, max : 5.0, mean : 3.0, std : 1.0, weighted_centroid : vec![1.1, 2.1] },
                IntensityStats { min : 0.0, max : 2.0, mean : 1.0, std : 0.5, weighted_centroid : vec![1.2, 2.2] },
            ],
        };
        let value = |name : &str| name.parse::<RequestedProperty>().unwrap().values(&region);

        assert_eq!(value("label"), vec![4.0]);
        assert_eq!(value("bbox"), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(value("area_bbox"), vec![4.0]);
        assert_eq!(value("extent"), vec![0.75]);
        assert_eq!(value("max_intensity"), vec![5.0, 2.0]);
        assert_eq!(value("weighted_centroid"), vec![1.1, 1.2, 2.1, 2.2]);
    }
}
