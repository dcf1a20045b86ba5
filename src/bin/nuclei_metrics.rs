use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use nuclei_metrics::{analyze, parse_properties, Analysis, AxisOrder, DEFAULT_PROPERTIES};

/// Measures labeled nuclei in a microscopy image and writes
/// one row per nucleus to `nuclei_analysis_<image>.xlsx`.
///
/// # Example
///
/// ```
/// nuclei-metrics --image_path cells.tif --label_path labels.tif \
///     --image_axes CZYX --properties label,area,mean_intensity
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Intensity image (TIFF stack or common raster format)
    #[arg(long = "image_path", visible_alias = "image-path", value_name = "FILE")]
    image_path : PathBuf,

    /// Label image (TIFF stack), 0 is background
    #[arg(long = "label_path", visible_alias = "label-path", value_name = "FILE")]
    label_path : PathBuf,

    /// Axis order of the image file, e.g. ZYXC. Overrides ImageJ metadata
    #[arg(long = "image_axes", visible_alias = "image-axes", value_name = "AXES")]
    image_axes : Option<AxisOrder>,

    /// Axis order of the label file, e.g. ZYX. Overrides ImageJ metadata
    #[arg(long = "label_axes", visible_alias = "label-axes", value_name = "AXES")]
    label_axes : Option<AxisOrder>,

    /// Where to write the spreadsheet
    #[arg(long = "output_dir", visible_alias = "output-dir", default_value = ".", value_name = "DIR")]
    output_dir : PathBuf,

    /// Comma-separated region properties to measure
    #[arg(long, value_delimiter = ',', default_values = DEFAULT_PROPERTIES, value_name = "NAMES")]
    properties : Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut analysis = Analysis::new(&args.image_path, &args.label_path);
    analysis.image_axes = args.image_axes;
    analysis.label_axes = args.label_axes;
    analysis.output_dir = args.output_dir;
    analysis.properties = parse_properties(&args.properties)
        .context("Invalid --properties")?;

    let written = analyze(&analysis).with_context(|| format!(
        "Failed to analyze {} with labels {}",
        args.image_path.display(),
        args.label_path.display(),
    ))?;
    println!("{}", written.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra : &[&str]) -> Result<Args, clap::Error> {
        let base = ["nuclei-metrics", "--image_path", "cells.tif", "--label_path", "labels.tif"];
        Args::try_parse_from(base.iter().chain(extra.iter()).copied())
    }

    #[test]
    fn defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.image_path, PathBuf::from("cells.tif"));
        assert_eq!(args.label_path, PathBuf::from("labels.tif"));
        assert!(args.image_axes.is_none() && args.label_axes.is_none());
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.properties, DEFAULT_PROPERTIES.to_vec());
    }

    #[test]
    fn kebab_case_aliases() {
        let args = Args::try_parse_from([
            "nuclei-metrics",
            "--image-path", "a.tif",
            "--label-path", "b.tif",
            "--image-axes", "czyx",
            "--label-axes", "ZYX",
            "--output-dir", "results",
        ]).unwrap();
        assert_eq!(args.image_path, PathBuf::from("a.tif"));
        assert_eq!(args.image_axes.unwrap().to_string(), "CZYX");
        assert_eq!(args.label_axes.unwrap().to_string(), "ZYX");
        assert_eq!(args.output_dir, PathBuf::from("results"));
    }

    #[test]
    fn properties_split_on_commas() {
        let args = parse(&["--properties", "label,area,max_intensity"]).unwrap();
        assert_eq!(args.properties, vec!["label", "area", "max_intensity"]);

        let props = parse_properties(&args.properties).unwrap();
        assert_eq!(props.len(), 3);
        assert!(parse_properties(&parse(&["--properties", "label,solidity"]).unwrap().properties).is_err());
    }

    #[test]
    fn bad_axes_and_missing_paths_are_rejected() {
        assert!(parse(&["--image_axes", "ZZY"]).is_err());
        assert!(parse(&["--label_axes", "Z1X"]).is_err());
        assert!(Args::try_parse_from(["nuclei-metrics", "--image_path", "cells.tif"]).is_err());
    }
}
