//! Spreadsheet output of a `FeatureTable`.

use std::path::{Path, PathBuf};

use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook};

use crate::measure::{ColumnValues, FeatureTable};
use crate::MetricsError;

const SHEET_NAME : &str = "Sheet1";

/// `<dir>/nuclei_analysis_<stem>.xlsx`
pub fn output_path<P : AsRef<Path>>(dir : P, stem : &str) -> PathBuf {
    dir.as_ref().join(format!("nuclei_analysis_{}.xlsx", stem))
}

/// `write_xlsx(table, path)` writes `table` to a single worksheet
/// with a bold header row. Non-finite numbers are left as blank
/// cells. Missing parent directories are created.
///
/// ## Arguments
///
/// * `table` - The table to write
/// * `path` - Destination `.xlsx` file, overwritten if present
///
/// ## Example
///
/// ```rust, ignore
/// let path = output_path("results", image.stem());
/// write_xlsx(&table, &path)?;
/// ```
pub fn write_xlsx<P : AsRef<Path>>(table : &FeatureTable, path : P) -> Result<(), MetricsError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // header row plus one row per region
    u32::try_from(table.num_rows() + 1)
        .map_err(|_| MetricsError::Format(format!("Too many rows for a worksheet: {}", table.num_rows())))?;

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, column) in table.columns().iter().enumerate() {
        let col = u16::try_from(col)
            .map_err(|_| MetricsError::Format(format!("Too many columns for a worksheet: {}", col)))?;
        sheet.write_string_with_format(0, col, &column.name, &header)?;

        match &column.values {
            ColumnValues::Text(values) => {
                for (row, value) in values.iter().enumerate() {
                    sheet.write_string(row as u32 + 1, col, value)?;
                }
            },
            ColumnValues::Number(values) => {
                for (row, &value) in values.iter().enumerate().filter(|(_, v)| v.is_finite()) {
                    sheet.write_number(row as u32 + 1, col, value)?;
                }
            },
        }
    }

    debug!("Saving {} x {} table", table.num_rows(), table.num_columns());
    workbook.save(path)?;
    info!("Wrote {}", path.display());
    Ok(())
}
