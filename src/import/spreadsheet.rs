//! Reads the "Package Name" column out of an uploaded workbook

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, info};

use crate::import::ImportError;

/// Header the package column must carry (matched case-insensitively)
pub const PACKAGE_NAME_HEADER: &str = "Package Name";

const ACCEPTED_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Reject anything that is not an Excel workbook, by extension
pub fn check_extension(path: &Path) -> Result<(), ImportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ImportError::UnsupportedFile(path.display().to_string()))
    }
}

/// Index of the package name column in a header row
pub fn find_name_column<S: AsRef<str>>(headers: &[S]) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.as_ref().trim().eq_ignore_ascii_case(PACKAGE_NAME_HEADER))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// One entry per data row of the first sheet; empty cells are `None`
pub fn read_package_names(path: &Path) -> Result<Vec<Option<String>>, ImportError> {
    check_extension(path)?;
    info!("Reading package names from {}", path.display());

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(ImportError::EmptyWorkbook)?
        .iter()
        .map(|cell| cell_text(cell).unwrap_or_default())
        .collect();
    let column = find_name_column(&headers).ok_or(ImportError::MissingColumn)?;

    let names: Vec<Option<String>> = rows
        .map(|row| row.get(column).and_then(cell_text))
        .collect();
    debug!("Read {} data rows from column {}", names.len(), column);
    Ok(names)
}
