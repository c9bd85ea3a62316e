//! Bulk package import from an Excel workbook

pub mod bulk;
pub mod spreadsheet;

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::api::ResourceApi;
use crate::models::Package;

pub use bulk::{BulkImporter, ImportSummary, MIN_NAME_LENGTH};
pub use spreadsheet::{read_package_names, PACKAGE_NAME_HEADER};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unsupported file '{0}'. Upload an .xlsx or .xls workbook")]
    UnsupportedFile(String),

    #[error("The workbook has no sheets or no header row")]
    EmptyWorkbook,

    #[error("No \"Package Name\" column found in the first sheet")]
    MissingColumn,

    #[error("Could not read workbook: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Could not load existing packages: {0}")]
    Api(#[from] crate::api::ApiError),
}

/// Read the workbook at `path` and create every package it lists
pub async fn import_workbook(
    api: Arc<dyn ResourceApi<Package>>,
    path: PathBuf,
) -> Result<ImportSummary, ImportError> {
    let rows = read_package_names(&path)?;
    let mut importer = BulkImporter::new(api).load_known().await?;
    Ok(importer.run(rows).await)
}
