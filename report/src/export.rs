use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::dataset::ReportRow;
use crate::error::ReportError;
use crate::stats::{CorrelationMatrix, DescriptiveStats};

pub const SPREADSHEET_FILE: &str = "report.xlsx";
pub const STATS_FILE: &str = "descriptive_stats.csv";
pub const CORRELATION_FILE: &str = "correlation.csv";

pub const REPORT_COLUMNS: [&str; 15] = [
    "full_name",
    "repo_name",
    "owner",
    "stars_count",
    "releases_count",
    "repo_age_years",
    "ck_loc",
    "java_files_count",
    "ck_cbo",
    "ck_dit",
    "ck_lcom",
    "url",
    "cbo_avg",
    "dit_avg",
    "lcom_avg",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// The row's values in [`REPORT_COLUMNS`] order.
pub fn row_cells(row: &ReportRow) -> [Cell<'_>; 15] {
    [
        Cell::Text(&row.full_name),
        Cell::Text(&row.repo_name),
        Cell::Text(&row.owner),
        Cell::Number(row.stars_count as f64),
        Cell::Number(row.releases_count as f64),
        Cell::Number(row.repo_age_years),
        Cell::Number(row.ck_loc as f64),
        Cell::Number(row.java_files_count as f64),
        Cell::Number(row.ck_cbo as f64),
        Cell::Number(row.ck_dit),
        Cell::Number(row.ck_lcom),
        Cell::Text(&row.url),
        Cell::Number(row.cbo_avg),
        Cell::Number(row.dit_avg),
        Cell::Number(row.lcom_avg),
    ]
}

pub fn write_spreadsheet(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("report")?;

    for (col, name) in (0u16..).zip(REPORT_COLUMNS) {
        sheet.write_string_with_format(0, col, name, &header)?;
    }
    for (r, row) in (1u32..).zip(rows) {
        for (col, cell) in (0u16..).zip(row_cells(row)) {
            match cell {
                Cell::Text(text) => sheet.write_string(r, col, text)?,
                Cell::Number(value) => sheet.write_number(r, col, value)?,
            };
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    workbook.save(path)?;
    info!("Spreadsheet with {} rows saved to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_descriptive_stats(path: &Path, stats: &[DescriptiveStats]) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for s in stats {
        writer.serialize(s).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| ReportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn write_correlation(path: &Path, matrix: &CorrelationMatrix) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(std::iter::once("metric").chain(matrix.names.iter().map(String::as_str)))
        .map_err(csv_err)?;
    for (name, values) in matrix.names.iter().zip(&matrix.values) {
        let record = std::iter::once(name.clone()).chain(values.iter().map(|v| format!("{v:.4}")));
        writer.write_record(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| ReportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ReportError::Io {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}
