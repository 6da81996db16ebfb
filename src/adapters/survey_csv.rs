//! CSV survey source.
//!
//! Reads the labeled dataset into a raw [`SurveyTable`]. Cells stay strings;
//! parsing and validation happen in the domain cleaning step so row numbers in
//! errors refer to data rows.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::domain::SurveyTable;

/// Read a survey CSV from disk.
///
/// # Errors
/// Returns error if the file cannot be opened or is not valid CSV.
pub fn read_survey(path: &Path) -> crate::Result<SurveyTable> {
    let file = std::fs::File::open(path)?;
    let table = read_survey_from(file)?;
    tracing::info!(
        "Loaded survey from {:?} ({} rows, {} columns)",
        path,
        table.rows.len(),
        table.headers.len()
    );
    Ok(table)
}

/// Read a survey CSV from any reader.
///
/// Ragged rows are accepted here and reported by cleaning.
///
/// # Errors
/// Returns error on malformed CSV or invalid UTF-8.
pub fn read_survey_from<R: Read>(reader: R) -> crate::Result<SurveyTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let rows = rdr
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

    Ok(SurveyTable { headers, rows })
}
