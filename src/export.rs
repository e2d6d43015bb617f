use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::result::ExtractedRow;

pub const SOURCE_FILE_HEADER: &str = "Source File";

/// Write the accumulated rows as CSV. Requesting an export with zero rows is
/// a no-op: no file is created and `false` is returned.
#[instrument(skip(names, rows))]
pub fn write_csv(path: &Path, names: &[String], rows: &[ExtractedRow]) -> Result<bool> {
    if rows.is_empty() {
        log::debug!("no rows accumulated, skipping export");
        return Ok(false);
    }
    let mut writer = WriterBuilder::new().from_path(path)?;
    write_records(&mut writer, names, rows)?;
    writer.flush()?;
    Ok(true)
}

pub fn write_csv_to_string(names: &[String], rows: &[ExtractedRow]) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::<u8>::new());
    write_records(&mut writer, names, rows)?;
    let bytes = writer
        .into_inner()
        .map_err(|error| Error::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, error)))
}

fn write_records<W: Write>(
    writer: &mut csv::Writer<W>,
    names: &[String],
    rows: &[ExtractedRow],
) -> Result<()> {
    let mut header = Vec::with_capacity(names.len() + 1);
    header.push(SOURCE_FILE_HEADER);
    header.extend(names.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = Vec::with_capacity(row.cells.len() + 1);
        record.push(row.source_file.as_str());
        record.extend(row.cells.iter().map(String::as_str));
        writer.write_record(&record)?;
    }
    Ok(())
}
