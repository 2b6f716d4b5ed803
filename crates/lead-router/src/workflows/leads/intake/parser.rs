use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::LeadSource;
use crate::workflows::leads::domain::RawRecord;

/// Failure to obtain or read the batch from its source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open lead source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lead CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("lead source already consumed")]
    Consumed,
}

/// CSV-backed source. With `headers` the first row names the columns and rows
/// become [`RawRecord::Named`]; without it rows are [`RawRecord::Positional`].
pub struct CsvLeadSource<R> {
    reader: Option<R>,
    headers: bool,
}

impl CsvLeadSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P, headers: bool) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file, headers))
    }
}

impl<R: Read> CsvLeadSource<R> {
    pub fn from_reader(reader: R, headers: bool) -> Self {
        Self {
            reader: Some(reader),
            headers,
        }
    }
}

impl<R: Read> LeadSource for CsvLeadSource<R> {
    fn read_records(&mut self) -> Result<Vec<RawRecord>, SourceError> {
        let reader = self.reader.take().ok_or(SourceError::Consumed)?;
        parse_records(reader, self.headers)
    }
}

pub(crate) fn parse_records<R: Read>(reader: R, headers: bool) -> Result<Vec<RawRecord>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = if headers {
        csv_reader
            .byte_headers()?
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect()
    } else {
        Vec::new()
    };

    let mut records = Vec::new();
    for row in csv_reader.byte_records() {
        let row = row?;
        let cells = row
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned());

        let record = if headers {
            let named: BTreeMap<String, String> = columns
                .iter()
                .cloned()
                .zip(cells)
                .filter(|(column, _)| !column.is_empty())
                .collect();
            RawRecord::Named(named)
        } else {
            RawRecord::Positional(cells.collect())
        };
        records.push(record);
    }

    Ok(records)
}
