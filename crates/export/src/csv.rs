use routebook_core::StopRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

pub const CSV_HEADER: [&str; 7] = [
    "Seq",
    "Address",
    "Street Name",
    "Unit",
    "Type",
    "Notes",
    "Additional Info",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Unexpected header row: {0}")]
    UnexpectedHeader(String),
    #[error("Row {row} has {found} fields, expected 7")]
    FieldCount { row: usize, found: usize },
}

/// How field values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvDialect {
    /// Raw comma join, no quoting, no trailing newline. Values containing
    /// commas or quotes corrupt the row.
    Legacy,
    /// Quote only fields that need it. Identical to `Legacy` for plain values.
    #[default]
    Quoted,
}

impl fmt::Display for CsvDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvDialect::Legacy => write!(f, "legacy"),
            CsvDialect::Quoted => write!(f, "quoted"),
        }
    }
}

impl FromStr for CsvDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "raw" => Ok(CsvDialect::Legacy),
            "quoted" | "rfc4180" => Ok(CsvDialect::Quoted),
            other => Err(format!("Unknown CSV dialect: '{other}'")),
        }
    }
}

fn row(stop: &StopRecord) -> [&str; 7] {
    [
        stop.sequence.as_str(),
        stop.address.as_str(),
        stop.street_name.as_str(),
        stop.unit.as_str(),
        stop.delivery_type.as_str(),
        stop.notes.as_str(),
        stop.additional_info.as_deref().unwrap_or(""),
    ]
}

pub fn write_stops<W: Write>(
    mut writer: W,
    stops: &[StopRecord],
    dialect: CsvDialect,
) -> Result<(), ExportError> {
    match dialect {
        CsvDialect::Legacy => {
            write!(writer, "{}", CSV_HEADER.join(","))?;
            for stop in stops {
                write!(writer, "\n{}", row(stop).join(","))?;
            }
            writer.flush()?;
        }
        CsvDialect::Quoted => {
            let mut w = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Necessary)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(writer);
            w.write_record(CSV_HEADER)?;
            for stop in stops {
                w.write_record(row(stop))?;
            }
            w.flush()?;
        }
    }
    Ok(())
}

pub fn to_csv_string(stops: &[StopRecord], dialect: CsvDialect) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_stops(&mut buf, stops, dialect)?;
    // Fields are UTF-8 and the writer adds only ASCII.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read stops back from a file written by [`write_stops`] in either dialect.
pub fn read_stops<R: Read>(data: R) -> Result<Vec<StopRecord>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    if headers.iter().map(str::trim).ne(CSV_HEADER) {
        return Err(ExportError::UnexpectedHeader(
            headers.iter().collect::<Vec<_>>().join(","),
        ));
    }

    let mut stops = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != CSV_HEADER.len() {
            return Err(ExportError::FieldCount { row: i + 2, found: record.len() });
        }
        let field = |n: usize| record.get(n).unwrap_or_default().to_string();
        let info = field(6);
        stops.push(StopRecord {
            sequence: field(0),
            address: field(1),
            street_name: field(2),
            unit: field(3),
            delivery_type: field(4),
            notes: field(5),
            additional_info: if info.is_empty() { None } else { Some(info) },
        });
    }

    Ok(stops)
}
