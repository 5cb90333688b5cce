pub mod csv;

pub use crate::csv::{read_stops, to_csv_string, write_stops, CsvDialect, ExportError, CSV_HEADER};
