use clap::{Parser, Subcommand, ValueEnum};
use routebook_export::CsvDialect;
use std::path::PathBuf;
use std::str::FromStr;

/// Turn photographed route edit book pages into an editable stop list.
#[derive(Debug, Clone, Parser)]
#[command(name = "routebook", version, about)]
pub struct Args {
    /// Config file (defaults to routebook.toml in the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Recognize route book pages and collect their stops
    Scan(ScanArgs),
    /// Add, delete or change stops in an exported CSV
    Edit(EditArgs),
    /// Print the stops of an exported CSV
    Show(ShowArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct ScanArgs {
    /// Page photos, in route order
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Inputs are OCR text dumps rather than images
    #[arg(long)]
    pub text: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// CSV dialect: legacy or quoted (overrides config)
    #[arg(long, value_name = "DIALECT")]
    pub dialect: Option<CsvDialect>,

    /// Write here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Only keep stops with a field containing TERM
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct EditArgs {
    /// CSV written by `routebook scan --format csv`
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    /// Append N blank stops
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub add: usize,

    /// Remove every stop with this sequence number
    #[arg(long, value_name = "SEQ")]
    pub delete: Vec<String>,

    /// Change a field, e.g. `--set 12:notes="dog in yard"`
    #[arg(long, value_name = "SEQ:FIELD=VALUE")]
    pub set: Vec<FieldEdit>,

    /// Write here instead of overwriting the input
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "DIALECT")]
    pub dialect: Option<CsvDialect>,
}

#[derive(Debug, Clone, Parser)]
pub struct ShowArgs {
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// One `--set` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub sequence: String,
    pub field: String,
    pub value: String,
}

impl FromStr for FieldEdit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected SEQ:FIELD=VALUE, got '{s}'"))?;
        let (sequence, field) = target
            .split_once(':')
            .ok_or_else(|| format!("expected SEQ:FIELD before '=', got '{target}'"))?;
        let sequence = sequence.trim();
        if sequence.is_empty() || !sequence.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("sequence must be digits, got '{sequence}'"));
        }
        Ok(FieldEdit {
            sequence: sequence.to_string(),
            field: field.trim().to_string(),
            value: value.to_string(),
        })
    }
}
