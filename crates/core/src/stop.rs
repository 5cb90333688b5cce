use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery type printed on every stop the route book photos carry.
pub const DEFAULT_DELIVERY_TYPE: &str = "CURB R";

/// One row of a reconstructed route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRecord {
    /// Position in delivery order, as printed (digits only).
    pub sequence: String,
    /// House number; empty when OCR lost it.
    pub address: String,
    pub street_name: String,
    /// `APT <n>` exactly as recognized, or empty.
    pub unit: String,
    pub delivery_type: String,
    /// Trailing text after the four-digit marker, usually the recipient name.
    pub additional_info: Option<String>,
    pub notes: String,
}

impl StopRecord {
    /// A stop with only its sequence set and the default delivery type.
    pub fn blank(sequence: impl Into<String>) -> Self {
        StopRecord {
            sequence: sequence.into(),
            address: String::new(),
            street_name: String::new(),
            unit: String::new(),
            delivery_type: DEFAULT_DELIVERY_TYPE.to_string(),
            additional_info: None,
            notes: String::new(),
        }
    }

    /// Case-insensitive substring match across every field.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [
            self.sequence.as_str(),
            self.address.as_str(),
            self.street_name.as_str(),
            self.unit.as_str(),
            self.delivery_type.as_str(),
            self.notes.as_str(),
            self.additional_info.as_deref().unwrap_or(""),
        ]
        .iter()
        .any(|v| v.to_lowercase().contains(&needle))
    }

    /// Overwrite a single editable field.
    pub fn set(&mut self, field: StopField, value: impl Into<String>) {
        let value = value.into();
        match field {
            StopField::Address => self.address = value,
            StopField::StreetName => self.street_name = value,
            StopField::Unit => self.unit = value,
            StopField::DeliveryType => self.delivery_type = value,
            StopField::Notes => self.notes = value,
            StopField::AdditionalInfo => {
                self.additional_info = if value.is_empty() { None } else { Some(value) }
            }
        }
    }
}

/// Fields a user may edit after a stop was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopField {
    Address,
    StreetName,
    Unit,
    DeliveryType,
    Notes,
    AdditionalInfo,
}

impl fmt::Display for StopField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopField::Address => write!(f, "address"),
            StopField::StreetName => write!(f, "street"),
            StopField::Unit => write!(f, "unit"),
            StopField::DeliveryType => write!(f, "type"),
            StopField::Notes => write!(f, "notes"),
            StopField::AdditionalInfo => write!(f, "info"),
        }
    }
}

impl FromStr for StopField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "address" => Ok(StopField::Address),
            "street" | "street_name" => Ok(StopField::StreetName),
            "unit" => Ok(StopField::Unit),
            "type" | "delivery_type" => Ok(StopField::DeliveryType),
            "notes" | "note" => Ok(StopField::Notes),
            "info" | "additional_info" => Ok(StopField::AdditionalInfo),
            other => Err(format!("Unknown stop field: '{other}'")),
        }
    }
}
