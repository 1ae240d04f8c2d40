//! Ticket types and their on-disk JSON shape.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used for every date field in the data file.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repair status of a ticket.
///
/// ```text
/// Pending -> Repaired
///    |          ^
///    v          v
///  Canceled <---+
/// ```
///
/// Repaired and Canceled both stamp `date_repaired`. Only Repaired tickets
/// are eligible for purging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    /// Submitted and waiting for a technician.
    Pending,
    /// Repair finished.
    Repaired,
    /// Repair abandoned.
    Canceled,
}

impl TicketStatus {
    /// Get the status name as persisted and displayed.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "Pending",
            TicketStatus::Repaired => "Repaired",
            TicketStatus::Canceled => "Canceled",
        }
    }

    /// Whether this status carries a `date_repaired` stamp.
    pub fn is_closed(&self) -> bool {
        !matches!(self, TicketStatus::Pending)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device repair ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: u64,
    pub device: String,
    #[serde(default)]
    pub serial: String,
    pub issue: String,
    /// Person who brought the device in.
    #[serde(rename = "submitted", default)]
    pub submitted_by: String,
    #[serde(default)]
    pub contact: String,
    pub status: TicketStatus,
    #[serde(with = "date_field")]
    pub date_submitted: NaiveDate,
    /// Set when the ticket is repaired or canceled, stored as `""` otherwise.
    #[serde(with = "optional_date_field", default)]
    pub date_repaired: Option<NaiveDate>,
}

impl Ticket {
    /// `date_repaired` as displayed and persisted (`""` when unset).
    pub fn date_repaired_str(&self) -> String {
        self.date_repaired
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Whether a Repaired ticket has been closed for at least `days` full days as of `now`.
    pub fn repaired_at_least_days_before(&self, now: NaiveDate, days: u32) -> bool {
        match (self.status, self.date_repaired) {
            (TicketStatus::Repaired, Some(repaired)) => {
                (now - repaired).num_days() >= i64::from(days)
            }
            _ => false,
        }
    }
}

/// Fields collected from the entry form to create a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTicket {
    pub device: String,
    pub serial: String,
    pub issue: String,
    pub submitted_by: String,
    pub contact: String,
}

impl NewTicket {
    /// Create a request with the two required fields.
    pub fn new(device: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            issue: issue.into(),
            ..Default::default()
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    pub fn with_submitted_by(mut self, submitted_by: impl Into<String>) -> Self {
        self.submitted_by = submitted_by.into();
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }

    /// Trim surrounding whitespace from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            device: self.device.trim().to_string(),
            serial: self.serial.trim().to_string(),
            issue: self.issue.trim().to_string(),
            submitted_by: self.submitted_by.trim().to_string(),
            contact: self.contact.trim().to_string(),
        }
    }
}

mod date_field {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

mod optional_date_field {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
