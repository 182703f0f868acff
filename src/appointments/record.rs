//! Appointment records and identifiers.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique appointment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct AppointmentId(pub Uuid);

impl AppointmentId {
    /// Generate a fresh identifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AppointmentId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppointmentId {
    type Err = uuid::Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl ToSql for AppointmentId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        // Stored as TEXT for readability in the management tooling.
        Ok(ToSqlOutput::Owned(Value::Text(self.0.to_string())))
    }
}

impl FromSql for AppointmentId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(t) => {
                let s = std::str::from_utf8(t).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A persisted appointment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Unique identifier.
    pub id: AppointmentId,
    /// Patient name.
    pub name: String,
    /// Patient contact number.
    pub contact: String,
    /// Doctor label.
    pub doctor: String,
    /// Date in `YYYY-MM-DD` form, stored verbatim.
    pub date: String,
    /// Display time, stored verbatim.
    pub time: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new appointment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    /// Patient name.
    pub name: String,
    /// Patient contact number.
    pub contact: String,
    /// Doctor label.
    pub doctor: String,
    /// Date in `YYYY-MM-DD` form.
    pub date: String,
    /// Display time.
    pub time: String,
}

impl NewAppointment {
    /// Human-readable label of the slot this booking occupies.
    #[must_use]
    pub fn slot_label(&self) -> String {
        format!("{} {} {}", self.doctor, self.date, self.time)
    }
}

/// Partial update applied by the management interface.
///
/// Absent fields keep their stored values.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppointmentPatch {
    /// New patient name.
    pub name: Option<String>,
    /// New contact number.
    pub contact: Option<String>,
    /// New doctor label.
    pub doctor: Option<String>,
    /// New date.
    pub date: Option<String>,
    /// New display time.
    pub time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrips_through_text() {
        let id = AppointmentId::new();
        let parsed: AppointmentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_appointment_serializes_camel_case() {
        let appointment = Appointment {
            id: AppointmentId::new(),
            name: "Jane Doe".to_string(),
            contact: "9876543210".to_string(),
            doctor: "surgeon".to_string(),
            date: "2025-06-10".to_string(),
            time: "4:00 PM".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&appointment).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_slot_label() {
        let fields = NewAppointment {
            name: "Jane Doe".to_string(),
            contact: "9876543210".to_string(),
            doctor: "surgeon".to_string(),
            date: "2025-06-10".to_string(),
            time: "4:00 PM".to_string(),
        };
        assert_eq!(fields.slot_label(), "surgeon 2025-06-10 4:00 PM");
    }
}
