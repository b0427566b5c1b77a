use super::schema::guest_entries;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CollectionError;

/// RSVP choice attached to every guestbook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Attendance {
    Attending,
    NotAttending,
    Undecided,
}

impl Attendance {
    pub const ALL: [Attendance; 3] = [
        Attendance::Attending,
        Attendance::NotAttending,
        Attendance::Undecided,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attendance::Attending => "attending",
            Attendance::NotAttending => "not-attending",
            Attendance::Undecided => "undecided",
        }
    }

    /// Label shown on the invitation form.
    pub fn label(self) -> &'static str {
        match self {
            Attendance::Attending => "Hadir",
            Attendance::NotAttending => "Tidak Hadir",
            Attendance::Undecided => "Ragu-ragu",
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attendance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Attendance::ALL
            .into_iter()
            .find(|a| a.as_str() == value || a.label().eq_ignore_ascii_case(value))
            .ok_or_else(|| value.to_string())
    }
}

/// A guestbook record as stored by the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestEntry {
    pub id: String,
    pub name: String,
    pub message: String,
    pub attendance: Attendance,
    pub submitted_at: DateTime<Utc>,
}

/// Raw form fields as typed by the guest. Missing fields read as empty.
#[derive(Debug, Clone, Default, FromForm, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestForm {
    #[field(default = String::new())]
    pub name: String,
    #[field(default = String::new())]
    pub message: String,
    #[field(default = String::new())]
    pub attendance: String,
}

impl GuestForm {
    pub fn new(name: &str, message: &str, attendance: &str) -> Self {
        GuestForm {
            name: name.to_string(),
            message: message.to_string(),
            attendance: attendance.to_string(),
        }
    }
}

/// A validated entry that has not been written yet; the collection assigns
/// the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub name: String,
    pub message: String,
    pub attendance: Attendance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub attending: usize,
    pub not_attending: usize,
    pub undecided: usize,
}

impl AttendanceSummary {
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a GuestEntry>) -> Self {
        entries
            .into_iter()
            .fold(AttendanceSummary::default(), |mut acc, entry| {
                match entry.attendance {
                    Attendance::Attending => acc.attending += 1,
                    Attendance::NotAttending => acc.not_attending += 1,
                    Attendance::Undecided => acc.undecided += 1,
                }
                acc
            })
    }

    pub fn total(&self) -> usize {
        self.attending + self.not_attending + self.undecided
    }
}

#[derive(Selectable, Queryable)]
#[diesel(table_name = guest_entries)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct EntryRow {
    pub id: String,
    pub name: String,
    pub message: String,
    pub attendance: String,
    pub submitted_at: NaiveDateTime,
}

impl TryFrom<EntryRow> for GuestEntry {
    type Error = CollectionError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let attendance = row.attendance.parse().map_err(|bad| {
            CollectionError::Malformed(format!("entry {} has attendance '{}'", row.id, bad))
        })?;
        Ok(GuestEntry {
            id: row.id,
            name: row.name,
            message: row.message,
            attendance,
            submitted_at: row.submitted_at.and_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(attendance: Attendance) -> GuestEntry {
        GuestEntry {
            id: "x".into(),
            name: "Budi".into(),
            message: "Selamat".into(),
            attendance,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn attendance_parses_values_and_labels() {
        assert_eq!("attending".parse::<Attendance>(), Ok(Attendance::Attending));
        assert_eq!("not-attending".parse::<Attendance>(), Ok(Attendance::NotAttending));
        assert_eq!("Tidak Hadir".parse::<Attendance>(), Ok(Attendance::NotAttending));
        assert_eq!(" ragu-ragu ".parse::<Attendance>(), Ok(Attendance::Undecided));
        assert_eq!(
            "Konfirmasi Kehadiran".parse::<Attendance>(),
            Err("Konfirmasi Kehadiran".to_string())
        );
    }

    #[test]
    fn attendance_serializes_kebab_case() {
        let json = serde_json::to_string(&Attendance::NotAttending).unwrap();
        assert_eq!(json, "\"not-attending\"");
    }

    #[test]
    fn summary_counts_each_choice() {
        let entries = vec![
            entry(Attendance::Attending),
            entry(Attendance::Attending),
            entry(Attendance::Undecided),
        ];
        let summary = AttendanceSummary::tally(&entries);
        assert_eq!(summary.attending, 2);
        assert_eq!(summary.not_attending, 0);
        assert_eq!(summary.undecided, 1);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn row_with_unknown_attendance_is_malformed() {
        let row = EntryRow {
            id: "abc".into(),
            name: "Budi".into(),
            message: "Hi".into(),
            attendance: "maybe".into(),
            submitted_at: Utc::now().naive_utc(),
        };
        let err = GuestEntry::try_from(row).unwrap_err();
        assert!(matches!(err, CollectionError::Malformed(_)));
    }
}
