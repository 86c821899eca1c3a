use enum_iterator::Sequence;
use log::*;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
            Self::Late => write!(f, "late"),
            Self::Excused => write!(f, "excused"),
        }
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<AttendanceStatus>()
            .find(|status| status.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown attendance status: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub player_id: String,
    pub status: AttendanceStatus,
}

/// Attendance for one training session, keyed by player id.
///
/// Marks are applied locally before the server confirms them. A failed
/// confirmation leaves the local mark in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceSheet {
    session_id: String,
    entries: BTreeMap<String, AttendanceStatus>,
}

impl AttendanceSheet {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            entries: BTreeMap::new(),
        }
    }

    pub fn from_records<I: IntoIterator<Item = AttendanceRecord>>(
        session_id: &str,
        records: I,
    ) -> Self {
        let mut sheet = Self::new(session_id);
        for record in records {
            sheet.entries.insert(record.player_id, record.status);
        }
        sheet
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self, player_id: &str) -> Option<AttendanceStatus> {
        self.entries.get(player_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AttendanceStatus)> {
        self.entries.iter().map(|(id, status)| (id.as_str(), *status))
    }

    /// Applies a mark ahead of the server, returning what was there before
    pub fn mark_optimistic(
        &mut self,
        player_id: &str,
        status: AttendanceStatus,
    ) -> Option<AttendanceStatus> {
        debug!(
            "Session {}: marking {player_id} {status} before confirmation",
            self.session_id
        );
        self.entries.insert(player_id.to_string(), status)
    }

    /// Takes the server's answer as the truth
    pub fn confirm(&mut self, record: AttendanceRecord) {
        if self.status(&record.player_id) != Some(record.status) {
            info!(
                "Session {}: server recorded {} as {}",
                self.session_id, record.player_id, record.status
            );
        }
        self.entries.insert(record.player_id, record.status);
    }

    pub fn count(&self, status: AttendanceStatus) -> usize {
        self.entries.values().filter(|s| **s == status).count()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(player: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            player_id: player.to_string(),
            status,
        }
    }

    #[test]
    fn test_optimistic_mark_then_confirm() {
        let mut sheet = AttendanceSheet::from_records(
            "s1",
            [
                record("p1", AttendanceStatus::Absent),
                record("p2", AttendanceStatus::Present),
            ],
        );

        let previous = sheet.mark_optimistic("p1", AttendanceStatus::Present);
        assert_eq!(previous, Some(AttendanceStatus::Absent));
        assert_eq!(sheet.status("p1"), Some(AttendanceStatus::Present));

        sheet.confirm(record("p1", AttendanceStatus::Late));
        assert_eq!(sheet.status("p1"), Some(AttendanceStatus::Late));
        assert_eq!(sheet.count(AttendanceStatus::Present), 1);
        assert_eq!(sheet.count(AttendanceStatus::Late), 1);
    }

    #[test]
    fn test_unconfirmed_mark_is_kept() {
        let mut sheet = AttendanceSheet::new("s2");
        assert_eq!(sheet.mark_optimistic("p9", AttendanceStatus::Excused), None);
        // no confirmation arrives
        assert_eq!(sheet.status("p9"), Some(AttendanceStatus::Excused));
        assert_eq!(sheet.iter().count(), 1);
    }

    #[test]
    fn test_status_parse_and_wire() {
        assert_eq!("Late".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Late));
        assert!("gone".parse::<AttendanceStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&record("p1", AttendanceStatus::Excused)).unwrap(),
            r#"{"playerId":"p1","status":"EXCUSED"}"#
        );
    }
}
