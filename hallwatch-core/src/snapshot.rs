use serde::{Deserialize, Serialize};

/// One open pass session as reported by the server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "default_session_name")]
    pub name: String,
    /// Server-computed elapsed seconds at snapshot time. Display uses the
    /// reconciled client baseline; this is the fallback input to it.
    #[serde(default)]
    pub elapsed: u64,
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub start_ms: u64,
}

fn default_session_name() -> String {
    "Unknown".to_string()
}

/// Server-authoritative occupancy state at one instant. Replaces wholesale
/// on every sync; the client never mutates it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    // Flat single-holder fields kept for servers that predate
    // `active_sessions`. Promoted via `sessions()` when the list is empty.
    #[serde(default)]
    pub in_use: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elapsed: u64,
    #[serde(default)]
    pub overdue: bool,

    #[serde(default = "default_overdue_minutes")]
    pub overdue_minutes: u32,
    #[serde(default)]
    pub kiosk_suspended: bool,
    #[serde(default)]
    pub auto_ban_overdue: bool,
    /// None when the server omitted the field; the pool falls back to the
    /// previously-seen capacity, or 1.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub active_sessions: Vec<SessionInfo>,
    #[serde(default)]
    pub queue: Vec<String>,
    #[serde(default)]
    pub server_time_ms: u64,
}

fn default_overdue_minutes() -> u32 {
    12
}

impl Snapshot {
    /// Sessions to display, in server order. Older servers only send the
    /// flat single-holder fields; those become one synthetic session.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        if !self.active_sessions.is_empty() {
            return self.active_sessions.clone();
        }
        if self.in_use {
            return vec![SessionInfo {
                id: 0,
                name: if self.name.is_empty() {
                    default_session_name()
                } else {
                    self.name.clone()
                },
                elapsed: self.elapsed,
                overdue: self.overdue,
                start_ms: 0,
            }];
        }
        Vec::new()
    }

    /// Effective capacity given the last value this client saw.
    pub fn capacity_or(&self, previous: u32) -> u32 {
        self.capacity.unwrap_or(if previous == 0 { 1 } else { previous })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_payload() {
        let raw = r#"{
            "in_use": true,
            "name": "Alex",
            "elapsed": 130,
            "overdue": true,
            "overdue_minutes": 10,
            "kiosk_suspended": false,
            "auto_ban_overdue": true,
            "capacity": 2,
            "active_sessions": [
                {"id": 7, "name": "Alex", "elapsed": 130, "overdue": true, "start_ms": 1700000000000}
            ],
            "queue": ["Sam"],
            "server_time_ms": 1700000130000
        }"#;
        let snap: Snapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.capacity_or(1), 2);
        assert_eq!(snap.queue, vec!["Sam".to_string()]);
        let sessions = snap.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, 7);
        assert!(sessions[0].overdue);
    }

    #[test]
    fn missing_fields_default_safely() {
        let snap: Snapshot = serde_json::from_str("{}").unwrap();
        assert!(!snap.in_use);
        assert!(!snap.kiosk_suspended);
        assert_eq!(snap.overdue_minutes, 12);
        assert_eq!(snap.capacity, None);
        assert_eq!(snap.capacity_or(3), 3);
        assert_eq!(snap.capacity_or(0), 1);
        assert!(snap.sessions().is_empty());
        assert!(snap.queue.is_empty());
    }

    #[test]
    fn session_name_defaults_to_unknown() {
        let session: SessionInfo = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(session.name, "Unknown");
        assert_eq!(session.elapsed, 0);
    }

    #[test]
    fn legacy_single_holder_promotes_to_session() {
        let raw = r#"{"in_use": true, "name": "Riley", "elapsed": 45, "overdue": false}"#;
        let snap: Snapshot = serde_json::from_str(raw).unwrap();
        let sessions = snap.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "Riley");
        assert_eq!(sessions[0].elapsed, 45);
    }
}
