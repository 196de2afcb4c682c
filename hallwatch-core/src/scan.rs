use serde::{Deserialize, Serialize};

/// Outcome tag returned by the scan endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    Started,
    Ended,
    EndedBanned,
    Denied,
    Banned,
    QueuePrompt,
    #[serde(other)]
    Unknown,
}

impl Default for ScanAction {
    fn default() -> Self {
        ScanAction::Unknown // Unrecognized server codes degrade, not crash
    }
}

/// Result of relaying one scanned code to the server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScanResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub action: ScanAction,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

impl ScanResult {
    /// Anonymous failure used when the server reply could not be parsed.
    pub fn failure(message: impl Into<String>) -> Self {
        ScanResult {
            ok: false,
            action: ScanAction::Unknown,
            name: String::new(),
            message: message.into(),
        }
    }

    /// True when the outcome should flash the slot as banned.
    pub fn is_ban(&self) -> bool {
        matches!(self.action, ScanAction::Banned | ScanAction::EndedBanned)
    }
}
