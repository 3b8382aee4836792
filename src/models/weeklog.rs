use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One decoded weeklog record.
///
/// Steam IDs are carried as `u64` and serialized as decimal strings so JSON
/// consumers never round them through a double.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "steamid_string")]
    pub steamid: u64,
    pub category: String,
    pub time: u32,
    pub portals: u8,
    /// Seconds since the start of the week, 24 bits on disk.
    pub timestamp: u32,
}

impl LogEntry {
    /// Zero time and zero portals marks a deletion of the player's previous run.
    pub fn is_tombstone(&self) -> bool {
        self.time == 0 && self.portals == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Run {
    #[serde(with = "steamid_string")]
    pub steamid: u64,
    pub time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portals: Option<u8>,
    pub date: i64,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmented: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBoard {
    pub category: String,
    pub runs: Vec<Run>,
}

/// Ranked runs per category, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    pub boards: Vec<CategoryBoard>,
}

impl Leaderboard {
    #[cfg(test)]
    pub fn get(&self, category: &str) -> Option<&[Run]> {
        self.boards
            .iter()
            .find(|b| b.category == category)
            .map(|b| b.runs.as_slice())
    }
}

impl Serialize for Leaderboard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.boards.len()))?;
        for board in &self.boards {
            map.serialize_entry(&board.category, &board.runs)?;
        }
        map.end()
    }
}

/// Body of `POST /api/weeklog`. Numbers stay wide here so out-of-range
/// values reach validation instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct AddEntryRequest {
    pub steamid: Option<serde_json::Value>,
    pub category: Option<serde_json::Value>,
    pub time: Option<serde_json::Value>,
    pub portals: Option<serde_json::Value>,
    pub timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveEntryRequest {
    pub timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// Result of a command dispatched by name.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Entries(Vec<LogEntry>),
    Leaderboard(Leaderboard),
    Status(&'static str),
}

pub const SUCCESS: &str = "SUCCESS";

mod steamid_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(steamid: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(steamid)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
