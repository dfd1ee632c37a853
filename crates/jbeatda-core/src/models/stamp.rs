use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layouts the backend emits (`LocalDateTime::toString` drops
/// trailing zero seconds).
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    pub stamp_id: i64,
    pub menu_id: i64,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: String,
}

impl Stamp {
    pub fn created_at_parsed(&self) -> Option<NaiveDateTime> {
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.created_at, fmt).ok())
    }

    /// Collection date for display, falling back to the raw value
    pub fn created_display(&self) -> String {
        match self.created_at_parsed() {
            Some(dt) => dt.format("%b %d, %Y").to_string(),
            None => self.created_at.clone(),
        }
    }
}
