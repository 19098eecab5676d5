use serde::{Deserialize, Serialize};

/// Trigger cadence unit of a mission.
///
/// Unrecognized units deserialize to `Unknown` rather than failing the
/// whole mission decode; the scheduler refuses to compute a next
/// execution for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DurationUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationUnit::Minute => write!(f, "MINUTE"),
            DurationUnit::Hour => write!(f, "HOUR"),
            DurationUnit::Day => write!(f, "DAY"),
            DurationUnit::Week => write!(f, "WEEK"),
            DurationUnit::Month => write!(f, "MONTH"),
            DurationUnit::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Durable definition of a recurring job. Created and deleted through the
/// admin API; this node only ever observes mission definitions through
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Owner", default)]
    pub owner: String,
    #[serde(rename = "Domain", default)]
    pub domain: String,
    #[serde(rename = "No", default)]
    pub no: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Duration")]
    pub duration: i64,
    #[serde(rename = "DurationUnit")]
    pub duration_unit: DurationUnit,
    #[serde(rename = "Condition", default)]
    pub condition: String,
    #[serde(rename = "ExtraInfo", default)]
    pub extra_info: String,
}

/// Bus payload for one triggered mission: the full definition plus the
/// dispatch timestamp (Unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(flatten)]
    pub mission: Mission,
    #[serde(rename = "DispatchedAt")]
    pub dispatched_at: i64,
}
