use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{TypeError, TypeResult};

/// Status every level starts in when it is appended.
pub const INITIAL_LEVEL_STATUS: &str = "Incourse";

/// A certified individual and their full certification history.
///
/// The whole record is stored under `id` and rewritten on every mutation.
/// Field names on the wire are fixed: records written by earlier deployments
/// must stay readable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diver {
    pub id: String,
    pub name: String,
    #[serde(rename = "bdate")]
    pub birth_date: String,
    pub gender: String,
    #[serde(rename = "btype")]
    pub diver_type: String,
    /// Append-only; insertion order is chronological.
    #[serde(deserialize_with = "null_as_empty")]
    pub levels: Vec<Level>,
}

/// One certification level within a diver's history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    #[serde(rename = "levelname")]
    pub level_name: String,
    #[serde(rename = "org")]
    pub organization: String,
    #[serde(rename = "instid")]
    pub institution_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub courses: Vec<String>,
    pub status: String,
}

impl Diver {
    /// Create a diver with no levels.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        birth_date: impl Into<String>,
        gender: impl Into<String>,
        diver_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            birth_date: birth_date.into(),
            gender: gender.into(),
            diver_type: diver_type.into(),
            levels: Vec::new(),
        }
    }

    /// Decode a stored record.
    ///
    /// `null` or missing `levels`/`courses` decode as empty lists.
    pub fn decode(bytes: &[u8]) -> TypeResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Decode(e.to_string()))
    }

    /// Encode the full record as compact JSON.
    pub fn encode(&self) -> TypeResult<Vec<u8>> {
        self.to_json().map(String::into_bytes)
    }

    pub fn to_json(&self) -> TypeResult<String> {
        serde_json::to_string(self).map_err(|e| TypeError::Encode(e.to_string()))
    }

    /// Append a level at the end of the history.
    pub fn push_level(&mut self, level: Level) {
        self.levels.push(level);
    }

    /// The most recently appended level.
    pub fn last_level(&self) -> Option<&Level> {
        self.levels.last()
    }

    pub fn last_level_mut(&mut self) -> Option<&mut Level> {
        self.levels.last_mut()
    }
}

impl Level {
    /// Create a level in the initial `Incourse` status with no courses.
    pub fn new(
        level_name: impl Into<String>,
        organization: impl Into<String>,
        institution_id: impl Into<String>,
    ) -> Self {
        Self {
            level_name: level_name.into(),
            organization: organization.into(),
            institution_id: institution_id.into(),
            courses: Vec::new(),
            status: INITIAL_LEVEL_STATUS.to_string(),
        }
    }

    pub fn is_in_course(&self) -> bool {
        self.status == INITIAL_LEVEL_STATUS
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
