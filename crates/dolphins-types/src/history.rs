use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{TypeError, TypeResult};

/// Wall-clock time attached to a ledger transaction.
///
/// Mirrors the `{seconds, nanos}` pair the ledger hands out. `nanos` must be
/// in `0..1_000_000_000` to be rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl LedgerTimestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Timestamp for the current wall-clock time.
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos() as i32,
        }
    }

    pub fn to_datetime(&self) -> TypeResult<DateTime<Utc>> {
        let invalid = || TypeError::InvalidTimestamp {
            seconds: self.seconds,
            nanos: self.nanos,
        };
        let nanos = u32::try_from(self.nanos).map_err(|_| invalid())?;
        if nanos >= 1_000_000_000 {
            return Err(invalid());
        }
        DateTime::from_timestamp(self.seconds, nanos).ok_or_else(invalid)
    }

    /// Render as `YYYY-MM-DD HH:MM:SS[.fraction] +0000 UTC`.
    ///
    /// The fraction keeps only significant digits and is omitted entirely
    /// on whole seconds.
    pub fn render(&self) -> TypeResult<String> {
        let datetime = self.to_datetime()?;
        let mut rendered = datetime.format("%Y-%m-%d %H:%M:%S").to_string();
        let nanos = datetime.timestamp_subsec_nanos();
        if nanos != 0 {
            let fraction = format!("{nanos:09}");
            rendered.push('.');
            rendered.push_str(fraction.trim_end_matches('0'));
        }
        rendered.push_str(" +0000 UTC");
        Ok(rendered)
    }
}

impl fmt::Display for LedgerTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => write!(f, "{}s+{}ns", self.seconds, self.nanos),
        }
    }
}

/// One past version of a ledger key, as delivered by the history index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tx_id: String,
    /// `None` for tombstones.
    pub value: Option<Vec<u8>>,
    pub timestamp: LedgerTimestamp,
    pub is_delete: bool,
}

impl HistoryEntry {
    pub fn write(tx_id: impl Into<String>, value: Vec<u8>, timestamp: LedgerTimestamp) -> Self {
        Self {
            tx_id: tx_id.into(),
            value: Some(value),
            timestamp,
            is_delete: false,
        }
    }

    pub fn tombstone(tx_id: impl Into<String>, timestamp: LedgerTimestamp) -> Self {
        Self {
            tx_id: tx_id.into(),
            value: None,
            timestamp,
            is_delete: true,
        }
    }
}

/// Caller-facing rendering of a [`HistoryEntry`].
///
/// `Value` carries the stored JSON verbatim and `IsDelete` is the string
/// `"true"` or `"false"`, as existing consumers expect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "TxId")]
    pub tx_id: String,
    #[serde(rename = "Value")]
    pub value: Option<Box<RawValue>>,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "IsDelete")]
    pub is_delete: String,
}

impl HistoryRecord {
    pub fn from_entry(entry: &HistoryEntry) -> TypeResult<Self> {
        let value = match &entry.value {
            Some(bytes) if !entry.is_delete && !bytes.is_empty() => Some(
                serde_json::from_slice::<Box<RawValue>>(bytes)
                    .map_err(|e| TypeError::Decode(e.to_string()))?,
            ),
            _ => None,
        };

        Ok(Self {
            tx_id: entry.tx_id.clone(),
            value,
            timestamp: entry.timestamp.render()?,
            is_delete: entry.is_delete.to_string(),
        })
    }

    pub fn is_delete(&self) -> bool {
        self.is_delete == "true"
    }
}

/// Encode a materialized history as a JSON array.
pub fn encode_history(records: &[HistoryRecord]) -> TypeResult<String> {
    serde_json::to_string(records).map_err(|e| TypeError::Encode(e.to_string()))
}
