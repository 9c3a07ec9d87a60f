use crate::id::ShortId;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Upper bound on the length of an original URL, in bytes.
pub const MAX_ORIGINAL_URL_LEN: usize = 2048;

/// An unused id waiting in the key pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortKey {
    pub id: ShortId,
    pub created_at: Timestamp,
}

/// A stored URL mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Id consumed from the key pool.
    pub id: ShortId,
    /// The original URL that was shortened.
    pub original: String,
    pub created_at: Timestamp,
    /// The record is served only while `expired_at > now`.
    pub expired_at: Timestamp,
}

impl UrlRecord {
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        self.expired_at > now
    }
}
