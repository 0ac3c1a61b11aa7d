//! Account record types and the record builder.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Result, UserDbError};
use crate::password::CredentialHasher;

static MONOTONIC_ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);
static LAST_HRTIME: AtomicU64 = AtomicU64::new(0);

/// A write-time capture: wall clock plus a process-monotonic clock.
///
/// Ordered by `(unixtime, hrtime)`. Successive captures within one process
/// are strictly increasing even when the wall clock stalls or steps back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Milliseconds since the Unix epoch.
    pub unixtime: i64,
    /// Nanoseconds on the process-monotonic clock.
    pub hrtime: u64,
}

impl Timestamp {
    /// Capture the current instant.
    pub fn now() -> Self {
        let elapsed = MONOTONIC_ANCHOR.elapsed().as_nanos() as u64;
        let previous = LAST_HRTIME
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(elapsed.max(last.saturating_add(1)))
            })
            .unwrap_or(elapsed);
        Self {
            unixtime: Utc::now().timestamp_millis(),
            hrtime: elapsed.max(previous.saturating_add(1)),
        }
    }

    /// Capture the current instant, guaranteed to order after `previous`.
    ///
    /// Stored records may come from an earlier process or a host with a
    /// different clock, so `now()` alone does not promise this.
    pub fn after(previous: Timestamp) -> Self {
        let now = Self::now();
        if now > previous {
            return now;
        }
        match previous.hrtime.checked_add(1) {
            Some(hrtime) => Self {
                unixtime: previous.unixtime,
                hrtime,
            },
            // hrtime is exhausted; carry into the wall-clock part.
            None => Self {
                unixtime: previous.unixtime.saturating_add(1),
                hrtime: 0,
            },
        }
    }

    /// Wall-clock part as a date.
    pub fn date(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.unixtime).unwrap_or_default()
    }
}

/// An account record as persisted in the engine.
///
/// The email is not stored in the value; it is the key.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    /// Hashed credential (plaintext only for benchmark stores)
    pub password: String,

    /// Caller metadata, opaque to the store
    #[serde(default = "empty_data")]
    pub data: serde_json::Value,

    pub created_timestamp: Timestamp,

    pub modified_timestamp: Timestamp,
}

fn empty_data() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl StoredUser {
    /// Advance `modifiedTimestamp` past its current value.
    pub fn touch(&mut self) {
        self.modified_timestamp = Timestamp::after(self.modified_timestamp);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| UserDbError::Decode(format!("Failed to encode record: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| UserDbError::Decode(format!("Invalid account record: {}", e)))
    }
}

impl fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredUser")
            .field("password", &"[REDACTED]")
            .field("data", &self.data)
            .field("created_timestamp", &self.created_timestamp)
            .field("modified_timestamp", &self.modified_timestamp)
            .finish()
    }
}

/// An account record as returned to callers, with derived fields.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Recovered from the key
    pub email: String,

    #[serde(skip_serializing)]
    pub password: String,

    pub data: serde_json::Value,

    pub created_timestamp: Timestamp,

    pub modified_timestamp: Timestamp,

    /// Derived from `created_timestamp.unixtime`
    pub created_date: DateTime<Utc>,

    /// Derived from `modified_timestamp.unixtime`
    pub modified_date: DateTime<Utc>,
}

impl User {
    /// Decorate a stored record with its email and derived dates.
    pub fn from_stored(email: String, stored: StoredUser) -> Self {
        Self {
            email,
            created_date: stored.created_timestamp.date(),
            modified_date: stored.modified_timestamp.date(),
            password: stored.password,
            data: stored.data,
            created_timestamp: stored.created_timestamp,
            modified_timestamp: stored.modified_timestamp,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("data", &self.data)
            .field("created_date", &self.created_date)
            .field("modified_date", &self.modified_date)
            .finish()
    }
}

/// Builds stored records from plaintext credentials.
///
/// Hashing runs on Tokio's blocking pool.
#[derive(Clone)]
pub struct RecordBuilder {
    hasher: Arc<dyn CredentialHasher>,
}

impl RecordBuilder {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &Arc<dyn CredentialHasher> {
        &self.hasher
    }

    /// Hash a plaintext password off the async executor.
    pub async fn hash_password(&self, plain: &str) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let plain = Zeroizing::new(plain.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&plain)).await?
    }

    /// Verify a plaintext password off the async executor.
    pub async fn verify_password(&self, plain: &str, hashed: &str) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let plain = Zeroizing::new(plain.to_string());
        let hashed = hashed.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hashed)).await?
    }

    /// Build a fresh record. Both timestamps get the same capture.
    pub async fn build(&self, plain: &str, data: serde_json::Value) -> Result<StoredUser> {
        let password = self.hash_password(plain).await?;
        let now = Timestamp::now();
        Ok(StoredUser {
            password,
            data,
            created_timestamp: now,
            modified_timestamp: now,
        })
    }
}

impl fmt::Debug for RecordBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordBuilder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashingConfig;
    use crate::password::Argon2Hasher;

    fn builder() -> RecordBuilder {
        RecordBuilder::new(Arc::new(
            Argon2Hasher::new(&HashingConfig::minimal()).unwrap(),
        ))
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut last = Timestamp::now();
        for _ in 0..1000 {
            let next = Timestamp::now();
            assert!(next.hrtime > last.hrtime);
            last = next;
        }
    }

    #[test]
    fn test_after_orders_past_future_timestamp() {
        let future = Timestamp {
            unixtime: Utc::now().timestamp_millis() + 60_000,
            hrtime: 5,
        };
        let next = Timestamp::after(future);
        assert!(next > future);
    }

    #[test]
    fn test_after_carries_exhausted_hrtime() {
        let future = Timestamp {
            unixtime: Utc::now().timestamp_millis() + 60_000,
            hrtime: u64::MAX,
        };
        let next = Timestamp::after(future);
        assert!(next > future);
        assert_eq!(next.unixtime, future.unixtime + 1);
        assert_eq!(next.hrtime, 0);
    }

    #[test]
    fn test_date_matches_unixtime() {
        let ts = Timestamp {
            unixtime: 1_700_000_000_123,
            hrtime: 0,
        };
        assert_eq!(ts.date().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_stored_json_shape() {
        let now = Timestamp::now();
        let stored = StoredUser {
            password: "hash".to_string(),
            data: serde_json::json!({ "some": "data" }),
            created_timestamp: now,
            modified_timestamp: now,
        };
        let value: serde_json::Value =
            serde_json::from_slice(&stored.to_bytes().unwrap()).unwrap();
        assert_eq!(value["password"], "hash");
        assert_eq!(value["data"]["some"], "data");
        assert_eq!(value["createdTimestamp"]["unixtime"], now.unixtime);
        assert_eq!(value["modifiedTimestamp"]["hrtime"], now.hrtime);
    }

    #[test]
    fn test_missing_data_defaults_to_empty_object() {
        let bytes = br#"{"password":"x","createdTimestamp":{"unixtime":1,"hrtime":2},"modifiedTimestamp":{"unixtime":1,"hrtime":2}}"#;
        let stored = StoredUser::from_bytes(bytes).unwrap();
        assert_eq!(stored.data, serde_json::json!({}));
    }

    #[test]
    fn test_corrupt_record_is_decode_error() {
        assert!(matches!(
            StoredUser::from_bytes(b"not json"),
            Err(UserDbError::Decode(_))
        ));
    }

    #[test]
    fn test_touch_advances_modified_only() {
        let now = Timestamp::now();
        let mut stored = StoredUser {
            password: "hash".to_string(),
            data: serde_json::json!({}),
            created_timestamp: now,
            modified_timestamp: now,
        };
        stored.touch();
        assert_eq!(stored.created_timestamp, now);
        assert!(stored.modified_timestamp > now);
    }

    #[test]
    fn test_debug_redacts_password() {
        let now = Timestamp::now();
        let user = User::from_stored(
            "a@example.com".to_string(),
            StoredUser {
                password: "hunter2-hash".to_string(),
                data: serde_json::json!({}),
                created_timestamp: now,
                modified_timestamp: now,
            },
        );
        let output = format!("{:?}", user);
        assert!(output.contains("REDACTED"));
        assert!(!output.contains("hunter2"));
        assert!(!serde_json::to_string(&user).unwrap().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_build_hashes_and_stamps() {
        let stored = builder()
            .build("test123", serde_json::json!({ "some": "data" }))
            .await
            .unwrap();
        assert_ne!(stored.password, "test123");
        assert_eq!(stored.created_timestamp, stored.modified_timestamp);
        assert_eq!(stored.data, serde_json::json!({ "some": "data" }));
        assert!(builder()
            .verify_password("test123", &stored.password)
            .await
            .unwrap());
    }
}
