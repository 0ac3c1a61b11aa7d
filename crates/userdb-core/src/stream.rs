//! Lazy iteration over stored accounts.

use std::ops::Bound;

use crate::error::Result;
use crate::keys::{decode_user_key, user_key_bounds};
use crate::record::{StoredUser, User};
use crate::storage::KvIter;

/// Range options for [`AccountStore::stream_users`](crate::AccountStore::stream_users).
///
/// Bounds are emails. When both `gt` and `gte` are set, `gt` wins; likewise
/// `lt` over `lte`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRange {
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    /// Maximum number of records to yield
    pub limit: Option<usize>,
    /// Yield in descending email order
    pub reverse: bool,
}

impl UserRange {
    /// Every account, ascending.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn gt(mut self, email: impl Into<String>) -> Self {
        self.gt = Some(email.into());
        self
    }

    pub fn gte(mut self, email: impl Into<String>) -> Self {
        self.gte = Some(email.into());
        self
    }

    pub fn lt(mut self, email: impl Into<String>) -> Self {
        self.lt = Some(email.into());
        self
    }

    pub fn lte(mut self, email: impl Into<String>) -> Self {
        self.lte = Some(email.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Engine key bounds for this range, inside the account namespace.
    pub fn key_bounds(&self) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
        let lower = match (&self.gt, &self.gte) {
            (Some(email), _) => Bound::Excluded(email.as_str()),
            (None, Some(email)) => Bound::Included(email.as_str()),
            (None, None) => Bound::Unbounded,
        };
        let upper = match (&self.lt, &self.lte) {
            (Some(email), _) => Bound::Excluded(email.as_str()),
            (None, Some(email)) => Bound::Included(email.as_str()),
            (None, None) => Bound::Unbounded,
        };
        user_key_bounds(lower, upper)
    }
}

/// One-shot iterator of decorated account records.
///
/// Finite and forward-only. An engine or decode error is yielded once and
/// ends the stream; re-issue `stream_users` to start over.
pub struct UserStream<'a> {
    inner: KvIter<'a>,
    remaining: Option<usize>,
    done: bool,
}

impl<'a> UserStream<'a> {
    pub(crate) fn new(inner: KvIter<'a>, limit: Option<usize>) -> Self {
        Self {
            inner,
            remaining: limit,
            done: false,
        }
    }

    fn decorate(key: &[u8], value: &[u8]) -> Result<User> {
        let email = decode_user_key(key)?;
        let stored = StoredUser::from_bytes(value)?;
        Ok(User::from_stored(email, stored))
    }
}

impl Iterator for UserStream<'_> {
    type Item = Result<User>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }
        let item = match self.inner.next() {
            Some(Ok((key, value))) => Self::decorate(&key, &value),
            Some(Err(err)) => Err(err),
            None => {
                self.done = true;
                return None;
            }
        };
        match item {
            Ok(user) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Some(Ok(user))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::fmt::Debug for UserStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStream")
            .field("remaining", &self.remaining)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserDbError;
    use crate::keys::{encode_user_key, user_prefix};
    use crate::record::Timestamp;
    use crate::storage::{KvEngine, MemoryEngine};

    fn record_bytes(tag: &str) -> Vec<u8> {
        let now = Timestamp::now();
        StoredUser {
            password: "hash".to_string(),
            data: serde_json::json!({ "tag": tag }),
            created_timestamp: now,
            modified_timestamp: now,
        }
        .to_bytes()
        .unwrap()
    }

    fn stream(engine: &MemoryEngine, range: &UserRange) -> Vec<Result<User>> {
        let (lower, upper) = range.key_bounds();
        UserStream::new(engine.range(lower, upper, range.reverse), range.limit).collect()
    }

    fn emails(items: Vec<Result<User>>) -> Vec<String> {
        items.into_iter().map(|item| item.unwrap().email).collect()
    }

    #[test]
    fn test_bounds_select_emails() {
        let engine = MemoryEngine::new();
        for email in ["a@x", "b@x", "c@x", "d@x"] {
            engine.put(&encode_user_key(email), &record_bytes(email)).unwrap();
        }
        assert_eq!(
            emails(stream(&engine, &UserRange::all().gte("b@x").lt("d@x"))),
            vec!["b@x", "c@x"]
        );
        assert_eq!(
            emails(stream(&engine, &UserRange::all().gt("b@x").lte("d@x"))),
            vec!["c@x", "d@x"]
        );
        assert_eq!(
            emails(stream(&engine, &UserRange::all().reverse().limit(2))),
            vec!["d@x", "c@x"]
        );
        assert!(stream(&engine, &UserRange::all().gt("d@x")).is_empty());
    }

    #[test]
    fn test_gt_wins_over_gte() {
        let range = UserRange::all().gte("a@x").gt("a@x");
        let (lower, _) = range.key_bounds();
        assert_eq!(lower, Bound::Excluded(encode_user_key("a@x")));
    }

    #[test]
    fn test_foreign_keys_outside_namespace_are_skipped() {
        let engine = MemoryEngine::new();
        engine.put(b"\x02session\x00", b"not a user").unwrap();
        engine.put(b"\x02zzz\x00", b"not a user").unwrap();
        engine.put(&encode_user_key("a@x"), &record_bytes("a")).unwrap();
        assert_eq!(emails(stream(&engine, &UserRange::all())), vec!["a@x"]);
    }

    #[test]
    fn test_decode_error_terminates_stream() {
        let engine = MemoryEngine::new();
        engine.put(&encode_user_key("a@x"), &record_bytes("a")).unwrap();
        engine.put(&encode_user_key("b@x"), b"garbage").unwrap();
        engine.put(&encode_user_key("c@x"), &record_bytes("c")).unwrap();

        let items = stream(&engine, &UserRange::all());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().email, "a@x");
        assert!(matches!(items[1], Err(UserDbError::Decode(_))));
    }

    #[test]
    fn test_malformed_key_inside_namespace_is_decode_error() {
        let engine = MemoryEngine::new();
        let mut key = user_prefix();
        key.push(0x7f);
        engine.put(&key, &record_bytes("x")).unwrap();
        let items = stream(&engine, &UserRange::all());
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn test_engine_error_terminates_stream() {
        let failing: KvIter<'static> = Box::new(
            vec![
                Ok((encode_user_key("a@x"), record_bytes("a"))),
                Err(UserDbError::Storage("read failed".to_string())),
                Ok((encode_user_key("b@x"), record_bytes("b"))),
            ]
            .into_iter(),
        );
        let items: Vec<_> = UserStream::new(failing, None).collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(UserDbError::Storage(_))));
    }

    #[test]
    fn test_records_are_decorated() {
        let engine = MemoryEngine::new();
        engine.put(&encode_user_key("a@x"), &record_bytes("a")).unwrap();
        let user = stream(&engine, &UserRange::all()).remove(0).unwrap();
        assert_eq!(user.email, "a@x");
        assert_eq!(user.data["tag"], "a");
        assert_eq!(
            user.created_date.timestamp_millis(),
            user.created_timestamp.unixtime
        );
    }
}
