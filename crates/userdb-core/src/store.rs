//! The account store.
//!
//! `find_user`, `add_user`, `delete_user` and `list_users` are single
//! engine operations; each runs on the blocking pool so a slow disk never
//! stalls the async workers. `modify_user`, `change_password` and
//! `change_email` read a record and write back a value derived from it;
//! they are admitted through the [`WriteSerializer`] so no two of them
//! interleave. A rename is admitted on the shards of both its source and
//! its destination.
//!
//! `add_user` and `delete_user` are not queued. They may land while a
//! queued sequence is between its read and its write; the engine's per-key
//! atomicity keeps every stored value whole, and the last write wins.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::instrument;

use crate::config::StoreConfig;
use crate::error::{Result, UserDbError};
use crate::keys::encode_user_key;
use crate::password::{Argon2Hasher, CredentialHasher};
use crate::record::{RecordBuilder, StoredUser, User};
use crate::serializer::{WriteExecutor, WriteSerializer};
use crate::storage::{BatchOp, KvEngine, MemoryEngine, SledEngine};
use crate::stream::{UserRange, UserStream};

/// Plaintext hashed once per store to give `check_password` a comparable
/// cost when the account does not exist.
const TIMING_DECOY_PASSWORD: &str = "userdb-timing-decoy";

/// A serialized read-modify-write task.
///
/// Carries everything the worker needs to finish the sequence; nothing is
/// captured from the caller's stack.
#[derive(Clone, PartialEq)]
pub struct AccountWrite {
    /// Account the sequence reads (and, except for renames, writes)
    pub email: String,
    pub op: WriteOp,
}

/// The mutation applied between the read and the write.
#[derive(Clone, PartialEq)]
pub enum WriteOp {
    /// Move the record to a new email: delete old key, put new key, atomically.
    ChangeEmail { new_email: String },
    /// Replace the credential with an already-hashed one; `data` is kept.
    ReplacePassword { password: String },
    /// Replace `data`; the credential is kept.
    ReplaceData { data: serde_json::Value },
}

impl fmt::Debug for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::ChangeEmail { new_email } => f
                .debug_struct("ChangeEmail")
                .field("new_email", new_email)
                .finish(),
            WriteOp::ReplacePassword { .. } => f
                .debug_struct("ReplacePassword")
                .field("password", &"[REDACTED]")
                .finish(),
            WriteOp::ReplaceData { data } => {
                f.debug_struct("ReplaceData").field("data", data).finish()
            }
        }
    }
}

impl fmt::Debug for AccountWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountWrite")
            .field("email", &self.email)
            .field("op", &self.op)
            .finish()
    }
}

/// Executes [`AccountWrite`] tasks against the engine.
struct AccountWriter {
    engine: Arc<dyn KvEngine>,
}

impl WriteExecutor for AccountWriter {
    type Task = AccountWrite;

    fn execute(&self, task: AccountWrite) -> Result<()> {
        let key = encode_user_key(&task.email);
        let mut record = load_record(self.engine.as_ref(), &key, &task.email)?;
        record.touch();

        match task.op {
            WriteOp::ChangeEmail { new_email } => {
                let value = record.to_bytes()?;
                self.engine.batch(vec![
                    BatchOp::delete(key),
                    BatchOp::put(encode_user_key(&new_email), value),
                ])
            }
            WriteOp::ReplacePassword { password } => {
                record.password = password;
                self.engine.put(&key, &record.to_bytes()?)
            }
            WriteOp::ReplaceData { data } => {
                record.data = data;
                self.engine.put(&key, &record.to_bytes()?)
            }
        }
    }
}

fn load_record(engine: &dyn KvEngine, key: &[u8], email: &str) -> Result<StoredUser> {
    let bytes = engine
        .get(key)?
        .ok_or_else(|| UserDbError::NotFound(email.to_string()))?;
    StoredUser::from_bytes(&bytes)
}

/// Builder for [`AccountStore`].
pub struct StoreBuilder {
    engine: Arc<dyn KvEngine>,
    config: StoreConfig,
    hasher: Option<Arc<dyn CredentialHasher>>,
}

impl StoreBuilder {
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self {
            engine,
            config: StoreConfig::default(),
            hasher: None,
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom hasher instead of Argon2id with the configured cost.
    pub fn hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Store passwords verbatim.
    ///
    /// DO NOT USE outside throughput benchmarks.
    #[cfg(feature = "insecure-plaintext")]
    pub fn insecure_plaintext_passwords(self) -> Self {
        tracing::warn!("Account store will keep passwords in plaintext");
        self.hasher(Arc::new(crate::password::PlaintextHasher))
    }

    /// Validate the configuration and start the write workers.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::InvalidInput` for a bad configuration and
    /// `UserDbError::Runtime` when called outside a Tokio runtime.
    pub fn build(self) -> Result<AccountStore> {
        self.config.validate()?;
        let hasher = match self.hasher {
            Some(hasher) => hasher,
            None => Arc::new(Argon2Hasher::new(&self.config.hashing)?),
        };
        let writes = WriteSerializer::new(
            AccountWriter {
                engine: Arc::clone(&self.engine),
            },
            self.config.write_shards,
        )?;
        Ok(AccountStore {
            engine: self.engine,
            records: RecordBuilder::new(hasher),
            writes,
            timing_decoy: Arc::new(OnceCell::new()),
        })
    }
}

/// Account store on top of an ordered key-value engine.
pub struct AccountStore {
    engine: Arc<dyn KvEngine>,
    records: RecordBuilder,
    writes: WriteSerializer<AccountWriter>,
    timing_decoy: Arc<OnceCell<String>>,
}

impl AccountStore {
    pub fn builder(engine: impl KvEngine) -> StoreBuilder {
        StoreBuilder::new(Arc::new(engine))
    }

    /// Open a sled-backed store at `path`.
    pub fn open_sled(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::builder(SledEngine::open(path)?).config(config).build()
    }

    /// A store that lives only in memory.
    pub fn in_memory(config: StoreConfig) -> Result<Self> {
        Self::builder(MemoryEngine::new()).config(config).build()
    }

    /// Look up an account.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::NotFound` if no account is stored under `email`.
    pub async fn find_user(&self, email: &str) -> Result<User> {
        let key = encode_user_key(email);
        let owned = email.to_string();
        let stored = self
            .on_engine(move |engine| load_record(engine, &key, &owned))
            .await?;
        Ok(User::from_stored(email.to_string(), stored))
    }

    /// Create an account, or overwrite an existing one with the same email.
    ///
    /// No uniqueness check is made; this is an upsert.
    #[instrument(level = "debug", skip_all, fields(email = %email))]
    pub async fn add_user(&self, email: &str, password: &str, data: serde_json::Value) -> Result<()> {
        let record = self.records.build(password, data).await?;
        let key = encode_user_key(email);
        let value = record.to_bytes()?;
        self.on_engine(move |engine| engine.put(&key, &value)).await
    }

    /// Check a password, returning the account on success.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::NotFound` if there is no such account and
    /// `UserDbError::PasswordMismatch` if the password is wrong.
    #[instrument(level = "debug", skip_all, fields(email = %email))]
    pub async fn check_password(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.find_user(email).await {
            Ok(user) => user,
            Err(err) if err.is_not_found() => {
                self.spend_verify_time(password).await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        if self.records.verify_password(password, &user.password).await? {
            Ok(user)
        } else {
            Err(UserDbError::PasswordMismatch)
        }
    }

    /// Verify against a decoy hash so a missing account costs about as
    /// much as a wrong password.
    async fn spend_verify_time(&self, password: &str) {
        let decoy = Arc::clone(&self.timing_decoy);
        let hasher = Arc::clone(self.records.hasher());
        let password = zeroize::Zeroizing::new(password.to_string());
        let outcome = tokio::task::spawn_blocking(move || {
            let hashed = decoy.get_or_try_init(|| hasher.hash(TIMING_DECOY_PASSWORD))?;
            hasher.verify(&password, hashed)
        })
        .await;
        if let Ok(Err(e)) = outcome {
            tracing::debug!(error = %e, "Decoy verification failed");
        }
    }

    /// Move an account to a new email. Serialized.
    ///
    /// Both timestamps travel with the record; `modifiedTimestamp` is
    /// advanced. Renaming onto an existing email overwrites that account.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::NotFound` if `email` has no account.
    #[instrument(level = "debug", skip_all, fields(email = %email, new_email = %new_email))]
    pub async fn change_email(&self, email: &str, new_email: &str) -> Result<()> {
        let key = encode_user_key(email);
        let new_key = encode_user_key(new_email);
        let task = AccountWrite {
            email: email.to_string(),
            op: WriteOp::ChangeEmail {
                new_email: new_email.to_string(),
            },
        };
        self.writes
            .run_many(&[key.as_slice(), new_key.as_slice()], task)
            .await
    }

    /// Replace an account's password, keeping its `data`. Serialized.
    ///
    /// The new password is hashed before the task is queued, so the queue
    /// is never held for the hash.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::NotFound` if `email` has no account.
    #[instrument(level = "debug", skip_all, fields(email = %email))]
    pub async fn change_password(&self, email: &str, new_password: &str) -> Result<()> {
        let password = self.records.hash_password(new_password).await?;
        self.serialized(AccountWrite {
            email: email.to_string(),
            op: WriteOp::ReplacePassword { password },
        })
        .await
    }

    /// Replace an account's `data`, keeping its password. Serialized.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::NotFound` if `email` has no account.
    #[instrument(level = "debug", skip_all, fields(email = %email))]
    pub async fn modify_user(&self, email: &str, data: serde_json::Value) -> Result<()> {
        self.serialized(AccountWrite {
            email: email.to_string(),
            op: WriteOp::ReplaceData { data },
        })
        .await
    }

    /// Remove an account. Succeeds if it does not exist.
    pub async fn delete_user(&self, email: &str) -> Result<()> {
        let key = encode_user_key(email);
        self.on_engine(move |engine| engine.delete(&key)).await
    }

    /// Iterate accounts in email order.
    ///
    /// The iterator reads the engine synchronously; async callers should
    /// prefer [`list_users`](Self::list_users).
    pub fn stream_users(&self, range: UserRange) -> UserStream<'_> {
        let (lower, upper) = range.key_bounds();
        UserStream::new(self.engine.range(lower, upper, range.reverse), range.limit)
    }

    /// Collect the accounts in `range` on the blocking pool.
    ///
    /// Fails with the first engine or decode error the stream yields.
    pub async fn list_users(&self, range: UserRange) -> Result<Vec<User>> {
        self.on_engine(move |engine| {
            let (lower, upper) = range.key_bounds();
            UserStream::new(engine.range(lower, upper, range.reverse), range.limit).collect()
        })
        .await
    }

    /// Run one synchronous engine call off the async workers.
    async fn on_engine<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KvEngine) -> Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || call(engine.as_ref())).await?
    }

    async fn serialized(&self, task: AccountWrite) -> Result<()> {
        let key = encode_user_key(&task.email);
        self.writes.run(&key, task).await
    }

    /// Serialized tasks admitted but not yet finished.
    pub fn pending_writes(&self) -> usize {
        self.writes.pending()
    }

    pub fn write_shards(&self) -> usize {
        self.writes.shard_count()
    }

    /// Persist buffered engine writes.
    pub fn flush(&self) -> Result<()> {
        self.engine.flush()
    }

    /// Drain the write queue, stop its workers, and flush the engine.
    pub async fn close(&self) -> Result<()> {
        self.writes.close().await?;
        self.engine.flush()
    }
}

impl fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountStore")
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}
