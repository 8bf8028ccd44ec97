//! Flat-file JSON database
//!
//! The whole database is one JSON document with a collection per resource.
//! A single mutex serializes access: every mutation is read-modify-write
//! under the lock and is persisted before the lock is released, so readers
//! only ever observe committed state. Writes go to a temp file in the same
//! directory which is then renamed over the target.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Goal, Jar, Notification, Transaction, User};

/// Seed data written to a fresh data file
const SEED_DATA: &str = include_str!("../config/seed.json");

/// All collections held in the data file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub jars: Vec<Jar>,
}

impl Database {
    /// Mock data shipped with the binary
    pub fn seed() -> Result<Self> {
        Ok(serde_json::from_str(SEED_DATA)?)
    }
}

/// A record type stored in one collection of the database
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, also used in log and error messages
    const KIND: &'static str;
    /// Prefix of generated ids (`tx-...`)
    const ID_PREFIX: &'static str;
    /// JSON field holding the id
    const ID_FIELD: &'static str;

    fn id(&self) -> &str;

    fn collection(db: &Database) -> &Vec<Self>;

    fn collection_mut(db: &mut Database) -> &mut Vec<Self>;

    /// Set timestamps on create (`created = true`) or update
    fn stamp(&mut self, _now: DateTime<Utc>, _created: bool) {}
}

macro_rules! impl_record {
    ($ty:ty, $kind:literal, $prefix:literal, $field:ident, $coll:ident) => {
        impl_record!(@impl $ty, $kind, $prefix, $field, $coll, |record: &mut $ty, now: DateTime<Utc>, created: bool| {
            if created && record.created_at.is_none() {
                record.created_at = Some(now);
            }
            record.updated_at = Some(now);
        });
    };
    ($ty:ty, $kind:literal, $prefix:literal, $field:ident, $coll:ident, created_only) => {
        impl_record!(@impl $ty, $kind, $prefix, $field, $coll, |record: &mut $ty, now: DateTime<Utc>, created: bool| {
            if created && record.created_at.is_none() {
                record.created_at = Some(now);
            }
        });
    };
    (@impl $ty:ty, $kind:literal, $prefix:literal, $field:ident, $coll:ident, $stamp:expr) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;
            const ID_PREFIX: &'static str = $prefix;
            const ID_FIELD: &'static str = stringify!($field);

            fn id(&self) -> &str {
                &self.$field
            }

            fn collection(db: &Database) -> &Vec<Self> {
                &db.$coll
            }

            fn collection_mut(db: &mut Database) -> &mut Vec<Self> {
                &mut db.$coll
            }

            fn stamp(&mut self, now: DateTime<Utc>, created: bool) {
                let stamp = $stamp;
                stamp(self, now, created);
            }
        }
    };
}

impl_record!(User, "users", "user", user_id, users);
impl_record!(Transaction, "transactions", "tx", transaction_id, transactions);
impl_record!(Goal, "goals", "goal", goal_id, goals);
impl_record!(Jar, "jars", "jar", jar_code, jars);
impl_record!(Notification, "notifications", "noti", notification_id, notifications, created_only);

/// Generate a record id with the collection prefix
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// Handle to the flat-file database; clones share the same lock
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Mutex<Database>>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the data file, writing the seed data if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let db = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let db: Database = if content.trim().is_empty() {
                Database::default()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::InvalidData(format!("Corrupt data file {}: {}", path.display(), e))
                })?
            };
            debug!(
                "Opened data file {} ({} transactions)",
                path.display(),
                db.transactions.len()
            );
            db
        } else {
            let db = Database::seed()?;
            write_atomic(&path, &db)?;
            info!("Created data file with seed data: {}", path.display());
            db
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
            path: Some(path),
        })
    }

    /// Non-persistent store holding the given database
    pub fn in_memory(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
            path: None,
        }
    }

    /// Non-persistent store with no records
    pub fn empty() -> Self {
        Self::in_memory(Database::default())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.inner
            .lock()
            .map_err(|_| Error::InvalidData("Data store lock poisoned".into()))
    }

    /// Copy of the whole database
    pub fn snapshot(&self) -> Result<Database> {
        Ok(self.lock()?.clone())
    }

    /// Run a read-only closure against the database
    pub fn read<T>(&self, f: impl FnOnce(&Database) -> T) -> Result<T> {
        let db = self.lock()?;
        Ok(f(&db))
    }

    /// Run a mutation and persist the result
    ///
    /// If the closure fails, or the write fails, the in-memory state is
    /// rolled back so it never diverges from the file.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut db = self.lock()?;
        let mut draft = db.clone();
        let out = f(&mut draft)?;
        if let Some(path) = &self.path {
            write_atomic(path, &draft)?;
        }
        *db = draft;
        Ok(out)
    }

    pub fn list<R: Record>(&self) -> Result<Vec<R>> {
        self.read(|db| R::collection(db).clone())
    }

    pub fn get<R: Record>(&self, id: &str) -> Result<R> {
        self.read(|db| R::collection(db).iter().find(|r| r.id() == id).cloned())?
            .ok_or_else(|| not_found::<R>(id))
    }

    /// Create a record from a JSON body; the id is always generated
    pub fn create<R: Record>(&self, body: Value) -> Result<R> {
        self.create_checked(body, |_, _| Ok(()))
    }

    /// Create a record once `check` accepts it against the current collection
    ///
    /// The check and the insert happen under the same lock, so a uniqueness
    /// rule enforced by `check` holds under concurrent writers.
    pub fn create_checked<R: Record>(
        &self,
        body: Value,
        check: impl FnOnce(&[R], &R) -> Result<()>,
    ) -> Result<R> {
        let mut fields = into_object(body)?;
        let id = generate_id(R::ID_PREFIX);
        fields.insert(R::ID_FIELD.to_string(), Value::String(id.clone()));

        let mut record: R = serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::Validation(format!("Invalid {} record: {}", R::KIND, e)))?;
        record.stamp(Utc::now(), true);

        let record = self.insert_checked(record, check)?;
        debug!(kind = R::KIND, id = %id, "Created record");
        Ok(record)
    }

    /// Insert a fully built record, keeping its id
    pub fn insert<R: Record>(&self, record: R) -> Result<R> {
        self.insert_checked(record, |_, _| Ok(()))
    }

    /// Insert a fully built record once `check` accepts it, under one lock
    pub fn insert_checked<R: Record>(
        &self,
        record: R,
        check: impl FnOnce(&[R], &R) -> Result<()>,
    ) -> Result<R> {
        self.mutate(|db| {
            let records = R::collection(db);
            if records.iter().any(|r| r.id() == record.id()) {
                return Err(Error::Validation(format!(
                    "{} {} already exists",
                    R::KIND,
                    record.id()
                )));
            }
            check(records, &record)?;
            R::collection_mut(db).push(record.clone());
            Ok(())
        })?;
        Ok(record)
    }

    /// Shallow-merge a JSON body over an existing record
    ///
    /// Top-level fields in `patch` replace the record's fields; the id is
    /// kept even if the body tries to change it.
    pub fn update<R: Record>(&self, id: &str, patch: Value) -> Result<R> {
        let patch = into_object(patch)?;
        let updated = self.mutate(|db| {
            let records = R::collection_mut(db);
            let slot = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| not_found::<R>(id))?;

            let mut fields = into_object(serde_json::to_value(&*slot)?)?;
            fields.extend(patch);
            fields.insert(R::ID_FIELD.to_string(), Value::String(id.to_string()));

            let mut merged: R = serde_json::from_value(Value::Object(fields))
                .map_err(|e| Error::Validation(format!("Invalid {} update: {}", R::KIND, e)))?;
            merged.stamp(Utc::now(), false);
            *slot = merged.clone();
            Ok(merged)
        })?;
        debug!(kind = R::KIND, id, "Updated record");
        Ok(updated)
    }

    /// Apply a typed edit to one record
    pub fn modify<R: Record>(&self, id: &str, edit: impl FnOnce(&mut R)) -> Result<R> {
        self.mutate(|db| {
            let slot = R::collection_mut(db)
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| not_found::<R>(id))?;
            edit(slot);
            slot.stamp(Utc::now(), false);
            Ok(slot.clone())
        })
    }

    /// Remove a record, returning it
    pub fn remove<R: Record>(&self, id: &str) -> Result<R> {
        let removed = self.mutate(|db| {
            let records = R::collection_mut(db);
            let idx = records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| not_found::<R>(id))?;
            Ok(records.remove(idx))
        })?;
        debug!(kind = R::KIND, id, "Removed record");
        Ok(removed)
    }
}

fn not_found<R: Record>(id: &str) -> Error {
    Error::NotFound(format!("{} {}", R::KIND, id))
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(Error::Validation("Request body must be a JSON object".into())),
    }
}

/// Write the database to a temp file beside `path`, then rename it into place
fn write_atomic(path: &Path, db: &Database) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, db)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
