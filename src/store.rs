use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::{debug, info, warn};

use crate::domain::{Profile, ProfileKey, Status};
use crate::error::MatchError;

const DOCUMENT_NAME: &str = "profiles.json";
const SCHEMA_VERSION: u32 = 1;

/// Durable, keyed collection of profiles.
///
/// Reads and writes go through one lock. A write builds the next state aside,
/// persists it with a temp-file rename and only then swaps it in, so a failed
/// write leaves both the document and the in-memory view untouched.
#[derive(Debug)]
pub struct Store {
    path: Option<Utf8PathBuf>,
    state: Mutex<StoreState>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    profiles: Vec<Profile>,
    index: HashMap<ProfileKey, usize>,
    self_key: Option<ProfileKey>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    schema_version: u32,
    saved_at: String,
    profiles: &'a [Profile],
}

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(default)]
    schema_version: Option<u32>,
    #[serde(default)]
    profiles: Vec<Profile>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn open(data_dir: &Utf8Path) -> Result<Self, MatchError> {
        fs::create_dir_all(data_dir.as_std_path())
            .map_err(|err| MatchError::StorageFailure(err.to_string()))?;
        let path = data_dir.join(DOCUMENT_NAME);

        let state = if path.as_std_path().exists() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| MatchError::StorageFailure(format!("read {path}: {err}")))?;
            let document: DocumentIn = serde_json::from_str(&content)
                .map_err(|err| MatchError::StorageFailure(format!("parse {path}: {err}")))?;
            if let Some(version) = document.schema_version
                && version > SCHEMA_VERSION
            {
                return Err(MatchError::StorageFailure(format!(
                    "unsupported store schema version {version}"
                )));
            }
            StoreState::from_profiles(document.profiles)?
        } else {
            StoreState::default()
        };

        info!(path = %path, profiles = state.profiles.len(), "opened profile store");
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Insert-or-replace by key, applied as one unit.
    ///
    /// Descriptive attributes of an existing key are replaced but its stored
    /// status is kept, so a refill never reverts a decision made meanwhile.
    /// An incoming `self` status is the one exception and promotes the record.
    pub fn upsert_many(&self, records: Vec<Profile>) -> Result<UpsertOutcome, MatchError> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let mut outcome = UpsertOutcome::default();

        for mut record in records {
            if record.status == Status::SelfProfile {
                if let Some(existing) = &next.self_key
                    && *existing != record.key
                {
                    return Err(MatchError::StorageFailure(format!(
                        "cannot mark {} as self: {existing} already is",
                        record.key
                    )));
                }
                next.self_key = Some(record.key.clone());
            }

            match next.index.get(&record.key).copied() {
                Some(position) => {
                    let stored = next.profiles[position].status;
                    if record.status != Status::SelfProfile {
                        record.status = stored;
                    }
                    next.profiles[position] = record;
                    outcome.updated += 1;
                }
                None => {
                    next.index.insert(record.key.clone(), next.profiles.len());
                    next.profiles.push(record);
                    outcome.inserted += 1;
                }
            }
        }

        self.commit(&mut guard, next)?;
        debug!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            "upserted profiles"
        );
        Ok(outcome)
    }

    pub fn get_self(&self) -> Result<Option<Profile>, MatchError> {
        let guard = self.lock()?;
        Ok(guard
            .self_key
            .as_ref()
            .and_then(|key| guard.index.get(key))
            .map(|&position| guard.profiles[position].clone()))
    }

    pub fn get(&self, key: &ProfileKey) -> Result<Option<Profile>, MatchError> {
        let guard = self.lock()?;
        Ok(guard
            .index
            .get(key)
            .map(|&position| guard.profiles[position].clone()))
    }

    /// Records whose status is not in `excluded`, in insertion order, sliced
    /// by `offset` and `limit`.
    pub fn get_page(
        &self,
        excluded: &[Status],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Profile>, MatchError> {
        let guard = self.lock()?;
        Ok(guard
            .profiles
            .iter()
            .filter(|profile| !excluded.contains(&profile.status))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn get_by_status(&self, status: Status) -> Result<Vec<Profile>, MatchError> {
        let guard = self.lock()?;
        Ok(guard
            .profiles
            .iter()
            .filter(|profile| profile.status == status)
            .cloned()
            .collect())
    }

    pub fn all(&self) -> Result<Vec<Profile>, MatchError> {
        Ok(self.lock()?.profiles.clone())
    }

    pub fn len(&self) -> Result<usize, MatchError> {
        Ok(self.lock()?.profiles.len())
    }

    pub fn is_empty(&self) -> Result<bool, MatchError> {
        Ok(self.len()? == 0)
    }

    /// Returns whether a record with `key` exists. Missing keys are not an
    /// error.
    pub fn set_status(&self, key: &ProfileKey, status: Status) -> Result<bool, MatchError> {
        if status == Status::SelfProfile {
            return Err(MatchError::InvalidArgument(
                "the self status is only assigned by an identity fetch".to_string(),
            ));
        }

        let mut guard = self.lock()?;
        let Some(&position) = guard.index.get(key) else {
            debug!(key = %key, "status update for unknown key ignored");
            return Ok(false);
        };
        match guard.profiles[position].status {
            Status::SelfProfile => {
                return Err(MatchError::InvalidArgument(format!(
                    "status of the signed-in profile {key} cannot change"
                )));
            }
            current if current == status => return Ok(true),
            _ => {}
        }

        let mut next = guard.clone();
        next.profiles[position].status = status;
        self.commit(&mut guard, next)?;
        debug!(key = %key, status = %status, "status updated");
        Ok(true)
    }

    pub fn clear_all(&self) -> Result<(), MatchError> {
        let mut guard = self.lock()?;
        let removed = guard.profiles.len();
        self.commit(&mut guard, StoreState::default())?;
        warn!(removed, "profile store cleared");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, MatchError> {
        self.state
            .lock()
            .map_err(|_| MatchError::StorageFailure("profile store lock poisoned".to_string()))
    }

    fn commit(&self, current: &mut StoreState, next: StoreState) -> Result<(), MatchError> {
        if let Some(path) = &self.path {
            write_document_atomic(path, &next.profiles)?;
        }
        *current = next;
        Ok(())
    }
}

impl StoreState {
    fn from_profiles(profiles: Vec<Profile>) -> Result<Self, MatchError> {
        let mut state = StoreState::default();
        for profile in profiles {
            if profile.status == Status::SelfProfile {
                if let Some(existing) = &state.self_key
                    && *existing != profile.key
                {
                    return Err(MatchError::StorageFailure(format!(
                        "store document holds two self profiles: {existing}, {}",
                        profile.key
                    )));
                }
                state.self_key = Some(profile.key.clone());
            }
            match state.index.get(&profile.key).copied() {
                Some(position) => state.profiles[position] = profile,
                None => {
                    state.index.insert(profile.key.clone(), state.profiles.len());
                    state.profiles.push(profile);
                }
            }
        }
        Ok(state)
    }
}

fn write_document_atomic(path: &Utf8Path, profiles: &[Profile]) -> Result<(), MatchError> {
    let parent = path
        .parent()
        .ok_or_else(|| MatchError::StorageFailure("invalid store path".to_string()))?;
    let document = DocumentOut {
        schema_version: SCHEMA_VERSION,
        saved_at: chrono::Utc::now().to_rfc3339(),
        profiles,
    };
    let content = serde_json::to_vec_pretty(&document)
        .map_err(|err| MatchError::StorageFailure(err.to_string()))?;

    let mut temp = Builder::new()
        .prefix(".profiles")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| MatchError::StorageFailure(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| MatchError::StorageFailure(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| MatchError::StorageFailure(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| MatchError::StorageFailure(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, PersonName, Pictures};

    fn profile(key: &str, status: Status) -> Profile {
        Profile {
            key: key.parse().unwrap(),
            gender: "female".to_string(),
            name: PersonName::default(),
            location: Location::default(),
            email: String::new(),
            username: String::new(),
            dob_date: String::new(),
            age: 30,
            registered_date: String::new(),
            registered_age: 1,
            picture: Pictures::default(),
            education: "MBA".to_string(),
            religion: "Jain".to_string(),
            status,
        }
    }

    #[test]
    fn rejects_second_self_in_one_batch() {
        let store = Store::in_memory();
        let err = store
            .upsert_many(vec![
                profile("a", Status::Pending),
                profile("me", Status::SelfProfile),
                profile("other", Status::SelfProfile),
            ])
            .unwrap_err();
        assert!(matches!(err, MatchError::StorageFailure(_)));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn reupsert_keeps_decided_status() {
        let store = Store::in_memory();
        store
            .upsert_many(vec![profile("u1", Status::Pending)])
            .unwrap();
        store
            .set_status(&"u1".parse().unwrap(), Status::Accepted)
            .unwrap();
        let outcome = store
            .upsert_many(vec![profile("u1", Status::Pending)])
            .unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(store.get_by_status(Status::Accepted).unwrap().len(), 1);
    }
}
