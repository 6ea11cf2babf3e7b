use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Error as SerdeError;

use crate::domain::{AircraftProfile, CustomStationNames, WeightEntry};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "WeightBalance";
const APP_NAME: &str = "WeightBalance";

/// Overrides the platform data directory.
pub const DATA_DIR_ENV: &str = "WB_DATA_DIR";

pub const WEIGHTS_KEY: &str = "weightBalanceData";
pub const STATION_NAMES_KEY: &str = "customStationNames";
pub const PROFILES_KEY: &str = "aircraftProfiles";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

/// Key-value store with one pretty-printed JSON file per key.
#[derive(Clone, Debug)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `WB_DATA_DIR` if set, otherwise the platform config directory.
    pub fn open_default() -> Result<Self, StoreError> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(dir));
        }
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .map(|dirs| Self::with_root(dirs.config_dir()))
            .ok_or(StoreError::StorageUnavailable)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// `Ok(None)` when nothing was stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(key);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no stored value at {}", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        debug!("saved {key} to {}", path.display());
        Ok(())
    }

    /// Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => {
                info!("removed stored {key}");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn load_weights(&self) -> Result<Option<Vec<WeightEntry>>, StoreError> {
        self.get(WEIGHTS_KEY)
    }

    pub fn save_weights(&self, weights: &[WeightEntry]) -> Result<(), StoreError> {
        self.set(WEIGHTS_KEY, weights)
    }

    pub fn load_station_names(&self) -> Result<Option<CustomStationNames>, StoreError> {
        self.get(STATION_NAMES_KEY)
    }

    pub fn save_station_names(&self, names: &CustomStationNames) -> Result<(), StoreError> {
        self.set(STATION_NAMES_KEY, names)
    }

    pub fn load_profiles(&self) -> Result<Vec<AircraftProfile>, StoreError> {
        Ok(self.get(PROFILES_KEY)?.unwrap_or_default())
    }

    pub fn save_profiles(&self, profiles: &[AircraftProfile]) -> Result<(), StoreError> {
        self.set(PROFILES_KEY, profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AppState;

    fn store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::with_root(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn missing_key_reads_as_absent() {
        let (_dir, store) = store();
        assert!(store.load_weights().unwrap().is_none());
        assert!(store.load_profiles().unwrap().is_empty());
        assert!(!store.remove(WEIGHTS_KEY).unwrap());
    }

    #[test]
    fn weights_are_written_as_camel_case_json() {
        let (_dir, store) = store();
        let mut state = AppState::default();
        state.set_weight(1, 40_000.0).unwrap();
        store.save_weights(&state.to_persisted()).unwrap();

        let raw = fs::read_to_string(store.root().join("weightBalanceData.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["stationNumber"], 1);
        assert_eq!(json[0]["weight"], 40_000.0);
        assert_eq!(json[0]["description"], "Basic Aircraft");

        let back = store.load_weights().unwrap().unwrap();
        assert_eq!(back, state.to_persisted());
        assert!(store.remove(WEIGHTS_KEY).unwrap());
    }

    #[test]
    fn partial_station_names_are_accepted() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("customStationNames.json"), r#"{"station9":"Mail"}"#).unwrap();
        let names = store.load_station_names().unwrap().unwrap();
        assert_eq!(names.station8, None);
        assert_eq!(names.station9.as_deref(), Some("Mail"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("aircraftProfiles.json"), "{not json").unwrap();
        assert!(matches!(store.load_profiles(), Err(StoreError::Serde(_))));
    }
}
