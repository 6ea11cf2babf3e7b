use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use super::entities::{MacConfig, Station, UnitSystem};

/// Full snapshot of an aircraft setup. Identity is `name`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mac_config: MacConfig,
    pub stations: Vec<Station>,
    #[serde(default)]
    pub unit: UnitSystem,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile name cannot be empty")]
    EmptyName,
    #[error("profile \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("profile \"{0}\" not found")]
    NotFound(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Overwritten,
}

/// Saved profiles in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileBook {
    profiles: Vec<AircraftProfile>,
}

impl ProfileBook {
    pub fn new(profiles: Vec<AircraftProfile>) -> Self {
        Self { profiles }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AircraftProfile> {
        self.profiles.iter()
    }

    pub fn get(&self, name: &str) -> Option<&AircraftProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replacing an existing name requires `overwrite`.
    pub fn save(
        &mut self,
        profile: AircraftProfile,
        overwrite: bool,
    ) -> Result<SaveOutcome, ProfileError> {
        if profile.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(_) if !overwrite => Err(ProfileError::AlreadyExists(profile.name)),
            Some(existing) => {
                info!("overwriting profile {:?}", profile.name);
                *existing = profile;
                Ok(SaveOutcome::Overwritten)
            }
            None => {
                info!("saved profile {:?}", profile.name);
                self.profiles.push(profile);
                Ok(SaveOutcome::Created)
            }
        }
    }

    pub fn delete(&mut self, name: &str) -> Result<AircraftProfile, ProfileError> {
        let pos = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        Ok(self.profiles.remove(pos))
    }

    /// Copies `name` under `new_name`, or "`name` (Copy)" when none is given.
    pub fn duplicate(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<&AircraftProfile, ProfileError> {
        let source = self
            .get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        let new_name = match new_name {
            Some(n) => n.trim().to_string(),
            None => format!("{name} (Copy)"),
        };
        if new_name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if self.contains(&new_name) {
            return Err(ProfileError::AlreadyExists(new_name));
        }

        let copy = AircraftProfile {
            name: new_name,
            timestamp: now,
            ..source.clone()
        };
        self.profiles.push(copy);
        Ok(&self.profiles[self.profiles.len() - 1])
    }
}
