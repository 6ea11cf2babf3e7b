use std::{borrow::Cow, sync::OnceLock};

use rust_embed::RustEmbed;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{MacConfig, Station, StationKind};

/// Embed the aircraft templates into the binary.
#[derive(RustEmbed)]
#[folder = "assets/templates"]
struct EmbeddedTemplates;

static TEMPLATE_KEYS: OnceLock<Vec<String>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template \"{0}\" not found")]
    NotFound(String),
    #[error("template \"{key}\" is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateFile {
    name: String,
    #[serde(default)]
    description: String,
    mac_config: MacConfig,
    stations: Vec<TemplateStation>,
}

#[derive(Clone, Debug, Deserialize)]
struct TemplateStation {
    description: String,
    arm: f64,
    #[serde(rename = "type")]
    kind: StationKind,
    #[serde(default)]
    weight: f64,
}

/// A stock aircraft. Arms are inches, weights pounds.
#[derive(Clone, Debug, PartialEq)]
pub struct AircraftTemplate {
    pub key: String,
    pub name: String,
    pub description: String,
    pub mac_config: MacConfig,
    pub stations: Vec<Station>,
}

/// Template keys, sorted.
pub fn template_keys() -> &'static [String] {
    TEMPLATE_KEYS.get_or_init(|| {
        let mut keys: Vec<String> = EmbeddedTemplates::iter()
            .filter_map(|path| path.strip_suffix(".json").map(str::to_string))
            .collect();
        keys.sort();
        keys
    })
}

pub fn load_template(key: &str) -> Result<AircraftTemplate, TemplateError> {
    let data: Cow<'static, [u8]> = EmbeddedTemplates::get(&format!("{key}.json"))
        .map(|file| file.data)
        .ok_or_else(|| TemplateError::NotFound(key.to_string()))?;
    let file: TemplateFile =
        serde_json::from_slice(&data).map_err(|source| TemplateError::Corrupt {
            key: key.to_string(),
            source,
        })?;

    let stations = file
        .stations
        .into_iter()
        .enumerate()
        .map(|(pos, s)| Station::new(pos + 1, s.description, s.arm, s.kind).with_weight(s.weight))
        .collect();

    Ok(AircraftTemplate {
        key: key.to_string(),
        name: file.name,
        description: file.description,
        mac_config: file.mac_config,
        stations,
    })
}

pub fn all_templates() -> Result<Vec<AircraftTemplate>, TemplateError> {
    template_keys().iter().map(|key| load_template(key)).collect()
}
