//! Static vocabulary files: one JSON array per broad group, each entry a taxon
//! with an embedded example observation.

pub mod builder;

use crate::error::{Error, Result};
use crate::observation::{is_allowed_license, Attribution, Observation};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabEntry {
    pub scientific_name: String,
    #[serde(default)]
    pub swedish_name: Option<String>,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub taxon_id: Option<u64>,
    #[serde(default)]
    pub obs_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<VocabExample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabExample {
    #[serde(default)]
    pub observation_id: Option<u64>,
    pub photo_url: String,
    #[serde(default)]
    pub license_code: Option<String>,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub observer: Option<String>,
}

/// `insects_genera_sweden.json` holds the `insects` group.
pub fn group_label(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.split('_').next())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// Entries without a licensed example photo are dropped.
pub fn to_observation(entry: VocabEntry, broad_group: Option<&str>, fallback_id: u64) -> Option<Observation> {
    let Some(example) = entry.example else {
        debug!("[Vocab] {} has no example photo. Dropping.", entry.scientific_name);
        return None;
    };
    if example.photo_url.trim().is_empty() || !is_allowed_license(example.license_code.as_deref()) {
        debug!(
            "[Vocab] {} has no licensed example photo ({:?}). Dropping.",
            entry.scientific_name, example.license_code
        );
        return None;
    }
    let id = example.observation_id.or(entry.taxon_id).unwrap_or(fallback_id);
    Some(
        Observation::new(
            id,
            entry.scientific_name,
            example.photo_url,
            example.license_code.unwrap_or_default(),
        )
        .with_common_name(entry.swedish_name)
        .with_taxon_id(entry.taxon_id)
        .with_family(entry.family)
        .with_broad_group(broad_group.map(str::to_string))
        .with_attribution(Attribution {
            text: example.attribution,
            observer: example.observer,
        }),
    )
}

pub fn read_vocab_file(path: &Path) -> Result<Vec<VocabEntry>> {
    let json = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| Error::MalformedVocabulary {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_vocabulary(paths: &[PathBuf]) -> Result<Vec<Observation>> {
    if paths.is_empty() {
        return Err(Error::NoVocabulary);
    }
    let mut observations = Vec::new();
    for path in paths {
        let label = group_label(path);
        let entries = read_vocab_file(path)?;
        let total = entries.len();
        let before = observations.len();
        observations.extend(
            entries
                .into_iter()
                .enumerate()
                .filter_map(|(idx, entry)| {
                    to_observation(entry, label.as_deref(), (before + idx) as u64)
                }),
        );
        info!(
            "[Vocab] {:?} ({:?}): kept {} of {} entries.",
            path,
            label,
            observations.len() - before,
            total
        );
    }
    Ok(observations)
}
