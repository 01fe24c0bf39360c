use crate::error::{Error, Result};
use crate::inat::{ApiTaxon, InatClient, SpeciesCount, SpeciesCountsQuery};
use crate::observation::{is_allowed_license, medium_photo_url};
use crate::vocab::{VocabEntry, VocabExample};
use log::{info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// iNaturalist place id for Sweden.
pub const SWEDEN_PLACE_ID: u64 = 7599;
pub const DEFAULT_TOP_N: usize = 100;
pub const PER_PAGE: u32 = 200;
pub const MAX_SPECIES_PAGES: u32 = 5;
pub const MAX_RETRIES_PER_REQUEST: u32 = 5;
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const PAGE_PAUSE: Duration = Duration::from_millis(200);

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub label: String,
    pub taxon_ids: Vec<u64>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl GroupConfig {
    fn new(label: &str, taxon_ids: &[u64], top_n: usize) -> Self {
        Self {
            label: label.to_string(),
            taxon_ids: taxon_ids.to_vec(),
            top_n,
        }
    }
}

pub fn default_groups() -> Vec<GroupConfig> {
    vec![
        GroupConfig::new("insects", &[47158], 70),
        GroupConfig::new("plants", &[47126], 100),
        // Bryophyta + Marchantiophyta
        GroupConfig::new("mosses", &[311249, 64615], 35),
        // Lecanoromycetes, the main lichen class
        GroupConfig::new("lichens", &[54743], 30),
        GroupConfig::new("mammals", &[40151], 20),
        GroupConfig::new("birds", &[3], 50),
        GroupConfig::new("fungi", &[47170], 50),
        GroupConfig::new("spiders", &[47118], 35),
    ]
}

pub fn read_groups(path: &Path) -> Result<Vec<GroupConfig>> {
    let json = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VocabRank {
    #[default]
    Genus,
    Species,
}

impl VocabRank {
    pub fn plural(self) -> &'static str {
        match self {
            VocabRank::Genus => "genera",
            VocabRank::Species => "species",
        }
    }
}

impl fmt::Display for VocabRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VocabRank::Genus => "genus",
            VocabRank::Species => "species",
        })
    }
}

impl FromStr for VocabRank {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "genus" => Ok(VocabRank::Genus),
            "species" => Ok(VocabRank::Species),
            other => Err(Error::InvalidRank(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_retries: u32,
    pub initial: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES_PER_REQUEST,
            initial: INITIAL_BACKOFF,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based): doubles every time.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Repeats `request` while the server answers 429, sleeping with exponential
/// backoff. Any other outcome is returned as is.
pub fn with_retry<T, F>(backoff: &Backoff, mut request: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match request() {
            Err(Error::HttpStatus { url, status }) if status == StatusCode::TOO_MANY_REQUESTS => {
                attempt += 1;
                if attempt > backoff.max_retries {
                    return Err(Error::Throttled {
                        url,
                        attempts: backoff.max_retries,
                    });
                }
                let wait = backoff.delay(attempt);
                warn!(
                    "[Vocab] Got 429 (throttling). Sleeping {:.1}s before retry {}/{}...",
                    wait.as_secs_f32(),
                    attempt,
                    backoff.max_retries
                );
                thread::sleep(wait);
            }
            other => return other,
        }
    }
}

pub fn fetch_species_counts(
    client: &InatClient,
    query: &SpeciesCountsQuery,
    max_pages: u32,
    backoff: &Backoff,
) -> Result<Vec<SpeciesCount>> {
    let mut results = Vec::new();
    let mut page = 1;
    loop {
        if page > max_pages {
            info!("[Vocab] Reached {} pages, stopping early.", max_pages);
            break;
        }
        info!(
            "[Vocab] Requesting species_counts for taxon_id={}, place_id={}, page={}...",
            query.taxon_id, query.place_id, page
        );
        let data = with_retry(backoff, || client.species_counts(query, page))?;
        if data.results.is_empty() {
            break;
        }
        results.extend(data.results);
        if u64::from(page) * u64::from(query.per_page) >= data.total_results {
            break;
        }
        page += 1;
        thread::sleep(PAGE_PAUSE);
    }
    Ok(results)
}

fn example_from(taxon: &ApiTaxon) -> Option<VocabExample> {
    let photo = taxon.default_photo.as_ref()?;
    let url = photo.url.as_deref()?;
    if !is_allowed_license(photo.license_code.as_deref()) {
        return None;
    }
    Some(VocabExample {
        observation_id: None,
        photo_url: medium_photo_url(url),
        license_code: photo.license_code.clone(),
        attribution: photo.attribution.clone(),
        observer: None,
    })
}

/// Folds species counts into vocabulary entries at `rank`, most observed
/// first, keeping at most `top_n`.
pub fn aggregate(counts: &[SpeciesCount], rank: VocabRank, top_n: usize) -> Vec<VocabEntry> {
    let mut entries: Vec<VocabEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in counts {
        let Some(taxon) = &item.taxon else { continue };
        let Some(name) = taxon.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        match rank {
            VocabRank::Species => entries.push(VocabEntry {
                scientific_name: name.to_string(),
                swedish_name: taxon.preferred_common_name.clone(),
                rank: taxon.rank.clone().unwrap_or_else(|| "species".to_string()),
                taxon_id: Some(taxon.id),
                obs_count: item.count,
                family: None,
                example: example_from(taxon),
            }),
            VocabRank::Genus => {
                let genus = name.split_whitespace().next().unwrap_or(name);
                let idx = *index.entry(genus.to_string()).or_insert_with(|| {
                    entries.push(VocabEntry {
                        scientific_name: genus.to_string(),
                        swedish_name: None,
                        rank: "genus".to_string(),
                        taxon_id: None,
                        obs_count: 0,
                        family: None,
                        example: None,
                    });
                    entries.len() - 1
                });
                let entry = &mut entries[idx];
                entry.obs_count += item.count;
                // borrowed from the first species that has one
                if entry.swedish_name.is_none() {
                    entry.swedish_name = taxon.preferred_common_name.clone();
                }
                if entry.example.is_none() {
                    entry.example = example_from(taxon);
                }
            }
        }
    }

    entries.sort_by(|a, b| b.obs_count.cmp(&a.obs_count));
    entries.truncate(top_n);
    entries
}

pub fn output_path(dir: &Path, label: &str, rank: VocabRank, region: &str) -> PathBuf {
    dir.join(format!("{}_{}_{}.json", label, rank.plural(), region))
}

pub fn write_vocab(path: &Path, entries: &[VocabEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inat::ApiPhoto;
    use std::cell::Cell;

    fn count(name: &str, common: Option<&str>, n: u64, license: Option<&str>) -> SpeciesCount {
        SpeciesCount {
            count: n,
            taxon: Some(ApiTaxon {
                id: n,
                name: Some(name.to_string()),
                rank: Some("species".to_string()),
                preferred_common_name: common.map(str::to_string),
                default_photo: Some(ApiPhoto {
                    url: Some(format!("https://static/photos/{n}/square.jpg")),
                    license_code: license.map(str::to_string),
                    attribution: None,
                }),
                ..ApiTaxon::default()
            }),
        }
    }

    fn counts() -> Vec<SpeciesCount> {
        vec![
            count("Bombus terrestris", None, 10, None),
            count("Apis mellifera", Some("honungsbi"), 30, Some("cc-by")),
            count("Bombus lapidarius", Some("stenhumla"), 25, Some("cc0")),
            count("Vespa crabro", None, 5, Some("cc-by")),
        ]
    }

    #[test]
    fn genera_sum_counts_and_sort_descending() {
        let genera = aggregate(&counts(), VocabRank::Genus, 10);
        let summary: Vec<(&str, u64)> = genera
            .iter()
            .map(|g| (g.scientific_name.as_str(), g.obs_count))
            .collect();
        assert_eq!(summary, vec![("Bombus", 35), ("Apis", 30), ("Vespa", 5)]);

        let bombus = &genera[0];
        assert_eq!(bombus.rank, "genus");
        assert_eq!(bombus.taxon_id, None);
        assert_eq!(bombus.swedish_name.as_deref(), Some("stenhumla"));
        // the first species' photo is unlicensed
        assert_eq!(
            bombus.example.as_ref().map(|e| e.photo_url.as_str()),
            Some("https://static/photos/25/medium.jpg")
        );
    }

    #[test]
    fn species_rank_keeps_taxa_and_top_n() {
        let species = aggregate(&counts(), VocabRank::Species, 2);
        assert_eq!(species.len(), 2);
        assert_eq!(species[0].scientific_name, "Apis mellifera");
        assert_eq!(species[0].taxon_id, Some(30));
        assert_eq!(species[1].scientific_name, "Bombus lapidarius");
    }

    #[test]
    fn retries_throttled_requests_then_gives_up() {
        let backoff = Backoff {
            max_retries: 2,
            initial: Duration::ZERO,
        };
        let throttled = || Error::HttpStatus {
            url: "species_counts".into(),
            status: StatusCode::TOO_MANY_REQUESTS,
        };

        let calls = Cell::new(0);
        let ok = with_retry(&backoff, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(throttled())
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(ok.unwrap(), 3);

        let calls = Cell::new(0);
        let err = with_retry(&backoff, || -> Result<()> {
            calls.set(calls.get() + 1);
            Err(throttled())
        });
        assert!(matches!(err, Err(Error::Throttled { attempts: 2, .. })));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn other_failures_are_not_retried() {
        let calls = Cell::new(0);
        let err = with_retry(&Backoff::default(), || -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::HttpStatus {
                url: "species_counts".into(),
                status: StatusCode::NOT_FOUND,
            })
        });
        assert!(err.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn backoff_doubles() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn written_files_load_back_as_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "insects", VocabRank::Genus, "sweden");
        assert!(path.ends_with("insects_genera_sweden.json"));

        write_vocab(&path, &aggregate(&counts(), VocabRank::Genus, 10)).unwrap();
        let observations = crate::vocab::load_vocabulary(&[path]).unwrap();
        let names: Vec<&str> = observations.iter().map(|o| o.scientific_name()).collect();
        assert_eq!(names, vec!["Bombus", "Apis", "Vespa"]);
        assert!(observations
            .iter()
            .all(|o| o.broad_group() == Some("insects")));
    }
}
