//! Blocking client for the iNaturalist v1 API and the wire types it returns.

use crate::error::{Error, Result};
use crate::taxonomy::TaxonLookup;
use log::debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const INAT_BASE: &str = "https://api.inaturalist.org/v1";
pub const MAX_OBSERVATIONS: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub project_id: Option<String>,
    pub per_page: u32,
    pub order_by: String,
    pub order: String,
    pub quality_grade: String,
    pub locale: String,
}

impl Default for ApiQuery {
    fn default() -> Self {
        Self {
            project_id: None,
            per_page: MAX_OBSERVATIONS,
            order_by: "votes".to_string(),
            order: "desc".to_string(),
            quality_grade: "research".to_string(),
            locale: "sv".to_string(),
        }
    }
}

impl ApiQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("per_page", self.per_page.min(MAX_OBSERVATIONS).to_string()),
            ("order_by", self.order_by.clone()),
            ("order", self.order.clone()),
            ("quality_grade", self.quality_grade.clone()),
            ("photos", "true".to_string()),
            ("locale", self.locale.clone()),
        ];
        if let Some(project_id) = &self.project_id {
            params.push(("project_id", project_id.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiObservation {
    pub id: u64,
    pub license_code: Option<String>,
    #[serde(default)]
    pub photos: Vec<ApiPhoto>,
    pub taxon: Option<ApiTaxon>,
    pub user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPhoto {
    pub url: Option<String>,
    pub license_code: Option<String>,
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTaxon {
    pub id: u64,
    pub name: Option<String>,
    pub rank: Option<String>,
    pub preferred_common_name: Option<String>,
    #[serde(default)]
    pub ancestors: Vec<ApiTaxon>,
    pub default_photo: Option<ApiPhoto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesCount {
    #[serde(default)]
    pub count: u64,
    pub taxon: Option<ApiTaxon>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesCountsQuery {
    pub taxon_id: u64,
    pub place_id: u64,
    pub per_page: u32,
    pub locale: String,
}

#[derive(Clone)]
pub struct InatClient {
    client: Client,
    base_url: String,
}

impl InatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        debug!("[Http] GET {} {:?}", url, query);
        let response = self.client.get(&url).query(query).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus { url, status });
        }
        Ok(response.json()?)
    }

    pub fn observations(&self, query: &ApiQuery) -> Result<Vec<ApiObservation>> {
        let page: Paged<ApiObservation> = self.get_json("observations", &query.params())?;
        debug!(
            "[Http] Got {} of {} observations.",
            page.results.len(),
            page.total_results
        );
        Ok(page.results)
    }

    /// `ids` must be non-empty; the API takes them comma separated in the path.
    pub fn taxa(&self, ids: &[u64]) -> Result<Vec<ApiTaxon>> {
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let page: Paged<ApiTaxon> = self.get_json(&format!("taxa/{joined}"), &[])?;
        Ok(page.results)
    }

    pub fn species_counts(&self, query: &SpeciesCountsQuery, page: u32) -> Result<Paged<SpeciesCount>> {
        let params = [
            ("place_id", query.place_id.to_string()),
            ("taxon_id", query.taxon_id.to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", page.to_string()),
            ("verifiable", "true".to_string()),
            ("locale", query.locale.clone()),
            ("order_by", "observations_count".to_string()),
            ("order", "desc".to_string()),
        ];
        self.get_json("observations/species_counts", &params)
    }

    pub fn photo_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl TaxonLookup for InatClient {
    fn lookup(&self, ids: &[u64]) -> Result<Vec<ApiTaxon>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.taxa(ids)
    }
}
