use crate::error::Result;
use crate::inat::{ApiObservation, ApiQuery, InatClient};
use crate::observation::{is_allowed_license, medium_photo_url, Attribution, Observation};
use crate::vocab;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

macro_rules! extract_or_drop {
    ($field:expr, $debug_msg:expr $(, $args:expr)*) => {
        match $field {
            None => {
                debug!($debug_msg $(, $args)*);
                return None;
            }
            Some(value) => value,
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Api(ApiQuery),
    Vocabulary(Vec<PathBuf>),
}

/// Turns an API record into an [`Observation`], or `None` when it has no
/// usable license, photo or name.
pub fn normalize(raw: ApiObservation) -> Option<Observation> {
    if !is_allowed_license(raw.license_code.as_deref()) {
        debug!(
            "[Source] Observation {} is unlicensed ({:?}). Dropping.",
            raw.id, raw.license_code
        );
        return None;
    }
    let photo = extract_or_drop!(
        raw.photos
            .iter()
            .find(|p| p.url.is_some() && is_allowed_license(p.license_code.as_deref())),
        "[Source] Observation {} has no licensed photo. Dropping.",
        raw.id
    );
    let taxon = extract_or_drop!(
        raw.taxon.as_ref(),
        "[Source] Observation {} has no taxon. Dropping.",
        raw.id
    );
    let name = extract_or_drop!(
        taxon.name.as_deref().filter(|n| !n.trim().is_empty()),
        "[Source] Observation {} has an unnamed taxon. Dropping.",
        raw.id
    );

    let photo_url = medium_photo_url(photo.url.as_deref().unwrap_or_default());
    let license = photo.license_code.clone().unwrap_or_default();
    Some(
        Observation::new(raw.id, name, photo_url, license)
            .with_common_name(taxon.preferred_common_name.clone())
            .with_taxon_id(Some(taxon.id))
            .with_attribution(Attribution {
                text: photo.attribution.clone(),
                observer: raw
                    .user
                    .as_ref()
                    .and_then(|u| u.login.clone().or_else(|| u.name.clone())),
            }),
    )
}

pub fn normalize_all(raw: Vec<ApiObservation>) -> Vec<Observation> {
    let fetched = raw.len();
    let observations: Vec<Observation> = raw.into_iter().filter_map(normalize).collect();
    info!(
        "[Source] Kept {} of {} fetched observations.",
        observations.len(),
        fetched
    );
    observations
}

/// Fetches and normalizes observations from `source`.
pub fn load(client: &InatClient, source: &DataSource) -> Result<Vec<Observation>> {
    let now = Instant::now();
    let observations = match source {
        DataSource::Api(query) => normalize_all(client.observations(query)?),
        DataSource::Vocabulary(paths) => vocab::load_vocabulary(paths)?,
    };
    debug!(
        "[Source] Loading took {} ms.",
        now.elapsed().as_millis()
    );
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inat::Paged;

    const PAGE: &str = r#"{
        "total_results": 4,
        "results": [
            {
                "id": 1,
                "license_code": "cc-by-nc",
                "photos": [
                    {"url": "https://static/photos/1/square.jpg", "license_code": null},
                    {"url": "https://static/photos/2/square.jpg", "license_code": "cc-by-nc", "attribution": "(c) anna"}
                ],
                "taxon": {"id": 52775, "name": "Bombus terrestris", "rank": "species", "preferred_common_name": "mörk jordhumla"},
                "user": {"login": "anna", "name": "Anna"}
            },
            {
                "id": 2,
                "license_code": null,
                "photos": [{"url": "https://static/photos/3/square.jpg", "license_code": "cc0"}],
                "taxon": {"id": 1, "name": "Apis mellifera"}
            },
            {
                "id": 3,
                "license_code": "cc0",
                "photos": [],
                "taxon": {"id": 2, "name": "Vespa crabro"}
            },
            {
                "id": 4,
                "license_code": "cc0",
                "photos": [{"url": "https://static/photos/4/square.jpg", "license_code": "cc-by-nd"}],
                "taxon": {"id": 3, "name": "Musca domestica"}
            }
        ]
    }"#;

    #[test]
    fn only_licensed_photographed_records_survive() {
        let page: Paged<ApiObservation> = serde_json::from_str(PAGE).unwrap();
        let observations = normalize_all(page.results);
        assert_eq!(observations.len(), 1);

        let bumblebee = &observations[0];
        assert_eq!(bumblebee.id(), 1);
        assert_eq!(bumblebee.photo_url(), "https://static/photos/2/medium.jpg");
        assert_eq!(bumblebee.license_code(), "cc-by-nc");
        assert_eq!(bumblebee.common_name(), Some("mörk jordhumla"));
        assert_eq!(bumblebee.genus(), Some("Bombus"));
        assert_eq!(bumblebee.taxon_id(), Some(52775));
        assert_eq!(bumblebee.attribution().observer.as_deref(), Some("anna"));
        assert_eq!(bumblebee.family(), None);
    }
}
