//! Load, enrich and build: each step finishes before the next starts, and only
//! loading can fail.

use crate::error::Result;
use crate::inat::InatClient;
use crate::observation::Observation;
use crate::quiz::{build_questions, Level, Question, QuizSettings};
use crate::source::{self, DataSource};
use crate::taxonomy::{self, EnrichmentConfig, EnrichmentReport, TaxonLookup};
use rand::Rng;

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    observations: Vec<Observation>,
    enrichment: Option<EnrichmentReport>,
}

impl Pipeline {
    pub fn load(client: &InatClient, source: &DataSource) -> Result<Self> {
        Ok(Self::from_observations(source::load(client, source)?))
    }

    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            enrichment: None,
        }
    }

    #[must_use]
    pub fn enrich<L: TaxonLookup + ?Sized>(self, lookup: &L, config: &EnrichmentConfig) -> Self {
        let (observations, report) = taxonomy::enrich(lookup, self.observations, config);
        Self {
            observations,
            enrichment: Some(report),
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn enrichment(&self) -> Option<&EnrichmentReport> {
        self.enrichment.as_ref()
    }

    /// Questions for `level`; rebuilt from the same observations on every
    /// call, so switching levels never refetches.
    pub fn questions<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        level: Level,
        settings: QuizSettings,
    ) -> Vec<Question> {
        build_questions(rng, &self.observations, level, settings)
    }
}
