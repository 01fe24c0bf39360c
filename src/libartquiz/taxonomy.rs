use crate::error::Result;
use crate::inat::ApiTaxon;
use crate::observation::Observation;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::iter;

pub const TAXA_CHUNK_SIZE: usize = 30;
pub const BROAD_GROUP_RANKS: [&str; 3] = ["class", "phylum", "division"];

/// Resolves taxon ids to taxon records with their ancestors.
pub trait TaxonLookup {
    fn lookup(&self, ids: &[u64]) -> Result<Vec<ApiTaxon>>;
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub chunk_size: usize,
    /// Ranks tried in order when picking the broad group.
    pub broad_group_ranks: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            chunk_size: TAXA_CHUNK_SIZE,
            broad_group_ranks: BROAD_GROUP_RANKS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonInfo {
    pub family: Option<String>,
    pub broad_group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub requested: usize,
    pub resolved: usize,
    pub failed_chunks: usize,
}

impl EnrichmentReport {
    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0 && self.resolved == self.requested
    }
}

/// Reads family and broad group off a taxon and its ancestors.
pub fn resolve(taxon: &ApiTaxon, broad_group_ranks: &[String]) -> TaxonInfo {
    let lineage = || taxon.ancestors.iter().chain(iter::once(taxon));
    let name_at = |rank: &str| {
        lineage()
            .find(|t| t.rank.as_deref() == Some(rank))
            .and_then(|t| t.name.clone())
    };
    TaxonInfo {
        family: name_at("family"),
        broad_group: broad_group_ranks.iter().find_map(|rank| name_at(rank.as_str())),
    }
}

/// Looks up `ids` in chunks. A chunk that fails is logged and skipped.
pub fn lookup_taxonomy<L: TaxonLookup + ?Sized>(
    lookup: &L,
    ids: &[u64],
    config: &EnrichmentConfig,
) -> (HashMap<u64, TaxonInfo>, EnrichmentReport) {
    let unique: Vec<u64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let mut resolved = HashMap::with_capacity(unique.len());
    let mut report = EnrichmentReport {
        requested: unique.len(),
        ..EnrichmentReport::default()
    };

    for (n, chunk) in unique.chunks(config.chunk_size.max(1)).enumerate() {
        match lookup.lookup(chunk) {
            Ok(taxa) => {
                debug!("[Taxonomy] Chunk {} resolved {} taxa.", n + 1, taxa.len());
                for taxon in &taxa {
                    resolved.insert(taxon.id, resolve(taxon, &config.broad_group_ranks));
                }
            }
            Err(err) => {
                warn!("[Taxonomy] Chunk {} ({} ids) failed: {}", n + 1, chunk.len(), err);
                report.failed_chunks += 1;
            }
        }
    }
    report.resolved = resolved.len();
    (resolved, report)
}

/// Best-effort: observations whose taxon could not be resolved keep their
/// missing family and broad group.
pub fn enrich<L: TaxonLookup + ?Sized>(
    lookup: &L,
    observations: Vec<Observation>,
    config: &EnrichmentConfig,
) -> (Vec<Observation>, EnrichmentReport) {
    let ids: Vec<u64> = observations
        .iter()
        .filter(|o| o.needs_taxonomy())
        .filter_map(Observation::taxon_id)
        .collect();
    if ids.is_empty() {
        debug!("[Taxonomy] Nothing to enrich.");
        return (observations, EnrichmentReport::default());
    }

    let (taxa, report) = lookup_taxonomy(lookup, &ids, config);
    info!(
        "[Taxonomy] Resolved {}/{} taxa ({} failed chunks).",
        report.resolved, report.requested, report.failed_chunks
    );
    let enriched = observations
        .into_iter()
        .map(|o| match o.taxon_id().and_then(|id| taxa.get(&id)) {
            Some(info) => {
                let (family, broad_group) = (info.family.as_deref(), info.broad_group.as_deref());
                o.with_taxonomy(family, broad_group)
            }
            None => o,
        })
        .collect();
    (enriched, report)
}
