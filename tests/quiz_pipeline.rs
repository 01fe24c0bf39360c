use libartquiz::inat::ApiTaxon;
use libartquiz::pipeline::Pipeline;
use libartquiz::quiz::{Level, QuizSettings, OPTIONS_PER_QUESTION};
use libartquiz::taxonomy::{EnrichmentConfig, TaxonLookup};
use libartquiz::vocab::load_vocabulary;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Every taxon id `n` belongs to family `Family{n / 10}`.
struct Families;

impl TaxonLookup for Families {
    fn lookup(&self, ids: &[u64]) -> libartquiz::Result<Vec<ApiTaxon>> {
        Ok(ids
            .iter()
            .map(|id| ApiTaxon {
                id: *id,
                ancestors: vec![
                    ApiTaxon {
                        id: 1,
                        name: Some("Arthropoda".into()),
                        rank: Some("phylum".into()),
                        ..ApiTaxon::default()
                    },
                    ApiTaxon {
                        id: 2,
                        name: Some(format!("Family{}", id / 10)),
                        rank: Some("family".into()),
                        ..ApiTaxon::default()
                    },
                ],
                ..ApiTaxon::default()
            })
            .collect())
    }
}

fn entry(name: &str, taxon_id: u64, license: &str) -> String {
    format!(
        r#"{{"scientificName": "{name}", "rank": "species", "taxonId": {taxon_id}, "obsCount": 1,
            "example": {{"photoUrl": "https://static/photos/{taxon_id}/medium.jpg", "licenseCode": "{license}"}}}}"#
    )
}

fn write_group(dir: &Path, label: &str, entries: &[String]) -> PathBuf {
    let path = dir.join(format!("{label}_species_sweden.json"));
    fs::write(&path, format!("[{}]", entries.join(","))).unwrap();
    path
}

/// Five insects and three birds, plus one unlicensed insect photo.
fn vocabulary(dir: &Path) -> Vec<PathBuf> {
    let mut insects: Vec<String> = (0..5)
        .map(|i| entry(&format!("Insectus species{i}"), 10 + i * 10, "cc-by"))
        .collect();
    insects.push(entry("Insectus hiddenus", 99, "cc-by-nd"));
    let birds: Vec<String> = (0..3)
        .map(|i| entry(&format!("Avis species{i}"), 60 + i * 10, "cc0"))
        .collect();
    vec![
        write_group(dir, "insects", &insects),
        write_group(dir, "birds", &birds),
    ]
}

#[test]
fn species_quiz_from_vocabulary_files() {
    let dir = tempfile::tempdir().unwrap();
    let observations = load_vocabulary(&vocabulary(dir.path())).unwrap();
    assert_eq!(observations.len(), 8);
    assert!(observations
        .iter()
        .all(|o| o.scientific_name() != "Insectus hiddenus"));

    let pipeline = Pipeline::from_observations(observations);
    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let questions = pipeline.questions(&mut rng, Level::Species, QuizSettings::default());
        assert_eq!(questions.len(), 8);

        let answers: HashSet<&str> = questions.iter().map(|q| q.answer.label.as_str()).collect();
        assert_eq!(answers.len(), 8);

        for q in &questions {
            let labels: HashSet<&str> = q.options.iter().map(|o| o.label.as_str()).collect();
            assert_eq!(labels.len(), OPTIONS_PER_QUESTION);
            assert!(labels.contains(q.answer.label.as_str()));
            if q.answer.broad_group.as_deref() == Some("insects") {
                assert!(labels.iter().all(|l| l.starts_with("Insectus")));
            }
        }
    }
}

#[test]
fn enrichment_unlocks_the_family_level() {
    let dir = tempfile::tempdir().unwrap();
    let observations = load_vocabulary(&vocabulary(dir.path())).unwrap();
    let pipeline = Pipeline::from_observations(observations);
    let mut rng = StdRng::seed_from_u64(5);
    assert!(pipeline
        .questions(&mut rng, Level::Family, QuizSettings::default())
        .is_empty());

    let pipeline = pipeline.enrich(&Families, &EnrichmentConfig::default());
    let report = pipeline.enrichment().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.requested, 8);
    // the file label stays the broad group
    assert!(pipeline
        .observations()
        .iter()
        .all(|o| matches!(o.broad_group(), Some("insects") | Some("birds"))));

    let questions = pipeline.questions(&mut rng, Level::Family, QuizSettings::default());
    assert_eq!(questions.len(), 8);
    assert!(questions.iter().all(|q| q.answer.label.starts_with("Family")));
}
