use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request to {url} failed with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("still throttled by {url} after {attempts} retries")]
    Throttled { url: String, attempts: u32 },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed vocabulary file {path:?}: {source}")]
    MalformedVocabulary {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot access {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("no vocabulary files given")]
    NoVocabulary,
    #[error("unknown level {0:?} (expected species, genus or family)")]
    InvalidLevel(String),
    #[error("unknown rank {0:?} (expected species or genus)")]
    InvalidRank(String),
    #[cfg(feature = "kittygfx")]
    #[error("cannot decode image")]
    ImageDecode(#[from] image::ImageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
