pub mod error;
pub mod inat;
pub mod observation;
pub mod pipeline;
pub mod quiz;
pub mod source;
pub mod state;
pub mod taxonomy;
pub mod vocab;

pub use error::{Error, Result};
