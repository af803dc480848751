use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::extract::CatalogError;
use crate::filter::FilterError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("search failed: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{0}")]
    Usage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
