//! Store abstraction for backend-agnostic document access.
//!
//! The replacement engine depends only on [`DocumentStore`]; concrete
//! backends live in [`backends`]:
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | PostgreSQL (JSONB table per collection) | [`backends::postgres`] | Live data |
//! | JSON dump file | [`backends::file`] | Exported dumps |
//! | In-memory | [`backends::memory`] | Tests and experiments |
//!
//! # Usage
//!
//! ```ignore
//! let store = content_migration::store::open(&config.store).await?;
//! let documents = store.find_all("h5p").await?;
//! store.close().await;
//! ```

mod traits;

pub mod backends;

pub use traits::{DocumentStore, SwapCounts};

use crate::config::StoreConfig;
use crate::error::AppError;

/// Opens the store described by the configuration.
pub async fn open(config: &StoreConfig) -> Result<Box<dyn DocumentStore>, AppError> {
    match config {
        StoreConfig::Postgres { uri, pool_size } => {
            tracing::info!("Connecting to PostgreSQL at {}", redact(uri));
            let store = backends::postgres::PostgresStore::connect(uri, *pool_size).await?;
            Ok(Box::new(store))
        }
        StoreConfig::File { path } => {
            tracing::info!("Using dump file {}", path.display());
            Ok(Box::new(backends::file::FileStore::new(path)))
        }
    }
}

/// Checks that a collection name is safe to use as a SQL identifier.
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit,
/// up to 63 characters (the PostgreSQL identifier limit).
pub fn validate_collection_name(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= 63 {
        Ok(())
    } else {
        Err(AppError::InvalidCollection(name.to_string()))
    }
}

/// Hides the password of a connection string for logging.
fn redact(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &uri[scheme_end + 3..at];
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &uri[..scheme_end + 3], user, &uri[at..]),
                None => uri.to_string(),
            }
        }
        _ => uri.to_string(),
    }
}
