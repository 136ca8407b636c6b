//! Price history sources: JSON files and the synthetic generator.

pub mod synthetic;

pub use synthetic::{generate, SyntheticPairConfig};

use crate::types::PriceObservation;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read price file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid price file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a JSON array of `{ "timestamp", "price_a", "price_b" }` objects.
///
/// Only parses; ordering and price checks happen in the engine.
pub fn load_json(path: &Path) -> Result<Vec<PriceObservation>, DataError> {
    let file = File::open(path)?;
    let observations: Vec<PriceObservation> = serde_json::from_reader(BufReader::new(file))?;
    info!(path = %path.display(), rows = observations.len(), "Loaded price history");
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_json_prices() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"timestamp": 1, "price_a": 10.0, "price_b": 20.5}},
                {{"timestamp": 2, "price_a": 10.5, "price_b": 21.0}}]"#
        )
        .unwrap();

        let observations = load_json(file.path()).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1], PriceObservation::new(2, 10.5, 21.0));
    }

    #[test]
    fn test_load_json_rejects_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_json(file.path()), Err(DataError::Json(_))));
        assert!(matches!(
            load_json(Path::new("/nonexistent/prices.json")),
            Err(DataError::Io(_))
        ));
    }
}
