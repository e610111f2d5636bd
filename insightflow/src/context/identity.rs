//! Run identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::Dataset;

/// Identifies one pipeline run and the dataset it analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Caller-supplied or generated run ID.
    pub run_id: Uuid,
    /// Dataset label.
    pub dataset_name: String,
    /// SHA-256 of the dataset contents.
    pub dataset_fingerprint: String,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
}

impl RunIdentity {
    /// An identity for `dataset` under `run_id`.
    #[must_use]
    pub fn new(run_id: Uuid, dataset: &Dataset) -> Self {
        Self {
            run_id,
            dataset_name: dataset.name().to_string(),
            dataset_fingerprint: dataset.fingerprint(),
            started_at: Utc::now(),
        }
    }

    /// An identity with a freshly generated run ID.
    #[must_use]
    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self::new(Uuid::new_v4(), dataset)
    }

    /// Overrides the start time.
    #[must_use]
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_captures_dataset() {
        let dataset = Dataset::from_records("sales", vec![json!({"a": 1})]).unwrap();
        let run_id = Uuid::new_v4();
        let identity = RunIdentity::new(run_id, &dataset);

        assert_eq!(identity.run_id, run_id);
        assert_eq!(identity.dataset_name, "sales");
        assert_eq!(identity.dataset_fingerprint, dataset.fingerprint());
    }

    #[test]
    fn test_generated_ids_differ() {
        let dataset = Dataset::from_records("sales", vec![]).unwrap();
        assert_ne!(RunIdentity::for_dataset(&dataset).run_id, RunIdentity::for_dataset(&dataset).run_id);
    }
}
