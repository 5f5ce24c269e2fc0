//! Signal classifier port.
//!
//! A classifier is loaded once, never mutated afterwards, and shared by
//! reference across instrument runs (including rayon workers).

use crate::domain::error::ModelError;
use crate::domain::features::FeatureVector;
use crate::domain::signal::Signal;

pub trait SignalClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, features: &FeatureVector) -> Result<Signal, ModelError>;

    /// Stops at the first failing row.
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<Signal>, ModelError> {
        rows.iter().map(|f| self.predict(f)).collect()
    }
}
