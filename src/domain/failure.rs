use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::candidate::PairKey;
use super::price_matrix::DataError;
use crate::backtest::EvaluationError;
use crate::strategy::regression::EstimationError;

/// Where in the per-pair pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Scan,
    Fit,
    Backtest,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Scan => write!(f, "scan"),
            PipelineStage::Fit => write!(f, "fit"),
            PipelineStage::Backtest => write!(f, "backtest"),
        }
    }
}

/// Error scoped to a single pair
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("estimation error: {0}")]
    Estimation(#[from] EstimationError),
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// A pair dropped from the run, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub pair: PairKey,
    pub stage: PipelineStage,
    pub error: PairError,
}

impl PairFailure {
    pub fn new(pair: PairKey, stage: PipelineStage, error: impl Into<PairError>) -> Self {
        Self {
            pair,
            stage,
            error: error.into(),
        }
    }
}

impl Serialize for PairFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PairFailure", 3)?;
        s.serialize_field("pair", &self.pair)?;
        s.serialize_field("stage", &self.stage)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_error_keeps_its_variant() {
        let failure = PairFailure::new(
            PairKey::new("A", "B"),
            PipelineStage::Backtest,
            EvaluationError::NonFinite(4),
        );
        assert_eq!(
            failure.error,
            PairError::Evaluation(EvaluationError::NonFinite(4))
        );
    }

    #[test]
    fn test_serializes_stage_and_message() {
        let failure = PairFailure::new(
            PairKey::new("A", "B"),
            PipelineStage::Fit,
            DataError::UnknownSymbol("B".to_string()),
        );
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["stage"], "Fit");
        assert!(json["error"].as_str().unwrap().starts_with("data error:"));
    }
}
