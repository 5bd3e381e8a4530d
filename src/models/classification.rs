use crate::error::FilterError;
use crate::models::domain::Tier;
use serde::{Deserialize, Serialize};

/// Qualitative confidence the upstream classifier attaches to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

/// D1-vs-non-D1 boundary result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct D1Result {
    #[serde(alias = "d1_probability")]
    pub probability: f64,
    #[serde(alias = "d1_prediction")]
    pub prediction: bool,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Power-4-vs-other-D1 boundary result. Only meaningful for predicted D1 athletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P4Result {
    #[serde(alias = "p4_probability")]
    pub probability: f64,
    #[serde(alias = "p4_prediction")]
    pub prediction: bool,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub is_elite: bool,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Pre-computed tier classification for one applicant.
///
/// `p4` is only populated when `d1.prediction` is true; construct through
/// [`TierClassification::new`] (or call [`validate`](Self::validate) after
/// deserializing) to enforce that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierClassification {
    #[serde(alias = "d1_results")]
    pub d1: D1Result,
    #[serde(alias = "p4_results", default)]
    pub p4: Option<P4Result>,
}

impl TierClassification {
    pub fn new(d1: D1Result, p4: Option<P4Result>) -> Result<Self, FilterError> {
        let classification = Self { d1, p4 };
        classification.validate()?;
        Ok(classification)
    }

    /// Convenience constructor used heavily in tests and benches
    pub fn from_probabilities(d1_probability: f64, p4_probability: Option<f64>) -> Result<Self, FilterError> {
        let d1 = D1Result {
            probability: d1_probability,
            prediction: d1_probability >= 0.5,
            confidence: Confidence::default(),
            model_version: None,
        };
        let p4 = p4_probability.map(|probability| P4Result {
            probability,
            prediction: probability >= 0.5,
            confidence: Confidence::default(),
            is_elite: false,
            model_version: None,
        });
        Self::new(d1, p4)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        check_probability("d1_probability", self.d1.probability)?;
        if let Some(p4) = &self.p4 {
            check_probability("p4_probability", p4.probability)?;
            if !self.d1.prediction {
                return Err(FilterError::invalid(
                    "p4_results may only be present when d1_prediction is true",
                ));
            }
        }
        Ok(())
    }

    pub fn d1_probability(&self) -> f64 {
        self.d1.probability
    }

    /// Missing P4 result counts as probability zero
    pub fn p4_probability(&self) -> f64 {
        self.p4.as_ref().map(|p| p.probability).unwrap_or(0.0)
    }

    /// The classifier's top prediction
    pub fn primary_tier(&self) -> Tier {
        match (&self.p4, self.d1.prediction) {
            (Some(p4), true) if p4.prediction => Tier::Power4D1,
            (_, true) => Tier::NonP4D1,
            _ => Tier::NonD1,
        }
    }
}

fn check_probability(field: &str, value: f64) -> Result<(), FilterError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FilterError::invalid(format!("{} {} must be within [0, 1]", field, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_tier() {
        let p4 = TierClassification::from_probabilities(0.9, Some(0.8)).unwrap();
        assert_eq!(p4.primary_tier(), Tier::Power4D1);

        let mid = TierClassification::from_probabilities(0.75, Some(0.35)).unwrap();
        assert_eq!(mid.primary_tier(), Tier::NonP4D1);

        let non_d1 = TierClassification::from_probabilities(0.2, None).unwrap();
        assert_eq!(non_d1.primary_tier(), Tier::NonD1);
    }

    #[test]
    fn test_p4_requires_d1_prediction() {
        let err = TierClassification::from_probabilities(0.3, Some(0.1)).unwrap_err();
        assert!(matches!(err, FilterError::InvalidInput(_)));
    }

    #[test]
    fn test_probability_bounds() {
        assert!(TierClassification::from_probabilities(1.2, None).is_err());
        assert!(TierClassification::from_probabilities(f64::NAN, None).is_err());
    }

    #[test]
    fn test_deserialize_classifier_payload() {
        let json = r#"{
            "d1_results": {"d1_probability": 0.75, "d1_prediction": true, "confidence": "High", "model_version": "v2.1"},
            "p4_results": {"p4_probability": 0.35, "p4_prediction": false, "confidence": "Medium", "is_elite": false}
        }"#;
        let classification: TierClassification = serde_json::from_str(json).unwrap();
        classification.validate().unwrap();
        assert_eq!(classification.primary_tier(), Tier::NonP4D1);
        assert_eq!(classification.d1.confidence, Confidence::High);
        assert!((classification.p4_probability() - 0.35).abs() < f64::EPSILON);
    }
}
