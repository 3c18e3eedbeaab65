// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use atlas_core::AtlasError;

const DEFAULT_MIN_TREND_PERSISTENCE: usize = 3;
const DEFAULT_MIN_CYCLONE_VECTORS: usize = 3;
const DEFAULT_MIN_CDEC_OVERLAP: f64 = 1.0;
const DEFAULT_MIN_CALM_SPAN: usize = 3;
const DEFAULT_CALM_VARIANCE_CEILING: f64 = 0.0005;
const DEFAULT_STABILITY_VARIANCE_FLOOR: f64 = 1e-6;

/// Thresholds for the four pattern detectors.
///
/// Passed explicitly into every detector call; there is no process-wide
/// configuration, so concurrent builds may use different thresholds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectorConfig {
    /// Minimum window count for an emitted jetstream segment.
    pub min_trend_persistence: usize,
    /// Minimum simultaneous positive-gradient vectors for a cyclone.
    pub min_cyclone_vectors: usize,
    /// Minimum cross-domain echo value gating cyclone emission.
    pub min_cdec_overlap: f64,
    /// Minimum window count for an emitted calm zone.
    pub min_calm_span: usize,
    /// Running-variance ceiling that breaks a calm streak.
    pub calm_variance_ceiling: f64,
    /// Variance floor applied before inverting into a stability score.
    pub stability_variance_floor: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_trend_persistence: DEFAULT_MIN_TREND_PERSISTENCE,
            min_cyclone_vectors: DEFAULT_MIN_CYCLONE_VECTORS,
            min_cdec_overlap: DEFAULT_MIN_CDEC_OVERLAP,
            min_calm_span: DEFAULT_MIN_CALM_SPAN,
            calm_variance_ceiling: DEFAULT_CALM_VARIANCE_CEILING,
            stability_variance_floor: DEFAULT_STABILITY_VARIANCE_FLOOR,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.min_trend_persistence < 2 {
            return Err(AtlasError::invalid_input(format!(
                "DetectorConfig.min_trend_persistence must be >= 2; got {}",
                self.min_trend_persistence
            )));
        }
        if self.min_cyclone_vectors < 1 {
            return Err(AtlasError::invalid_input(
                "DetectorConfig.min_cyclone_vectors must be >= 1; got 0",
            ));
        }
        if self.min_calm_span < 2 {
            return Err(AtlasError::invalid_input(format!(
                "DetectorConfig.min_calm_span must be >= 2; got {}",
                self.min_calm_span
            )));
        }
        if !self.min_cdec_overlap.is_finite() || self.min_cdec_overlap < 0.0 {
            return Err(AtlasError::invalid_input(format!(
                "DetectorConfig.min_cdec_overlap must be finite and >= 0.0; got {}",
                self.min_cdec_overlap
            )));
        }
        if !self.calm_variance_ceiling.is_finite() || self.calm_variance_ceiling <= 0.0 {
            return Err(AtlasError::invalid_input(format!(
                "DetectorConfig.calm_variance_ceiling must be finite and > 0.0; got {}",
                self.calm_variance_ceiling
            )));
        }
        if !self.stability_variance_floor.is_finite() || self.stability_variance_floor <= 0.0 {
            return Err(AtlasError::invalid_input(format!(
                "DetectorConfig.stability_variance_floor must be finite and > 0.0; got {}",
                self.stability_variance_floor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DetectorConfig;

    #[test]
    fn default_config_is_valid() {
        DetectorConfig::default()
            .validate()
            .expect("defaults should validate");
    }

    #[test]
    fn rejects_degenerate_trend_persistence() {
        let config = DetectorConfig {
            min_trend_persistence: 1,
            ..DetectorConfig::default()
        };
        let err = config.validate().expect_err("persistence 1 must fail");
        assert!(err.to_string().contains("min_trend_persistence"));
    }

    #[test]
    fn rejects_non_positive_variance_ceiling() {
        let config = DetectorConfig {
            calm_variance_ceiling: 0.0,
            ..DetectorConfig::default()
        };
        let err = config.validate().expect_err("zero ceiling must fail");
        assert!(err.to_string().contains("calm_variance_ceiling"));
    }

    #[test]
    fn rejects_negative_cdec_overlap() {
        let config = DetectorConfig {
            min_cdec_overlap: -0.5,
            ..DetectorConfig::default()
        };
        let err = config.validate().expect_err("negative overlap must fail");
        assert!(err.to_string().contains("min_cdec_overlap"));
    }
}
