use crate::error::ConfigError;

/// Run-time parameters (single source of truth for one simulation).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub temperature: f64,
    pub sweeps: usize,
    pub equilibration_sweeps: usize,
    pub sample_interval: usize,
    pub seed: u64,
    /// Re-derive the estimators from scratch every this many production
    /// sweeps. `None` never resyncs.
    pub resync_interval: Option<usize>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            sweeps: 1_000,
            equilibration_sweeps: 100,
            sample_interval: 1,
            seed: 0,
            resync_interval: None,
        }
    }
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(ConfigError::NonPositiveTemperature(self.temperature));
        }
        if self.sample_interval == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        if self.resync_interval == Some(0) {
            return Err(ConfigError::ZeroResyncInterval);
        }
        Ok(())
    }

    /// Same parameters at another temperature.
    pub fn with_temperature(&self, temperature: f64) -> Self {
        Self { temperature, ..self.clone() }
    }

    /// Number of sampling events a full production run will produce.
    pub fn expected_samples(&self) -> usize {
        if self.sweeps == 0 {
            0
        } else {
            (self.sweeps - 1) / self.sample_interval + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_must_be_positive() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let p = SimulationParameters { temperature: t, ..Default::default() };
            assert!(matches!(p.validate(), Err(ConfigError::NonPositiveTemperature(_))));
        }
        assert!(SimulationParameters::default().validate().is_ok());
    }

    #[test]
    fn intervals_must_be_nonzero() {
        let p = SimulationParameters { sample_interval: 0, ..Default::default() };
        assert_eq!(p.validate(), Err(ConfigError::ZeroSampleInterval));
        let p = SimulationParameters { resync_interval: Some(0), ..Default::default() };
        assert_eq!(p.validate(), Err(ConfigError::ZeroResyncInterval));
    }

    #[test]
    fn sample_count_counts_sweep_zero() {
        let p = SimulationParameters { sweeps: 10, sample_interval: 3, ..Default::default() };
        // sweeps 0, 3, 6, 9
        assert_eq!(p.expected_samples(), 4);
        let p = SimulationParameters { sweeps: 10, sample_interval: 1, ..Default::default() };
        assert_eq!(p.expected_samples(), 10);
    }
}
