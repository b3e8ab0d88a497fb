//! JSON model configuration.
//!
//! ```json
//! {
//!   "model": "soma",
//!   "g_bar": { "NaTs2t": 8000.0, "pas": 0.25 },
//!   "vm0": -70.0,
//!   "conductance_policy": "strict"
//! }
//! ```

use crate::model::NeuronModel;
use crate::models;
use crate::registry::ConductancePolicy;
use serde::{Deserialize, Serialize};
use sonic_core::{Capacitance, Conductance, Result, SonicError, Voltage};
use std::collections::BTreeMap;
use std::path::Path;

/// Selection and overrides for one registered model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeuronConfig {
    /// Registered model name
    pub model: String,
    /// Maximal conductance overrides by channel name, `pas` for the leak (S/m^2)
    #[serde(default)]
    pub g_bar: BTreeMap<String, Conductance>,
    /// Resting potential override (mV)
    #[serde(default)]
    pub vm0: Option<Voltage>,
    /// Membrane capacitance override (F/m^2)
    #[serde(default)]
    pub cm0: Option<Capacitance>,
    #[serde(default)]
    pub conductance_policy: ConductancePolicy,
}

impl NeuronConfig {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            g_bar: BTreeMap::new(),
            vm0: None,
            cm0: None,
            conductance_policy: ConductancePolicy::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading neuron config");
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no model can run with
    pub fn validate(&self) -> Result<()> {
        for (channel, &g) in &self.g_bar {
            if !g.is_finite() || g < 0.0 {
                return Err(SonicError::ConfigError(format!(
                    "g_bar of {} must be finite and non-negative, got {}",
                    channel, g
                )));
            }
        }
        if let Some(cm0) = self.cm0 {
            if !(cm0 > 0.0) || !cm0.is_finite() {
                return Err(SonicError::ConfigError(format!(
                    "cm0 must be positive, got {}",
                    cm0
                )));
            }
        }
        if let Some(vm0) = self.vm0 {
            if !vm0.is_finite() {
                return Err(SonicError::ConfigError(format!("vm0 must be finite, got {}", vm0)));
            }
        }
        Ok(())
    }

    /// Build the configured model
    pub fn build(&self) -> Result<NeuronModel> {
        self.validate()?;
        let mut model = models::by_name(&self.model)?;
        for (channel, &g) in &self.g_bar {
            model = model.with_g_bar(channel, g)?;
        }
        if let Some(vm0) = self.vm0 {
            model = model.with_resting_potential(vm0);
        }
        if let Some(cm0) = self.cm0 {
            model = model.with_capacitance(cm0);
        }
        let model = model.with_conductance_policy(self.conductance_policy);

        tracing::info!(
            model = %self.model,
            overrides = self.g_bar.len(),
            policy = ?self.conductance_policy,
            "built neuron model from config"
        );
        Ok(model)
    }
}

impl NeuronModel {
    pub fn from_config(config: &NeuronConfig) -> Result<Self> {
        config.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StateMap;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_minimal() {
        let config = NeuronConfig::from_json_str(r#"{ "model": "soma" }"#).unwrap();
        assert_eq!(config, NeuronConfig::new("soma"));
    }

    #[test]
    fn test_build_with_overrides() {
        let json = r#"{
            "model": "soma",
            "g_bar": { "NaTs2t": 8000.0, "pas": 0.25 },
            "vm0": -70.0,
            "conductance_policy": "corrected"
        }"#;
        let model = NeuronModel::from_config(&NeuronConfig::from_json_str(json).unwrap()).unwrap();
        assert_eq!(model.vm0(), -70.0);
        assert_eq!(model.conductance_policy(), ConductancePolicy::Corrected);
        assert_eq!(model.leak().g, 0.25);

        let mut state = StateMap::new();
        state.insert("m_NaTs2t".to_string(), 1.0);
        state.insert("h_NaTs2t".to_string(), 1.0);
        assert_abs_diff_eq!(
            model.conductance("g_NaTs2t", -70.0, &state, None).unwrap(),
            8000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            NeuronConfig::from_json_str(r#"{ "model": "soma", "g_bar": { "Ih": -1.0 } }"#),
            Err(SonicError::ConfigError(_))
        ));
        assert!(matches!(
            NeuronConfig::from_json_str(r#"{ "model": "soma", "cm0": 0.0 }"#),
            Err(SonicError::ConfigError(_))
        ));
        assert!(matches!(
            NeuronConfig::from_json_str(r#"{ "model": "soma", "celsius": 20 }"#),
            Err(SonicError::Json(_))
        ));
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(NeuronConfig::new("pyramid").build(), Err(SonicError::UnknownModel(_))));

        let mut config = NeuronConfig::new("soma");
        config.g_bar.insert("KTst".to_string(), 1.0);
        assert!(matches!(config.build(), Err(SonicError::UnknownCurrent(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = NeuronConfig::new("realneuron");
        config.conductance_policy = ConductancePolicy::Corrected;
        let json = config.to_json().unwrap();
        assert!(json.contains("\"corrected\""));
        assert_eq!(NeuronConfig::from_json_str(&json).unwrap(), config);
    }
}
