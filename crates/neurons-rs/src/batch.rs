//! Parallel evaluation over many compartments sharing one model.

use crate::model::NeuronModel;
use crate::registry::StateMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sonic_core::{Current, Result, Voltage};
use std::collections::BTreeMap;

/// Membrane potential and gate values of one compartment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub v: Voltage,
    pub state: StateMap,
}

impl Compartment {
    pub fn new(v: Voltage, state: StateMap) -> Self {
        Self { v, state }
    }

    /// Compartment at `v` with every gate at its steady state there
    pub fn at_steady_state(model: &NeuronModel, v: Voltage) -> Self {
        Self::new(v, model.steady_states(v))
    }
}

pub fn derivatives_par(model: &NeuronModel, compartments: &[Compartment]) -> Result<Vec<StateMap>> {
    compartments
        .par_iter()
        .map(|c| model.derivatives(c.v, &c.state))
        .collect()
}

pub fn steady_states_par(model: &NeuronModel, voltages: &[Voltage]) -> Vec<StateMap> {
    voltages.par_iter().map(|&v| model.steady_states(v)).collect()
}

pub fn currents_par(
    model: &NeuronModel,
    compartments: &[Compartment],
) -> Result<Vec<BTreeMap<String, Current>>> {
    compartments
        .par_iter()
        .map(|c| model.currents(c.v, &c.state))
        .collect()
}

pub fn net_currents_par(model: &NeuronModel, compartments: &[Compartment]) -> Result<Vec<Current>> {
    compartments
        .par_iter()
        .map(|c| model.net_current(c.v, &c.state))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models;
    use sonic_core::SonicError;

    fn voltages() -> Vec<Voltage> {
        (0..64).map(|i| -120.0 + 2.5 * i as f64).collect()
    }

    #[test]
    fn test_matches_sequential() {
        let model = models::realneuron_opt();
        let compartments: Vec<Compartment> = voltages()
            .into_iter()
            .map(|v| Compartment::at_steady_state(&model, v))
            .collect();

        let par = currents_par(&model, &compartments).unwrap();
        for (c, currents) in compartments.iter().zip(&par) {
            assert_eq!(currents, &model.currents(c.v, &c.state).unwrap());
        }

        let net = net_currents_par(&model, &compartments).unwrap();
        assert_eq!(net.len(), compartments.len());

        for d in derivatives_par(&model, &compartments).unwrap() {
            assert!(d.values().all(|x| x.abs() < 1e-9));
        }
    }

    #[test]
    fn test_steady_states_in_order() {
        let model = models::soma();
        let vs = voltages();
        let par = steady_states_par(&model, &vs);
        for (v, s) in vs.iter().zip(&par) {
            assert_eq!(s, &model.steady_states(*v));
        }
    }

    #[test]
    fn test_error_propagates() {
        let model = models::soma();
        let mut compartments = vec![Compartment::at_steady_state(&model, -70.0); 8];
        compartments[5].state.remove("h_NaTs2t");
        assert!(matches!(
            derivatives_par(&model, &compartments),
            Err(SonicError::MissingState(key)) if key == "h_NaTs2t"
        ));
    }
}
