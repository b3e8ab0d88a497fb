//! Single-compartment current-clamp simulation.
//!
//! State vector layout is `[Vm, gates...]` with gates in declaration order.
//! The membrane equation is `Cm * dVm/dt = -sum(I) + I_stim`; with currents
//! in mA/m^2 and Cm in F/m^2 the right-hand side comes out in V/s, which is
//! scaled by 1e-3 to mV/ms.

use crate::model::NeuronModel;
use crate::registry::StateMap;
use serde::{Deserialize, Serialize};
use sonic_core::{
    integrate_rk4, Current, OdeSystem, Result, SimulationParams, SonicError, StateVector, Time,
    TimeSeries,
};

/// Rectangular current-clamp pulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    /// Injected current density (mA/m^2)
    pub amplitude: Current,
    /// Pulse start (ms)
    pub onset: Time,
    /// Pulse length (ms)
    pub duration: Time,
}

impl Stimulus {
    pub fn new(amplitude: Current, onset: Time, duration: Time) -> Self {
        Self {
            amplitude,
            onset,
            duration,
        }
    }

    /// Constant injection from t = 0 on
    pub fn constant(amplitude: Current) -> Self {
        Self::new(amplitude, 0.0, f64::INFINITY)
    }

    pub fn none() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn current_at(&self, t: Time) -> Current {
        if t >= self.onset && t < self.onset + self.duration {
            self.amplitude
        } else {
            0.0
        }
    }
}

impl Default for Stimulus {
    fn default() -> Self {
        Self::none()
    }
}

/// Neuron model driven by a current clamp, exposed as an ODE system
#[derive(Debug, Clone)]
pub struct PointNeuron {
    model: NeuronModel,
    stimulus: Stimulus,
}

impl PointNeuron {
    pub fn new(model: NeuronModel) -> Self {
        Self {
            model,
            stimulus: Stimulus::none(),
        }
    }

    pub fn with_stimulus(mut self, stimulus: Stimulus) -> Self {
        self.stimulus = stimulus;
        self
    }

    pub fn model(&self) -> &NeuronModel {
        &self.model
    }

    pub fn stimulus(&self) -> Stimulus {
        self.stimulus
    }

    /// Resting potential followed by the gate steady states there
    pub fn initial_state(&self) -> StateVector {
        let gates = self.model.resting_state();
        std::iter::once(self.model.vm0())
            .chain(self.model.gate_names().iter().map(|name| gates[name]))
            .collect()
    }

    /// Gate entries of a state vector, keyed by gate name
    pub fn gate_map(&self, y: &StateVector) -> StateMap {
        self.model
            .gate_names()
            .iter()
            .cloned()
            .zip(y.iter().skip(1).copied())
            .collect()
    }

    /// Integrate from the resting state
    pub fn simulate<F: FnMut(usize)>(
        &self,
        params: &SimulationParams,
        on_step: F,
    ) -> Result<Vec<TimeSeries>> {
        tracing::info!(
            model = self.model.name(),
            t_end = params.t_end,
            dt = params.dt,
            amplitude = self.stimulus.amplitude,
            "simulating point neuron"
        );
        let mut series = integrate_rk4(self, &self.initial_state(), params, on_step)?;
        if let Some(vm) = series.first_mut() {
            vm.units = Some("mV".to_string());
        }
        Ok(series)
    }
}

impl OdeSystem for PointNeuron {
    fn dimension(&self) -> usize {
        1 + self.model.gate_names().len()
    }

    fn derivatives(&self, t: Time, y: &StateVector) -> Result<StateVector> {
        if y.len() != self.dimension() {
            return Err(SonicError::SimulationError(format!(
                "state has {} entries, model {} expects {}",
                y.len(),
                self.model.name(),
                self.dimension()
            )));
        }
        let vm = y[0];
        let state = self.gate_map(y);

        let i_net = self.model.net_current(vm, &state)?;
        let dvm = (-i_net + self.stimulus.current_at(t)) / self.model.cm0() * 1e-3;
        let gates = self.model.derivatives(vm, &state)?;

        let mut dy = StateVector::zeros(y.len());
        dy[0] = dvm;
        for (i, name) in self.model.gate_names().iter().enumerate() {
            dy[i + 1] = gates[name];
        }
        Ok(dy)
    }

    fn variable_names(&self) -> Vec<String> {
        std::iter::once("Vm".to_string())
            .chain(self.model.gate_names().iter().cloned())
            .collect()
    }
}
