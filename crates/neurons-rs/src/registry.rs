//! Name-keyed function registries consumed by integrators.
//!
//! A model exposes three uniform mappings so that a solver never needs to
//! know which channel it is stepping:
//!
//! - derivatives: gate key -> `(V, state) -> d(state)/dt`
//! - steady states: gate key -> `V -> state_inf`
//! - currents / conductances: current key -> `(V, state, g_bar) -> value`
//!
//! Each derivative reads only its own gate from the state map, so all gates
//! at one voltage can be evaluated independently.

use crate::channels::{ChannelModel, Gate, GateValues, Leak};
use crate::provider::CurrentProvider;
use serde::{Deserialize, Serialize};
use sonic_core::{Conductance, Current, Result, SonicError, Voltage};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Gate values keyed by gate name (`m_NaTs2t`, ...)
pub type StateMap = BTreeMap<String, f64>;

pub type DerivativeFn = Arc<dyn Fn(Voltage, &StateMap) -> Result<f64> + Send + Sync>;
pub type SteadyStateFn = Arc<dyn Fn(Voltage) -> f64 + Send + Sync>;
pub type CurrentFn =
    Arc<dyn Fn(Voltage, &StateMap, Option<Conductance>) -> Result<Current> + Send + Sync>;

/// How to treat a conductance entry flagged as a known defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductancePolicy {
    /// Report the defect as `SonicError::DefectiveConductance`
    #[default]
    Strict,
    /// Compute the conductance from the same formula as its current
    Corrected,
}

/// Read one gate from the state map
pub fn read_state(state: &StateMap, key: &str) -> Result<f64> {
    state
        .get(key)
        .copied()
        .ok_or_else(|| SonicError::MissingState(key.to_string()))
}

fn read_gates(state: &StateMap, m_key: &str, h_key: Option<&str>) -> Result<GateValues> {
    let m = read_state(state, m_key)?;
    let h = h_key.map(|k| read_state(state, k)).transpose()?;
    Ok(GateValues { m, h })
}

// =============================================================================
// STATE FUNCTIONS
// =============================================================================

/// Derivative and steady-state functions for every declared gate
#[derive(Clone, Default)]
pub struct StateRegistry {
    order: Vec<String>,
    derivatives: HashMap<String, DerivativeFn>,
    steady_states: HashMap<String, SteadyStateFn>,
}

impl StateRegistry {
    pub fn build(channels: &[ChannelModel]) -> Self {
        let mut registry = Self::default();

        for channel in channels {
            let kind = channel.kind;
            for &gate in kind.gates() {
                let key = kind.gate_key(gate);

                let own_key = key.clone();
                let derivative: DerivativeFn = Arc::new(move |v: Voltage, state: &StateMap| -> Result<f64> {
                    let x = read_state(state, &own_key)?;
                    let rates = kind
                        .gate_rates(gate, v)
                        .ok_or_else(|| SonicError::UnknownGate(own_key.clone()))?;
                    Ok(rates.derivative(x))
                });
                let steady_state: SteadyStateFn = Arc::new(move |v: Voltage| {
                    kind.gate_rates(gate, v)
                        .map_or(f64::NAN, |rates| rates.steady_state())
                });

                registry.derivatives.insert(key.clone(), derivative);
                registry.steady_states.insert(key.clone(), steady_state);
                registry.order.push(key);
            }
        }

        registry
    }

    /// Gate names in declaration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.derivatives.contains_key(name)
    }

    pub fn derivative(&self, name: &str) -> Result<&DerivativeFn> {
        self.derivatives
            .get(name)
            .ok_or_else(|| SonicError::UnknownGate(name.to_string()))
    }

    pub fn steady_state(&self, name: &str) -> Result<&SteadyStateFn> {
        self.steady_states
            .get(name)
            .ok_or_else(|| SonicError::UnknownGate(name.to_string()))
    }

    /// d(state)/dt for every gate
    pub fn evaluate_derivatives(&self, v: Voltage, state: &StateMap) -> Result<StateMap> {
        self.order
            .iter()
            .map(|name| Ok((name.clone(), self.derivatives[name](v, state)?)))
            .collect()
    }

    /// Steady state of every gate
    pub fn evaluate_steady_states(&self, v: Voltage) -> StateMap {
        self.order
            .iter()
            .map(|name| (name.clone(), self.steady_states[name](v)))
            .collect()
    }
}

// =============================================================================
// CURRENTS AND CONDUCTANCES
// =============================================================================

/// Current and conductance functions for every channel plus the leak
#[derive(Clone, Default)]
pub struct CurrentRegistry {
    current_order: Vec<String>,
    conductance_order: Vec<String>,
    currents: HashMap<String, CurrentFn>,
    conductances: HashMap<String, CurrentFn>,
}

impl CurrentRegistry {
    pub fn build(
        channels: &[ChannelModel],
        leak: Leak,
        provider: Arc<dyn CurrentProvider>,
        policy: ConductancePolicy,
    ) -> Self {
        let mut registry = Self::default();

        for &channel in channels {
            let kind = channel.kind;
            let m_key = kind.gate_key(Gate::Activation);
            let h_key = kind
                .has_inactivation()
                .then(|| kind.gate_key(Gate::Inactivation));

            let (m, h) = (m_key.clone(), h_key.clone());
            let provider = Arc::clone(&provider);
            let current: CurrentFn = Arc::new(
                move |v: Voltage, state: &StateMap, g_bar: Option<Conductance>| -> Result<Current> {
                    let gates = read_gates(state, &m, h.as_deref())?;
                    provider.current(&channel, v, gates, g_bar.unwrap_or(channel.g_bar))
                },
            );

            let conductance: CurrentFn =
                if channel.defective_conductance && policy == ConductancePolicy::Strict {
                    Arc::new(move |_: Voltage, _: &StateMap, _: Option<Conductance>| -> Result<Current> {
                        Err(SonicError::DefectiveConductance {
                            channel: channel.name().to_string(),
                        })
                    })
                } else {
                    Arc::new(move |_: Voltage, state: &StateMap, g_bar: Option<Conductance>| -> Result<Current> {
                        let gates = read_gates(state, &m_key, h_key.as_deref())?;
                        Ok(channel.conductance(gates, g_bar))
                    })
                };

            registry.insert_current(kind.current_key(), current);
            registry.insert_conductance(kind.conductance_key(), conductance);
        }

        registry.insert_current(
            Leak::CURRENT_KEY.to_string(),
            Arc::new(move |v: Voltage, _: &StateMap, g: Option<Conductance>| -> Result<Current> {
                Ok(leak.current(v, g))
            }),
        );
        registry.insert_conductance(
            Leak::CONDUCTANCE_KEY.to_string(),
            Arc::new(move |_: Voltage, _: &StateMap, g: Option<Conductance>| -> Result<Current> {
                Ok(leak.conductance(g))
            }),
        );

        registry
    }

    fn insert_current(&mut self, key: String, f: CurrentFn) {
        self.currents.insert(key.clone(), f);
        self.current_order.push(key);
    }

    fn insert_conductance(&mut self, key: String, f: CurrentFn) {
        self.conductances.insert(key.clone(), f);
        self.conductance_order.push(key);
    }

    /// Current names, channels in declaration order then `i_pas`
    pub fn current_names(&self) -> &[String] {
        &self.current_order
    }

    /// Conductance names, channels in declaration order then `g_pas`
    pub fn conductance_names(&self) -> &[String] {
        &self.conductance_order
    }

    pub fn current(&self, name: &str) -> Result<&CurrentFn> {
        self.currents
            .get(name)
            .ok_or_else(|| SonicError::UnknownCurrent(name.to_string()))
    }

    pub fn conductance(&self, name: &str) -> Result<&CurrentFn> {
        self.conductances
            .get(name)
            .ok_or_else(|| SonicError::UnknownCurrent(name.to_string()))
    }

    /// Every current at default maximal conductances
    pub fn evaluate_currents(&self, v: Voltage, state: &StateMap) -> Result<BTreeMap<String, Current>> {
        self.current_order
            .iter()
            .map(|name| Ok((name.clone(), self.currents[name](v, state, None)?)))
            .collect()
    }
}
