//! Point-neuron model: a set of channels, a leak, and the registries built
//! from them.

use crate::channels::{ChannelKind, ChannelModel, Leak};
use crate::kinetics::Rates;
use crate::provider::{ClosedForm, CurrentProvider};
use crate::registry::{ConductancePolicy, CurrentRegistry, StateMap, StateRegistry};
use sonic_core::{Capacitance, Conductance, Current, Result, SonicError, Voltage};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Membrane capacitance shared by every shipped model (F/m^2)
pub const CM0: Capacitance = 1e-2;

/// Resting potential shared by every shipped model (mV)
pub const VM0: Voltage = -75.0;

/// Single-compartment neuron model
#[derive(Clone)]
pub struct NeuronModel {
    name: String,
    description: String,
    cm0: Capacitance,
    vm0: Voltage,
    channels: Vec<ChannelModel>,
    leak: Leak,
    policy: ConductancePolicy,
    provider: Arc<dyn CurrentProvider>,
    states: StateRegistry,
    currents: CurrentRegistry,
}

impl NeuronModel {
    /// Create a model with closed-form currents and strict conductance policy
    pub fn new(name: &str, channels: Vec<ChannelModel>, leak: Leak) -> Self {
        let provider: Arc<dyn CurrentProvider> = Arc::new(ClosedForm);
        let states = StateRegistry::build(&channels);
        let currents =
            CurrentRegistry::build(&channels, leak, Arc::clone(&provider), ConductancePolicy::Strict);

        Self {
            name: name.to_string(),
            description: String::new(),
            cm0: CM0,
            vm0: VM0,
            channels,
            leak,
            policy: ConductancePolicy::Strict,
            provider,
            states,
            currents,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_resting_potential(mut self, vm0: Voltage) -> Self {
        self.vm0 = vm0;
        self
    }

    pub fn with_capacitance(mut self, cm0: Capacitance) -> Self {
        self.cm0 = cm0;
        self
    }

    /// Route channel currents through another provider
    pub fn with_provider(mut self, provider: Arc<dyn CurrentProvider>) -> Self {
        tracing::info!(model = %self.name, provider = provider.name(), "installing current provider");
        self.provider = provider;
        self.rebuild_currents();
        self
    }

    pub fn with_conductance_policy(mut self, policy: ConductancePolicy) -> Self {
        if policy == ConductancePolicy::Corrected && self.channels.iter().any(|c| c.defective_conductance) {
            tracing::warn!(model = %self.name, "computing conductances flagged as known defects");
        }
        self.policy = policy;
        self.rebuild_currents();
        self
    }

    /// Replace the default maximal conductance of one channel, or of the
    /// leak when `channel` is `pas`
    pub fn with_g_bar(mut self, channel: &str, g_bar: Conductance) -> Result<Self> {
        if channel == "pas" {
            self.leak.g = g_bar;
        } else {
            let kind = ChannelKind::from_name(channel)
                .ok_or_else(|| SonicError::UnknownCurrent(format!("i_{}", channel)))?;
            let entry = self
                .channels
                .iter_mut()
                .find(|c| c.kind == kind)
                .ok_or_else(|| SonicError::UnknownCurrent(kind.current_key()))?;
            entry.g_bar = g_bar;
        }
        self.rebuild_currents();
        Ok(self)
    }

    fn rebuild_currents(&mut self) {
        self.currents =
            CurrentRegistry::build(&self.channels, self.leak, Arc::clone(&self.provider), self.policy);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Membrane capacitance (F/m^2)
    pub fn cm0(&self) -> Capacitance {
        self.cm0
    }

    /// Resting potential (mV)
    pub fn vm0(&self) -> Voltage {
        self.vm0
    }

    pub fn channels(&self) -> &[ChannelModel] {
        &self.channels
    }

    pub fn leak(&self) -> Leak {
        self.leak
    }

    pub fn conductance_policy(&self) -> ConductancePolicy {
        self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn state_registry(&self) -> &StateRegistry {
        &self.states
    }

    pub fn current_registry(&self) -> &CurrentRegistry {
        &self.currents
    }

    /// Gate names in declaration order
    pub fn gate_names(&self) -> &[String] {
        self.states.names()
    }

    pub fn current_names(&self) -> &[String] {
        self.currents.current_names()
    }

    pub fn conductance_names(&self) -> &[String] {
        self.currents.conductance_names()
    }

    // -------------------------------------------------------------------------
    // Single-entry evaluation
    // -------------------------------------------------------------------------

    pub fn derivative(&self, gate: &str, v: Voltage, state: &StateMap) -> Result<f64> {
        self.states.derivative(gate)?(v, state)
    }

    pub fn steady_state(&self, gate: &str, v: Voltage) -> Result<f64> {
        Ok(self.states.steady_state(gate)?(v))
    }

    pub fn current(
        &self,
        name: &str,
        v: Voltage,
        state: &StateMap,
        g_bar: Option<Conductance>,
    ) -> Result<Current> {
        self.currents.current(name)?(v, state, g_bar)
    }

    pub fn conductance(
        &self,
        name: &str,
        v: Voltage,
        state: &StateMap,
        g_bar: Option<Conductance>,
    ) -> Result<Conductance> {
        self.currents.conductance(name)?(v, state, g_bar)
    }

    /// Forward/backward rates of one gate
    pub fn rates(&self, gate: &str, v: Voltage) -> Result<Rates> {
        let unknown = || SonicError::UnknownGate(gate.to_string());
        if !self.states.contains(gate) {
            return Err(unknown());
        }
        self.channels
            .iter()
            .flat_map(|c| c.kind.gates().iter().map(move |&g| (c.kind, g)))
            .find(|(kind, g)| kind.gate_key(*g) == gate)
            .and_then(|(kind, g)| kind.gate_rates(g, v))
            .ok_or_else(unknown)
    }

    /// Relaxation time constant of one gate (ms)
    pub fn time_constant(&self, gate: &str, v: Voltage) -> Result<f64> {
        Ok(self.rates(gate, v)?.time_constant())
    }

    // -------------------------------------------------------------------------
    // Whole-model evaluation
    // -------------------------------------------------------------------------

    pub fn derivatives(&self, v: Voltage, state: &StateMap) -> Result<StateMap> {
        self.states.evaluate_derivatives(v, state)
    }

    pub fn steady_states(&self, v: Voltage) -> StateMap {
        self.states.evaluate_steady_states(v)
    }

    /// Gates at their steady state for the resting potential
    pub fn resting_state(&self) -> StateMap {
        self.steady_states(self.vm0)
    }

    pub fn currents(&self, v: Voltage, state: &StateMap) -> Result<BTreeMap<String, Current>> {
        self.currents.evaluate_currents(v, state)
    }

    /// Sum of every ionic current including the leak (mA/m^2)
    pub fn net_current(&self, v: Voltage, state: &StateMap) -> Result<Current> {
        Ok(self.currents(v, state)?.values().sum())
    }
}

impl fmt::Debug for NeuronModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuronModel")
            .field("name", &self.name)
            .field("cm0", &self.cm0)
            .field("vm0", &self.vm0)
            .field("channels", &self.channels)
            .field("leak", &self.leak)
            .field("policy", &self.policy)
            .field("provider", &self.provider.name())
            .finish()
    }
}
