//! Pluggable current evaluation.
//!
//! Channel currents are computed in closed form by default. A model can
//! instead route them through an external kinetics engine (for instance a
//! compiled mechanism library) by installing another [`CurrentProvider`].
//! Gating kinetics and conductances always stay in closed form.

use crate::channels::{ChannelModel, GateValues};
use sonic_core::{Conductance, Current, Result, Voltage};

/// Source of ionic current densities for the channels of a model
pub trait CurrentProvider: Send + Sync {
    /// Provider name, for logs and diagnostics
    fn name(&self) -> &str;

    /// Current density (mA/m^2) through `channel` at voltage `v`
    fn current(
        &self,
        channel: &ChannelModel,
        v: Voltage,
        gates: GateValues,
        g_bar: Conductance,
    ) -> Result<Current>;
}

/// `g_bar * m^p * h * (V - E_rev)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedForm;

impl CurrentProvider for ClosedForm {
    fn name(&self) -> &str {
        "closed-form"
    }

    fn current(
        &self,
        channel: &ChannelModel,
        v: Voltage,
        gates: GateValues,
        g_bar: Conductance,
    ) -> Result<Current> {
        Ok(channel.current(v, gates, Some(g_bar)))
    }
}
