//! # Sonic Neurons: Hodgkin-Huxley Point-Neuron Models
//!
//! Single-compartment cortical neuron models assembled from published ion
//! channel kinetics (Hay et al. 2011 mechanisms, Shu 2007 delayed rectifier).
//!
//! Every model is normalised into three name-keyed mappings that a generic
//! integrator can step without knowing which channel it is evaluating:
//!
//! | Mapping | Key | Function |
//! |---------|-----|----------|
//! | derivatives | `m_NaTs2t` | `(V, state) -> d(state)/dt` |
//! | steady states | `m_NaTs2t` | `V -> state_inf` |
//! | currents / conductances | `i_NaTs2t` / `g_NaTs2t` | `(V, state, g_bar) -> value` |
//!
//! ## Example
//!
//! ```no_run
//! use sonic_neurons::models;
//!
//! let model = models::by_name("soma")?;
//! let state = model.resting_state();
//! let derivatives = model.derivatives(model.vm0(), &state)?;
//! let i_net = model.net_current(-60.0, &state)?;
//! # Ok::<(), sonic_core::SonicError>(())
//! ```

pub mod batch;
pub mod channels;
pub mod config;
pub mod kinetics;
pub mod model;
pub mod models;
pub mod point;
pub mod provider;
pub mod registry;

pub use batch::Compartment;
pub use channels::{ChannelKind, ChannelModel, Gate, GateValues, Ion, Leak};
pub use config::NeuronConfig;
pub use kinetics::{ChannelRates, Rates};
pub use model::NeuronModel;
pub use point::{PointNeuron, Stimulus};
pub use provider::{ClosedForm, CurrentProvider};
pub use registry::{ConductancePolicy, CurrentRegistry, StateMap, StateRegistry};
