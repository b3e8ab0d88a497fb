//! Shipped neuron models.
//!
//! All three share the same kinetics, reversal potentials, leak and
//! membrane constants. They differ only in which channels they carry and
//! in the default maximal conductances.

use crate::channels::{ChannelKind, ChannelModel, Leak};
use crate::model::NeuronModel;
use sonic_core::{Conductance, Result, SonicError};

/// Placeholder conductance of channels without a fitted value (S/m^2)
pub const G_UNFITTED: Conductance = 1e-5;

/// Default conductance of the Shu 2007 delayed rectifier (S/m^2)
pub const G_KD_SHU2007: Conductance = 0.1;

/// Registered model
#[derive(Debug, Clone, Copy)]
pub struct ModelEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn() -> NeuronModel,
}

const REGISTRY: [ModelEntry; 3] = [
    ModelEntry {
        name: "realneuron",
        description: "Cortical neuron with twelve channels, unfitted conductances",
        build: realneuron,
    },
    ModelEntry {
        name: "realneuron_opt",
        description: "Cortical neuron with twelve channels, fitted somatic conductances",
        build: realneuron_opt,
    },
    ModelEntry {
        name: "soma",
        description: "Somatic compartment with the five fitted channels",
        build: soma,
    },
];

/// Names of every registered model
pub const MODEL_NAMES: [&str; 3] = ["realneuron", "realneuron_opt", "soma"];

pub fn registry() -> &'static [ModelEntry] {
    &REGISTRY
}

/// Build a registered model by name
pub fn by_name(name: &str) -> Result<NeuronModel> {
    REGISTRY
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| (entry.build)())
        .ok_or_else(|| SonicError::UnknownModel(name.to_string()))
}

pub fn all() -> Vec<NeuronModel> {
    REGISTRY.iter().map(|entry| (entry.build)()).collect()
}

fn full_channel_set(g_bar: impl Fn(ChannelKind) -> Conductance) -> Vec<ChannelModel> {
    ChannelKind::ALL
        .iter()
        .map(|&kind| ChannelModel::new(kind, g_bar(kind)))
        .collect()
}

fn fitted_g_bar(kind: ChannelKind) -> Option<Conductance> {
    match kind {
        ChannelKind::SKv31 => Some(1025.17),
        ChannelKind::CaHva => Some(3.74),
        ChannelKind::NaTs2t => Some(9267.05),
        ChannelKind::Ih => Some(0.8),
        ChannelKind::CaLvaSt => Some(7.78),
        _ => None,
    }
}

fn unfitted_g_bar(kind: ChannelKind) -> Conductance {
    match kind {
        ChannelKind::KdShu2007 => G_KD_SHU2007,
        _ => G_UNFITTED,
    }
}

/// Twelve-channel cortical neuron. Its `g_KdShu2007` entry is a known
/// defect and only yields a value under `ConductancePolicy::Corrected`.
pub fn realneuron() -> NeuronModel {
    let channels = full_channel_set(unfitted_g_bar)
        .into_iter()
        .map(|c| {
            if c.kind == ChannelKind::KdShu2007 {
                c.with_defective_conductance()
            } else {
                c
            }
        })
        .collect();
    NeuronModel::new("realneuron", channels, Leak::default())
        .with_description(REGISTRY[0].description)
}

pub fn realneuron_opt() -> NeuronModel {
    let channels =
        full_channel_set(|kind| fitted_g_bar(kind).unwrap_or_else(|| unfitted_g_bar(kind)));
    NeuronModel::new("realneuron_opt", channels, Leak::default())
        .with_description(REGISTRY[1].description)
}

pub fn soma() -> NeuronModel {
    let channels = [
        ChannelKind::CaHva,
        ChannelKind::CaLvaSt,
        ChannelKind::Ih,
        ChannelKind::NaTs2t,
        ChannelKind::SKv31,
    ]
    .iter()
    .filter_map(|&kind| fitted_g_bar(kind).map(|g| ChannelModel::new(kind, g)))
    .collect();
    NeuronModel::new("soma", channels, Leak::default()).with_description(REGISTRY[2].description)
}
