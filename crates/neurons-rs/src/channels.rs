//! Declarative channel table: which gates a channel has, how they combine
//! into a conductance, and which ion carries the current.

use crate::kinetics::{self, ChannelRates, Rates};
use serde::{Deserialize, Serialize};
use sonic_core::{Conductance, Current, Voltage};
use std::fmt;

/// Na reversal potential (mV)
pub const E_NA: Voltage = 50.0;
/// K reversal potential (mV)
pub const E_K: Voltage = -85.0;
/// Ca reversal potential (mV)
pub const E_CA: Voltage = 132.4579341637009;
/// HCN reversal potential (mV)
pub const E_HCN: Voltage = -45.0;
/// K reversal potential used by the Shu 2007 delayed rectifier (mV)
pub const E_K_SHU2007: Voltage = -100.0;

/// Gate role within a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    /// Activation gate `m`
    Activation,
    /// Inactivation gate `h`
    Inactivation,
}

impl Gate {
    pub fn symbol(&self) -> &'static str {
        match self {
            Gate::Activation => "m",
            Gate::Inactivation => "h",
        }
    }
}

/// Ion species carried by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ion {
    Sodium,
    Potassium,
    Calcium,
    /// Mixed Na/K cation current through HCN channels
    Cation,
}

/// Ion channel types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    #[serde(rename = "Ca")]
    Ca,
    #[serde(rename = "CaHVA")]
    CaHva,
    #[serde(rename = "CaLVAst")]
    CaLvaSt,
    #[serde(rename = "Ih")]
    Ih,
    #[serde(rename = "Im")]
    Im,
    #[serde(rename = "KdShu2007")]
    KdShu2007,
    #[serde(rename = "KPst")]
    KPst,
    #[serde(rename = "KTst")]
    KTst,
    #[serde(rename = "NapEt2")]
    NapEt2,
    #[serde(rename = "NaTat")]
    NaTat,
    #[serde(rename = "NaTs2t")]
    NaTs2t,
    #[serde(rename = "SKv31")]
    SKv31,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 12] = [
        ChannelKind::Ca,
        ChannelKind::CaHva,
        ChannelKind::CaLvaSt,
        ChannelKind::Ih,
        ChannelKind::Im,
        ChannelKind::KdShu2007,
        ChannelKind::KPst,
        ChannelKind::KTst,
        ChannelKind::NapEt2,
        ChannelKind::NaTat,
        ChannelKind::NaTs2t,
        ChannelKind::SKv31,
    ];

    /// Mechanism name, as used in gate and current keys
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Ca => "Ca",
            ChannelKind::CaHva => "CaHVA",
            ChannelKind::CaLvaSt => "CaLVAst",
            ChannelKind::Ih => "Ih",
            ChannelKind::Im => "Im",
            ChannelKind::KdShu2007 => "KdShu2007",
            ChannelKind::KPst => "KPst",
            ChannelKind::KTst => "KTst",
            ChannelKind::NapEt2 => "NapEt2",
            ChannelKind::NaTat => "NaTat",
            ChannelKind::NaTs2t => "NaTs2t",
            ChannelKind::SKv31 => "SKv31",
        }
    }

    /// Look a channel up by mechanism name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn ion(&self) -> Ion {
        match self {
            ChannelKind::Ca | ChannelKind::CaHva | ChannelKind::CaLvaSt => Ion::Calcium,
            ChannelKind::Ih => Ion::Cation,
            ChannelKind::Im
            | ChannelKind::KdShu2007
            | ChannelKind::KPst
            | ChannelKind::KTst
            | ChannelKind::SKv31 => Ion::Potassium,
            ChannelKind::NapEt2 | ChannelKind::NaTat | ChannelKind::NaTs2t => Ion::Sodium,
        }
    }

    /// Declared gates, activation first
    pub fn gates(&self) -> &'static [Gate] {
        match self {
            ChannelKind::Ih | ChannelKind::Im | ChannelKind::SKv31 => &[Gate::Activation],
            _ => &[Gate::Activation, Gate::Inactivation],
        }
    }

    pub fn has_inactivation(&self) -> bool {
        self.gates().contains(&Gate::Inactivation)
    }

    /// Power applied to the activation gate in the conductance
    pub fn activation_exponent(&self) -> i32 {
        match self {
            ChannelKind::NapEt2 | ChannelKind::NaTat | ChannelKind::NaTs2t => 3,
            ChannelKind::KTst => 4,
            ChannelKind::Ca | ChannelKind::CaHva | ChannelKind::CaLvaSt | ChannelKind::KPst => 2,
            ChannelKind::Ih | ChannelKind::Im | ChannelKind::KdShu2007 | ChannelKind::SKv31 => 1,
        }
    }

    /// Reversal potential (mV)
    pub fn reversal_potential(&self) -> Voltage {
        match self {
            ChannelKind::KdShu2007 => E_K_SHU2007,
            _ => match self.ion() {
                Ion::Sodium => E_NA,
                Ion::Potassium => E_K,
                Ion::Calcium => E_CA,
                Ion::Cation => E_HCN,
            },
        }
    }

    /// Gating rates at voltage `v`
    pub fn rates(&self, v: Voltage) -> ChannelRates {
        match self {
            ChannelKind::Ca | ChannelKind::CaHva => kinetics::ca_hva(v),
            ChannelKind::CaLvaSt => kinetics::ca_lva_st(v),
            ChannelKind::Ih => kinetics::ih(v),
            ChannelKind::Im => kinetics::im(v),
            ChannelKind::KdShu2007 => kinetics::kd_shu2007(v),
            ChannelKind::KPst => kinetics::k_p_st(v),
            ChannelKind::KTst => kinetics::k_t_st(v),
            ChannelKind::NapEt2 => kinetics::nap_et2(v),
            ChannelKind::NaTat => kinetics::na_ta_t(v),
            ChannelKind::NaTs2t => kinetics::na_ts2_t(v),
            ChannelKind::SKv31 => kinetics::s_kv3_1(v),
        }
    }

    /// Rates of a single gate, `None` for an undeclared gate
    pub fn gate_rates(&self, gate: Gate, v: Voltage) -> Option<Rates> {
        let rates = self.rates(v);
        match gate {
            Gate::Activation => Some(rates.m),
            Gate::Inactivation => rates.h,
        }
    }

    /// State key of a gate, e.g. `m_NaTs2t`
    pub fn gate_key(&self, gate: Gate) -> String {
        format!("{}_{}", gate.symbol(), self.name())
    }

    /// Current key, e.g. `i_NaTs2t`
    pub fn current_key(&self) -> String {
        format!("i_{}", self.name())
    }

    /// Conductance key, e.g. `g_NaTs2t`
    pub fn conductance_key(&self) -> String {
        format!("g_{}", self.name())
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Gate values read from a state vector for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateValues {
    pub m: f64,
    pub h: Option<f64>,
}

/// One channel as inserted in a neuron model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelModel {
    /// Channel type
    pub kind: ChannelKind,
    /// Default maximal conductance (S/m^2)
    pub g_bar: Conductance,
    /// Conductance entry is a known defect that yields no value
    #[serde(default)]
    pub defective_conductance: bool,
}

impl ChannelModel {
    pub fn new(kind: ChannelKind, g_bar: Conductance) -> Self {
        Self {
            kind,
            g_bar,
            defective_conductance: false,
        }
    }

    /// Mark the conductance entry as a known defect
    pub fn with_defective_conductance(mut self) -> Self {
        self.defective_conductance = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// `g_bar * m^p * h`, with `h = 1` for single-gate channels
    pub fn conductance(&self, gates: GateValues, g_bar: Option<Conductance>) -> Conductance {
        let g_bar = g_bar.unwrap_or(self.g_bar);
        g_bar * gates.m.powi(self.kind.activation_exponent()) * gates.h.unwrap_or(1.0)
    }

    /// `g * (V - E_rev)`
    pub fn current(&self, v: Voltage, gates: GateValues, g_bar: Option<Conductance>) -> Current {
        self.conductance(gates, g_bar) * (v - self.kind.reversal_potential())
    }
}

/// Passive leak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leak {
    /// Leak conductance (S/m^2)
    pub g: Conductance,
    /// Leak reversal potential (mV)
    pub e: Voltage,
}

impl Leak {
    pub const CURRENT_KEY: &'static str = "i_pas";
    pub const CONDUCTANCE_KEY: &'static str = "g_pas";

    pub fn conductance(&self, g: Option<Conductance>) -> Conductance {
        g.unwrap_or(self.g)
    }

    pub fn current(&self, v: Voltage, g: Option<Conductance>) -> Current {
        self.conductance(g) * (v - self.e)
    }
}

impl Default for Leak {
    /// 3e-5 S/cm^2 reversing at -75 mV
    fn default() -> Self {
        Self {
            g: 3e-5 * 1e4,
            e: -75.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponents() {
        assert_eq!(ChannelKind::NaTs2t.activation_exponent(), 3);
        assert_eq!(ChannelKind::NapEt2.activation_exponent(), 3);
        assert_eq!(ChannelKind::KTst.activation_exponent(), 4);
        assert_eq!(ChannelKind::CaHva.activation_exponent(), 2);
        assert_eq!(ChannelKind::KPst.activation_exponent(), 2);
        assert_eq!(ChannelKind::Ih.activation_exponent(), 1);
        assert_eq!(ChannelKind::SKv31.activation_exponent(), 1);
        assert_eq!(ChannelKind::Im.activation_exponent(), 1);
    }

    #[test]
    fn test_gate_declarations_match_kinetics() {
        for kind in ChannelKind::ALL {
            let rates = kind.rates(-70.0);
            assert_eq!(kind.has_inactivation(), rates.h.is_some(), "{}", kind);
        }
    }

    #[test]
    fn test_names_roundtrip() {
        for kind in ChannelKind::ALL {
            assert_eq!(ChannelKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ChannelKind::from_name("Kv1"), None);
        assert_eq!(ChannelKind::SKv31.gate_key(Gate::Activation), "m_SKv31");
        assert_eq!(ChannelKind::CaLvaSt.current_key(), "i_CaLVAst");
    }

    #[test]
    fn test_reversal_potentials() {
        assert_eq!(ChannelKind::NaTat.reversal_potential(), E_NA);
        assert_eq!(ChannelKind::KTst.reversal_potential(), E_K);
        assert_eq!(ChannelKind::KdShu2007.reversal_potential(), -100.0);
        assert_eq!(ChannelKind::Ih.reversal_potential(), -45.0);
        assert_eq!(ChannelKind::Ca.reversal_potential(), E_CA);

        for kind in ChannelKind::ALL {
            let expected = match (kind, kind.ion()) {
                (ChannelKind::KdShu2007, _) => E_K_SHU2007,
                (_, Ion::Sodium) => E_NA,
                (_, Ion::Potassium) => E_K,
                (_, Ion::Calcium) => E_CA,
                (_, Ion::Cation) => E_HCN,
            };
            assert_eq!(kind.reversal_potential(), expected, "{}", kind);
        }
    }

    #[test]
    fn test_leak_at_reversal_is_zero() {
        let leak = Leak::default();
        assert_eq!(leak.current(-75.0, None), 0.0);
        assert!((leak.current(-65.0, None) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_uses_mechanism_names() {
        let json = serde_json::to_string(&ChannelKind::NaTs2t).unwrap();
        assert_eq!(json, "\"NaTs2t\"");
        let kind: ChannelKind = serde_json::from_str("\"CaHVA\"").unwrap();
        assert_eq!(kind, ChannelKind::CaHva);
    }
}
