//! Voltage-dependent gating kinetics, one function per channel type.
//!
//! Every function maps a membrane potential (mV) to the forward/backward
//! rate constants (1/ms) of each gate of the channel. Channels published as
//! steady-state / time-constant pairs are converted with
//! `alpha = inf / tau`, `beta = (1 - inf) / tau`.
//!
//! Several formulas have a `0/0` removable singularity at one voltage. The
//! input is shifted by exactly [`SINGULARITY_NUDGE`] when it *equals* that
//! voltage; a voltage near, but not on, the pole is evaluated as is. Guards
//! are applied in sequence, so a shifted voltage carries into the later
//! gates of the same channel.

use serde::{Deserialize, Serialize};
use sonic_core::Voltage;

/// Offset applied to a voltage that lands exactly on a singular point (mV)
pub const SINGULARITY_NUDGE: Voltage = 1e-4;

/// Simulation temperature (celsius)
pub const CELSIUS: f64 = 37.0;

/// Q10 coefficient shared by the Hay et al. channel family
const Q10: f64 = 2.3;

/// Forward/backward rate constants of a two-state gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    /// Opening rate (1/ms)
    pub alpha: f64,
    /// Closing rate (1/ms)
    pub beta: f64,
}

impl Rates {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Rates from a steady-state value and a time constant (ms)
    pub fn from_inf_tau(inf: f64, tau: f64) -> Self {
        Self {
            alpha: inf / tau,
            beta: (1.0 - inf) / tau,
        }
    }

    /// Equilibrium open fraction: alpha / (alpha + beta)
    pub fn steady_state(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Relaxation time constant (ms)
    pub fn time_constant(&self) -> f64 {
        1.0 / (self.alpha + self.beta)
    }

    /// Two-state Markov gating: alpha * (1 - x) - beta * x
    pub fn derivative(&self, x: f64) -> f64 {
        self.alpha * (1.0 - x) - self.beta * x
    }
}

/// Rates of every gate of one channel at one voltage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelRates {
    /// Activation gate
    pub m: Rates,
    /// Inactivation gate, if the channel has one
    pub h: Option<Rates>,
}

impl ChannelRates {
    fn activating(m: Rates) -> Self {
        Self { m, h: None }
    }

    fn inactivating(m: Rates, h: Rates) -> Self {
        Self { m, h: Some(h) }
    }
}

/// Shift `v` off the singular point `v0`, exact comparison only.
#[inline]
pub fn nudge(v: Voltage, v0: Voltage) -> Voltage {
    if v == v0 {
        v + SINGULARITY_NUDGE
    } else {
        v
    }
}

/// Temperature factor `q10^((celsius - t_ref) / 10)`
#[inline]
pub fn q10_factor(q10: f64, celsius: f64, t_ref: f64) -> f64 {
    q10.powf((celsius - t_ref) / 10.0)
}

// =============================================================================
// CALCIUM
// =============================================================================

/// High-voltage-activated Ca (Reuveni et al. 1993); shared by `Ca` and `CaHVA`
pub fn ca_hva(v: Voltage) -> ChannelRates {
    let v = nudge(v, -27.0);
    let m = Rates::new(
        (0.055 * (-27.0 - v)) / (((-27.0 - v) / 3.8).exp() - 1.0),
        0.94 * ((-75.0 - v) / 17.0).exp(),
    );
    let h = Rates::new(
        0.000457 * ((-13.0 - v) / 50.0).exp(),
        0.0065 / (((-v - 15.0) / 28.0).exp() + 1.0),
    );
    ChannelRates::inactivating(m, h)
}

/// Low-voltage-activated Ca (Avery & Johnston 1996), kinetics shifted by +10 mV
pub fn ca_lva_st(v: Voltage) -> ChannelRates {
    let qt = q10_factor(Q10, CELSIUS, 21.0);
    let v = v + 10.0;

    let m_inf = 1.0 / (1.0 + ((v + 30.0) / -6.0).exp());
    let m_tau = (5.0 + 20.0 / (1.0 + ((v + 25.0) / 5.0).exp())) / qt;
    let h_inf = 1.0 / (1.0 + ((v + 80.0) / 6.4).exp());
    let h_tau = (20.0 + 50.0 / (1.0 + ((v + 40.0) / 7.0).exp())) / qt;

    ChannelRates::inactivating(
        Rates::from_inf_tau(m_inf, m_tau),
        Rates::from_inf_tau(h_inf, h_tau),
    )
}

// =============================================================================
// MIXED CATION / M-CURRENT
// =============================================================================

/// Hyperpolarization-activated cation current (Kole et al. 2006)
pub fn ih(v: Voltage) -> ChannelRates {
    let v = nudge(v, -154.9);
    ChannelRates::activating(Rates::new(
        0.001 * 6.43 * (v + 154.9) / (((v + 154.9) / 11.9).exp() - 1.0),
        0.001 * 193.0 * (v / 33.1).exp(),
    ))
}

/// Muscarinic K current (Adams et al. 1982). The Q10 factor scales the
/// published time constant only, not these rates.
pub fn im(v: Voltage) -> ChannelRates {
    ChannelRates::activating(Rates::new(
        3.3e-3 * (2.5 * 0.04 * (v + 35.0)).exp(),
        3.3e-3 * (-2.5 * 0.04 * (v + 35.0)).exp(),
    ))
}

// =============================================================================
// POTASSIUM
// =============================================================================

/// Delayed rectifier with slow inactivation (Shu et al. 2007), fixed time constants
pub fn kd_shu2007(v: Voltage) -> ChannelRates {
    const VHALF_M: f64 = -43.0;
    const K_M: f64 = 8.0;
    const VHALF_H: f64 = -67.0;
    const K_H: f64 = 7.3;
    const TAU_M: f64 = 0.6;
    const TAU_H: f64 = 1500.0;

    let m_inf = 1.0 - 1.0 / (1.0 + ((v - VHALF_M) / K_M).exp());
    let h_inf = 1.0 / (1.0 + ((v - VHALF_H) / K_H).exp());

    ChannelRates::inactivating(
        Rates::from_inf_tau(m_inf, TAU_M),
        Rates::from_inf_tau(h_inf, TAU_H),
    )
}

/// Persistent K (Korngreen & Sakmann 2000), kinetics shifted by +10 mV
pub fn k_p_st(v: Voltage) -> ChannelRates {
    let qt = q10_factor(Q10, CELSIUS, 21.0);
    let v = v + 10.0;

    let m_inf = 1.0 / (1.0 + (-(v + 1.0) / 12.0).exp());
    let m_tau = if v < -50.0 {
        (1.25 + 175.03 * (-v * -0.026).exp()) / qt
    } else {
        (1.25 + 13.0 * (-v * 0.026).exp()) / qt
    };
    let h_inf = 1.0 / (1.0 + (-(v + 54.0) / -11.0).exp());
    let h_tau = (360.0 + (1010.0 + 24.0 * (v + 55.0)) * (-((v + 75.0) / 48.0).powi(2)).exp()) / qt;

    ChannelRates::inactivating(
        Rates::from_inf_tau(m_inf, m_tau),
        Rates::from_inf_tau(h_inf, h_tau),
    )
}

/// Transient K (Korngreen & Sakmann 2000), kinetics shifted by +10 mV
pub fn k_t_st(v: Voltage) -> ChannelRates {
    let qt = q10_factor(Q10, CELSIUS, 21.0);
    let v = v + 10.0;

    let m_inf = 1.0 / (1.0 + (-v / 19.0).exp());
    let m_tau = (0.34 + 0.92 * (-((v + 71.0) / 59.0).powi(2)).exp()) / qt;
    let h_inf = 1.0 / (1.0 + (-(v + 66.0) / -10.0).exp());
    let h_tau = (8.0 + 49.0 * (-((v + 73.0) / 23.0).powi(2)).exp()) / qt;

    ChannelRates::inactivating(
        Rates::from_inf_tau(m_inf, m_tau),
        Rates::from_inf_tau(h_inf, h_tau),
    )
}

/// Kv3.1 (Rettig et al. 1992)
pub fn s_kv3_1(v: Voltage) -> ChannelRates {
    let m_inf = 1.0 / (1.0 + ((v - 18.7) / -9.7).exp());
    let m_tau = 0.2 * 20.0 / (1.0 + ((v + 46.56) / -44.14).exp());
    ChannelRates::activating(Rates::from_inf_tau(m_inf, m_tau))
}

// =============================================================================
// SODIUM
// =============================================================================

/// Shared Na activation with half-activation `-vhalf`
fn na_activation(v: Voltage, vhalf: f64) -> Rates {
    Rates::new(
        (0.182 * (v + vhalf)) / (1.0 - (-(v + vhalf) / 6.0).exp()),
        (0.124 * (-v - vhalf)) / (1.0 - (-(-v - vhalf) / 6.0).exp()),
    )
}

/// Shared Na inactivation with half-inactivation `-vhalf`
fn na_inactivation(v: Voltage, vhalf: f64) -> Rates {
    Rates::new(
        (-0.015 * (v + vhalf)) / (1.0 - ((v + vhalf) / 6.0).exp()),
        (-0.015 * (-v - vhalf)) / (1.0 - ((-v - vhalf) / 6.0).exp()),
    )
}

/// Persistent Na (Magistretti & Alonso 1999)
pub fn nap_et2(v: Voltage) -> ChannelRates {
    let v = nudge(v, -38.0);
    let m = na_activation(v, 38.0);

    let v = nudge(v, -17.0);
    let v = nudge(v, -64.4);
    let h = Rates::new(
        -2.88e-6 * (v + 17.0) / (1.0 - ((v + 17.0) / 4.63).exp()),
        6.94e-6 * (v + 64.4) / (1.0 - (-(v + 64.4) / 2.63).exp()),
    );
    ChannelRates::inactivating(m, h)
}

/// Fast inactivating Na, axonal (Colbert & Pan 2002)
pub fn na_ta_t(v: Voltage) -> ChannelRates {
    let v = nudge(v, -38.0);
    let m = na_activation(v, 38.0);
    let v = nudge(v, -66.0);
    ChannelRates::inactivating(m, na_inactivation(v, 66.0))
}

/// Fast inactivating Na, somatic (Colbert & Pan 2002, shifted)
pub fn na_ts2_t(v: Voltage) -> ChannelRates {
    let v = nudge(v, -32.0);
    let m = na_activation(v, 32.0);
    let v = nudge(v, -60.0);
    ChannelRates::inactivating(m, na_inactivation(v, 60.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn voltages() -> impl Iterator<Item = Voltage> {
        (-600..=200).map(|i| i as f64 / 4.0)
    }

    #[test]
    fn test_nudge_exact_only() {
        assert_eq!(nudge(-27.0, -27.0), -27.0 + SINGULARITY_NUDGE);
        assert_eq!(nudge(-27.000001, -27.0), -27.000001);
        assert_eq!(nudge(-64.4, -64.4), -64.4 + 1e-4);
    }

    #[test]
    fn test_q10_factor() {
        assert_relative_eq!(q10_factor(2.3, 37.0, 21.0), 2.3f64.powf(1.6), epsilon = 1e-12);
        assert_eq!(q10_factor(2.3, 21.0, 21.0), 1.0);
    }

    #[test]
    fn test_inf_tau_roundtrip() {
        let r = Rates::from_inf_tau(0.3, 2.0);
        assert_relative_eq!(r.steady_state(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(r.time_constant(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ca_alpha_at_pole() {
        // limit of 0.055 x / (exp(x / 3.8) - 1) as x -> 0 is 0.055 * 3.8
        let alpha = ca_hva(-27.0).m.alpha;
        assert!(alpha.is_finite());
        assert_relative_eq!(alpha, 0.055 * 3.8, max_relative = 1e-3);
    }

    #[test]
    fn test_ih_alpha_at_pole() {
        let alpha = ih(-154.9).m.alpha;
        assert!(alpha.is_finite());
        assert_relative_eq!(alpha, 0.001 * 6.43 * 11.9, max_relative = 1e-3);
    }

    #[test]
    fn test_nap_nudge_carries_into_inactivation() {
        let at = nap_et2(-38.0).h.unwrap();
        let shifted = nap_et2(-38.0 + SINGULARITY_NUDGE).h.unwrap();
        assert_eq!(at, shifted);
    }

    #[test]
    fn test_qt_scales_inf_tau_channels() {
        // rates scale by qt while the steady state does not depend on it
        let r = k_t_st(-40.0).m;
        let v = -30.0;
        let m_inf = 1.0 / (1.0 + (-v / 19.0f64).exp());
        let m_tau = 0.34 + 0.92 * (-((v + 71.0) / 59.0f64).powi(2)).exp();
        let qt = q10_factor(2.3, 37.0, 21.0);
        assert_relative_eq!(r.steady_state(), m_inf, epsilon = 1e-12);
        assert_relative_eq!(r.time_constant(), m_tau / qt, epsilon = 1e-12);
    }

    #[test]
    fn test_kd_fixed_time_constants() {
        for v in voltages() {
            let rates = kd_shu2007(v);
            assert_relative_eq!(rates.m.time_constant(), 0.6, epsilon = 1e-9);
            assert_relative_eq!(rates.h.unwrap().time_constant(), 1500.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_kp_tau_branch() {
        // shifted voltage crosses -50 at v = -60; both branches nearly meet there
        let below = k_p_st(-60.25).m.time_constant();
        let above = k_p_st(-59.75).m.time_constant();
        assert!(below.is_finite() && above.is_finite());
        assert_relative_eq!(below, above, max_relative = 1e-3);
    }

    #[test]
    fn test_rates_positive_and_finite() {
        let channels: [fn(Voltage) -> ChannelRates; 11] = [
            ca_hva, ca_lva_st, ih, im, kd_shu2007, k_p_st, k_t_st, s_kv3_1, nap_et2, na_ta_t,
            na_ts2_t,
        ];
        for f in channels {
            for v in voltages() {
                let rates = f(v);
                for r in std::iter::once(rates.m).chain(rates.h) {
                    assert!(r.alpha.is_finite() && r.beta.is_finite(), "v = {}", v);
                    assert!(r.alpha >= 0.0 && r.beta >= 0.0, "v = {}", v);
                    assert!(r.alpha + r.beta > 0.0, "v = {}", v);
                }
            }
        }
    }
}
