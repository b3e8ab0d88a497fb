//! # SonicNeurons Core
//!
//! Shared types and utilities for point-neuron models driven by electrical
//! and ultrasonic stimulation.
//!
//! ## Unit Conventions
//!
//! | Quantity | Unit |
//! |----------|------|
//! | Membrane potential | mV |
//! | Time | ms |
//! | Maximal conductance | S/m^2 |
//! | Current density | mA/m^2 |
//! | Membrane capacitance | F/m^2 |
//!
//! ## Design Philosophy
//!
//! 1. Preserve numerical equivalence with the published channel models
//! 2. Pure, stateless evaluation: the integrator owns all run state
//! 3. Fail fast on undeclared names, never substitute defaults

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum SonicError {
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    #[error("Unknown current: {0}")]
    UnknownCurrent(String),

    #[error("Missing state entry: {0}")]
    MissingState(String),

    #[error("Model not found: {0}")]
    UnknownModel(String),

    #[error("Conductance of channel {channel} is a known defect and yields no value")]
    DefectiveConductance { channel: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Simulation error: {0}")]
    SimulationError(String),

    #[error("Numerical error: {0}")]
    NumericalError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SonicError>;

/// Time point (ms)
pub type Time = f64;

/// Voltage (mV)
pub type Voltage = f64;

/// Current density (mA/m^2)
pub type Current = f64;

/// Conductance (S/m^2)
pub type Conductance = f64;

/// Capacitance (F/m^2)
pub type Capacitance = f64;

/// State vector for ODE systems
pub type StateVector = Array1<f64>;

/// Time series data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Time points
    pub time: Vec<Time>,
    /// Values at each time point
    pub values: Vec<f64>,
    /// Variable name
    pub name: String,
    /// Units
    pub units: Option<String>,
}

impl TimeSeries {
    pub fn new(name: &str) -> Self {
        Self {
            time: Vec::new(),
            values: Vec::new(),
            name: name.to_string(),
            units: None,
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn push(&mut self, t: Time, v: f64) {
        self.time.push(t);
        self.values.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Last recorded value
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Largest recorded value
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }
}

/// ODE system trait (for integrators)
pub trait OdeSystem {
    /// System dimension
    fn dimension(&self) -> usize;

    /// Compute derivatives: dy/dt = f(t, y)
    fn derivatives(&self, t: Time, y: &StateVector) -> Result<StateVector>;

    /// Names of the state variables, in state-vector order
    fn variable_names(&self) -> Vec<String> {
        (0..self.dimension()).map(|i| format!("y{}", i)).collect()
    }
}

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Start time
    pub t_start: Time,
    /// End time
    pub t_end: Time,
    /// Time step
    pub dt: Time,
    /// Output interval (for recording)
    pub output_dt: Option<Time>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 100.0,
            dt: 0.01,
            output_dt: Some(0.1),
        }
    }
}

impl SimulationParams {
    /// Check that the time grid is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0) {
            return Err(SonicError::SimulationError(format!(
                "time step must be positive, got {}",
                self.dt
            )));
        }
        if self.t_end < self.t_start {
            return Err(SonicError::SimulationError(format!(
                "end time {} precedes start time {}",
                self.t_end, self.t_start
            )));
        }
        if let Some(out) = self.output_dt {
            if !(out > 0.0) {
                return Err(SonicError::SimulationError(format!(
                    "output interval must be positive, got {}",
                    out
                )));
            }
        }
        Ok(())
    }

    /// Number of integration steps
    pub fn n_steps(&self) -> usize {
        ((self.t_end - self.t_start) / self.dt).round() as usize
    }

    /// Steps between two recorded samples
    pub fn record_every(&self) -> usize {
        match self.output_dt {
            Some(out) => ((out / self.dt).round() as usize).max(1),
            None => 1,
        }
    }
}

// =============================================================================
// INTEGRATION
// =============================================================================

/// Single classic Runge-Kutta step
pub fn rk4_step<S: OdeSystem + ?Sized>(
    system: &S,
    t: Time,
    y: &StateVector,
    dt: Time,
) -> Result<StateVector> {
    let k1 = system.derivatives(t, y)?;
    let y2 = y + &(&k1 * (dt / 2.0));
    let k2 = system.derivatives(t + dt / 2.0, &y2)?;
    let y3 = y + &(&k2 * (dt / 2.0));
    let k3 = system.derivatives(t + dt / 2.0, &y3)?;
    let y4 = y + &(&k3 * dt);
    let k4 = system.derivatives(t + dt, &y4)?;

    Ok(y + &((&k1 + &(&k2 * 2.0) + &(&k3 * 2.0) + &k4) * (dt / 6.0)))
}

/// Fixed-step RK4 integration, recording every variable at `output_dt`.
///
/// `on_step` is invoked after each step with the step index, which lets
/// callers drive progress reporting without owning the loop.
pub fn integrate_rk4<S, F>(
    system: &S,
    y0: &StateVector,
    params: &SimulationParams,
    mut on_step: F,
) -> Result<Vec<TimeSeries>>
where
    S: OdeSystem + ?Sized,
    F: FnMut(usize),
{
    params.validate()?;
    if y0.len() != system.dimension() {
        return Err(SonicError::SimulationError(format!(
            "initial state has {} entries, system expects {}",
            y0.len(),
            system.dimension()
        )));
    }

    let mut series: Vec<TimeSeries> = system
        .variable_names()
        .iter()
        .map(|name| TimeSeries::new(name))
        .collect();
    let record = |series: &mut Vec<TimeSeries>, t: Time, y: &StateVector| {
        for (ts, v) in series.iter_mut().zip(y.iter()) {
            ts.push(t, *v);
        }
    };

    let n_steps = params.n_steps();
    let every = params.record_every();
    tracing::debug!(n_steps, every, dt = params.dt, "starting RK4 integration");

    let mut y = y0.clone();
    let mut t = params.t_start;
    record(&mut series, t, &y);

    for step in 1..=n_steps {
        y = rk4_step(system, t, &y, params.dt)?;
        t = params.t_start + step as f64 * params.dt;

        if y.iter().any(|v| !v.is_finite()) {
            return Err(SonicError::NumericalError(format!(
                "non-finite state at t = {} ms",
                t
            )));
        }
        if step % every == 0 || step == n_steps {
            record(&mut series, t, &y);
        }
        on_step(step);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// dy/dt = -y
    struct Decay;

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn derivatives(&self, _t: Time, y: &StateVector) -> Result<StateVector> {
            Ok(-y)
        }
    }

    #[test]
    fn test_rk4_exponential_decay() {
        let params = SimulationParams {
            t_end: 1.0,
            dt: 0.01,
            output_dt: Some(0.1),
            ..Default::default()
        };
        let series = integrate_rk4(&Decay, &array![1.0], &params, |_| {}).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "y0");
        assert_eq!(series[0].len(), 11);
        assert_abs_diff_eq!(series[0].last().unwrap(), (-1.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_bad_time_step() {
        let params = SimulationParams {
            dt: 0.0,
            ..Default::default()
        };
        let err = integrate_rk4(&Decay, &array![1.0], &params, |_| {}).unwrap_err();
        assert!(matches!(err, SonicError::SimulationError(_)));
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let params = SimulationParams::default();
        let err = integrate_rk4(&Decay, &array![1.0, 2.0], &params, |_| {}).unwrap_err();
        assert!(matches!(err, SonicError::SimulationError(_)));
    }

    #[test]
    fn test_step_callback_counts() {
        let params = SimulationParams {
            t_end: 0.5,
            dt: 0.1,
            output_dt: None,
            ..Default::default()
        };
        let mut calls = 0;
        integrate_rk4(&Decay, &array![1.0], &params, |_| calls += 1).unwrap();
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_params_json_is_time_grid_only() {
        let json = serde_json::to_value(SimulationParams::default()).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["dt", "output_dt", "t_end", "t_start"]);

        let params: SimulationParams =
            serde_json::from_str(r#"{"t_start": 0.0, "t_end": 5.0, "dt": 0.5, "output_dt": null}"#).unwrap();
        assert_eq!(params.n_steps(), 10);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_time_series() {
        let mut ts = TimeSeries::new("voltage").with_units("mV");
        ts.push(0.0, -65.0);
        ts.push(0.1, -64.0);
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.max(), Some(-64.0));
        assert_eq!(ts.units.as_deref(), Some("mV"));
    }
}
