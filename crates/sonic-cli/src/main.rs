//! # SonicNeurons CLI
//!
//! Inspect the shipped point-neuron models and run current-clamp simulations.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, FuzzySelect};
use indicatif::{ProgressBar, ProgressStyle};
use sonic_core::{SimulationParams, SonicError, TimeSeries};
use sonic_neurons::{models, NeuronConfig, NeuronModel, PointNeuron, Stimulus};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sonic")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "Hodgkin-Huxley point-neuron models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered models
    List,

    /// Print gate steady states and time constants at one voltage
    SteadyStates {
        #[command(flatten)]
        source: ModelSource,
        /// Membrane potential (mV), defaults to the model resting potential
        #[arg(short, long, allow_hyphen_values = true)]
        voltage: Option<f64>,
    },

    /// Print currents and conductances with gates at steady state
    Currents {
        #[command(flatten)]
        source: ModelSource,
        /// Membrane potential (mV), defaults to the model resting potential
        #[arg(short, long, allow_hyphen_values = true)]
        voltage: Option<f64>,
    },

    /// Run a current-clamp simulation from rest
    Simulate {
        #[command(flatten)]
        source: ModelSource,
        /// Stimulus amplitude (mA/m^2)
        #[arg(short, long, default_value_t = 50.0, allow_hyphen_values = true)]
        amplitude: f64,
        /// Stimulus onset (ms)
        #[arg(long, default_value_t = 10.0)]
        onset: f64,
        /// Stimulus duration (ms)
        #[arg(long, default_value_t = 50.0)]
        duration: f64,
        /// Simulation length (ms)
        #[arg(short, long, default_value_t = 100.0)]
        t_end: f64,
        /// Integration step (ms)
        #[arg(long, default_value_t = 0.005)]
        dt: f64,
        /// Recording interval (ms)
        #[arg(long, default_value_t = 0.1)]
        output_dt: f64,
        /// Write recorded traces as JSON (`-` for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ModelSource {
    /// Registered model name
    #[arg(short, long, conflicts_with = "config")]
    model: Option<String>,
    /// JSON model configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ModelSource {
    fn resolve(&self) -> anyhow::Result<NeuronModel> {
        if let Some(path) = &self.config {
            let config = NeuronConfig::from_json_file(path)
                .with_context(|| format!("reading {}", path.display()))?;
            tracing::info!(config = %path.display(), model = %config.model, "loaded model configuration");
            return Ok(config.build()?);
        }
        let name = match &self.model {
            Some(name) => name.clone(),
            None => pick_model()?,
        };
        tracing::info!(model = %name, "resolving registered model");
        Ok(models::by_name(&name)?)
    }
}

fn pick_model() -> anyhow::Result<String> {
    if !Term::stdout().is_term() {
        bail!("no model given; pass --model or --config");
    }
    let entries = models::registry();
    let items: Vec<String> = entries
        .iter()
        .map(|e| format!("{:<16} {}", e.name, e.description))
        .collect();
    let choice = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Model")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(entries[choice].name.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => list_models(),

        Commands::SteadyStates { source, voltage } => {
            let model = source.resolve()?;
            let v = voltage.unwrap_or(model.vm0());
            println!("{} {} at {} mV", "Steady states:".green().bold(), model.name().cyan(), v);
            println!();
            println!("  {:<14} {:>12} {:>14}", "gate", "inf", "tau (ms)");
            let states = model.steady_states(v);
            for gate in model.gate_names() {
                println!(
                    "  {:<14} {:>12.6e} {:>14.6e}",
                    gate,
                    states[gate],
                    model.time_constant(gate, v)?
                );
            }
        }

        Commands::Currents { source, voltage } => {
            let model = source.resolve()?;
            let v = voltage.unwrap_or(model.vm0());
            print_currents(&model, v)?;
        }

        Commands::Simulate {
            source,
            amplitude,
            onset,
            duration,
            t_end,
            dt,
            output_dt,
            output,
        } => {
            let model = source.resolve()?;
            let params = SimulationParams {
                t_end,
                dt,
                output_dt: Some(output_dt),
                ..Default::default()
            };
            let stimulus = Stimulus::new(amplitude, onset, duration);
            let series = simulate(model, stimulus, &params)?;
            if let Some(path) = output {
                write_series(&series, &path)?;
            }
        }
    }

    Ok(())
}

fn list_models() {
    println!("{}", "Registered models:".green().bold());
    println!();
    for entry in models::registry() {
        let model = (entry.build)();
        println!(
            "  {:<16} {} ({} channels, {} gates)",
            entry.name.cyan(),
            entry.description,
            model.channels().len(),
            model.gate_names().len()
        );
    }
}

fn print_currents(model: &NeuronModel, v: f64) -> anyhow::Result<()> {
    let state = model.steady_states(v);
    println!("{} {} at {} mV", "Currents:".green().bold(), model.name().cyan(), v);
    println!();
    println!("  {:<14} {:>14} {:>14}", "channel", "i (mA/m^2)", "g (S/m^2)");

    for (i_name, g_name) in model.current_names().iter().zip(model.conductance_names()) {
        let i = model.current(i_name, v, &state, None)?;
        let g = match model.conductance(g_name, v, &state, None) {
            Ok(g) => format!("{:>14.6e}", g),
            Err(SonicError::DefectiveConductance { .. }) => format!("{:>14}", "defect".yellow()),
            Err(e) => return Err(e.into()),
        };
        let channel = i_name.trim_start_matches("i_");
        println!("  {:<14} {:>14.6e} {}", channel, i, g);
    }

    println!();
    println!("  {:<14} {:>14.6e}", "net".bold(), model.net_current(v, &state)?);
    Ok(())
}

fn simulate(
    model: NeuronModel,
    stimulus: Stimulus,
    params: &SimulationParams,
) -> anyhow::Result<Vec<TimeSeries>> {
    println!(
        "{} {} with {} mA/m^2 from {} ms for {} ms",
        "Simulating".green().bold(),
        model.name().cyan(),
        stimulus.amplitude,
        stimulus.onset,
        stimulus.duration
    );

    let neuron = PointNeuron::new(model).with_stimulus(stimulus);
    let pb = ProgressBar::new(params.n_steps() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    let series = neuron.simulate(params, |step| {
        if step % 100 == 0 {
            pb.set_position(step as u64);
        }
    });
    pb.finish_and_clear();
    let series = series?;

    let vm = series.first().context("simulation recorded no variables")?;
    let spikes = count_spikes(&vm.values, 0.0);
    println!();
    println!("  {:<12} {}", "samples", vm.len());
    println!("  {:<12} {:.3} mV", "final Vm", vm.last().unwrap_or(f64::NAN));
    println!("  {:<12} {:.3} mV", "peak Vm", vm.max().unwrap_or(f64::NAN));
    println!("  {:<12} {}", "spikes", spikes.to_string().bold());
    Ok(series)
}

/// Upward crossings of `threshold`
fn count_spikes(values: &[f64], threshold: f64) -> usize {
    values
        .windows(2)
        .filter(|w| w[0] < threshold && w[1] >= threshold)
        .count()
}

fn write_series(series: &[TimeSeries], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(series)?;
    if path.as_os_str() == "-" {
        println!("{}", json);
    } else {
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("{} {}", "Traces written to".green(), path.display());
    }
    Ok(())
}
