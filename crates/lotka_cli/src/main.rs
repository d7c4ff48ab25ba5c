//! `lotka` - run Lotka-Volterra scenarios from the command line.

mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lotka_core::harvest::{simulate_with_harvest, Harvest};
use lotka_core::phase::{direction_field, nullclines, AxisRange};
use lotka_core::settings::{AdaptiveSettings, Scenario, SimulationSettings};
use lotka_core::sweep::{sweep, sweep_initial_states, ParameterAxis};
use lotka_core::{equilibrium, Parameters, Scheme, State};
use output::{
    orbit_row, render_csv, render_harvest_csv, render_harvest_summary, render_summary,
    sweep_row, ORBIT_HEADER, SWEEP_HEADER,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Lotka-Volterra predator-prey simulator
#[derive(Parser, Debug)]
#[command(name = "lotka")]
#[command(author, version, about = "Lotka-Volterra predator-prey simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate one scenario
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// What to print on stdout
        #[arg(short, long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },
    /// Vary one rate and simulate each value in parallel
    Sweep {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Rate to vary
        #[arg(long, value_enum)]
        axis: AxisArg,

        /// Comma-separated values for the varied rate
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<f64>,
    },
    /// Compare orbits from several starting populations
    Orbits {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Starting populations as `prey,predator`; repeat for more orbits
        #[arg(long = "start", value_parser = parse_state, required = true)]
        starts: Vec<State>,

        /// Also start one run at the coexistence equilibrium
        #[arg(long)]
        with_equilibrium: bool,
    },
    /// Cull the populations once mid-run and continue from there
    Harvest {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Time of the cull
        #[arg(long)]
        at: f64,

        /// Fraction of predators left after the cull
        #[arg(long, default_value = "0.7")]
        predator_factor: f64,

        /// Fraction of prey left after the cull
        #[arg(long, default_value = "1.0")]
        prey_factor: f64,

        /// What to print on stdout
        #[arg(short, long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },
    /// Print nullclines and a direction field as JSON
    Phase {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Prey axis upper bound
        #[arg(long, default_value = "12.0")]
        prey_max: f64,

        /// Predator axis upper bound
        #[arg(long, default_value = "30.0")]
        predator_max: f64,

        /// Grid points per axis
        #[arg(long, default_value = "15")]
        samples: usize,
    },
}

#[derive(Args, Debug, Default)]
struct ScenarioArgs {
    /// JSON scenario file; flags below override its fields
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Prey growth rate
    #[arg(long)]
    alpha: Option<f64>,

    /// Predation rate
    #[arg(long)]
    beta: Option<f64>,

    /// Predator death rate
    #[arg(long)]
    gamma: Option<f64>,

    /// Predator growth rate per encounter
    #[arg(long)]
    delta: Option<f64>,

    /// Initial prey population
    #[arg(long)]
    prey: Option<f64>,

    /// Initial predator population
    #[arg(long)]
    predator: Option<f64>,

    /// Simulated time span
    #[arg(short, long)]
    duration: Option<f64>,

    /// Number of output steps
    #[arg(short = 'n', long)]
    steps: Option<usize>,

    /// Stepping scheme
    #[arg(long, value_enum)]
    scheme: Option<SchemeArg>,

    /// Relative tolerance for the adaptive scheme
    #[arg(long)]
    rtol: Option<f64>,

    /// Absolute tolerance for the adaptive scheme
    #[arg(long)]
    atol: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Summary,
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemeArg {
    Rk4,
    Dopri5,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AxisArg {
    Alpha,
    Beta,
    Gamma,
    Delta,
}

impl From<AxisArg> for ParameterAxis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Alpha => ParameterAxis::PreyGrowth,
            AxisArg::Beta => ParameterAxis::Predation,
            AxisArg::Gamma => ParameterAxis::PredatorDeath,
            AxisArg::Delta => ParameterAxis::PredatorGrowth,
        }
    }
}

impl ScenarioArgs {
    fn resolve(&self) -> Result<Scenario> {
        let mut scenario = match &self.scenario {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read scenario {}", path.display()))?;
                Scenario::from_json(&text)
                    .with_context(|| format!("Invalid scenario {}", path.display()))?
            }
            None => Scenario {
                parameters: Parameters {
                    prey_growth: 1.0,
                    predation: 0.1,
                    predator_death: 1.5,
                    predator_growth: 0.75,
                },
                initial: State::new(10.0, 5.0),
                settings: SimulationSettings::default(),
            },
        };

        let p = &mut scenario.parameters;
        override_with(&mut p.prey_growth, self.alpha);
        override_with(&mut p.predation, self.beta);
        override_with(&mut p.predator_death, self.gamma);
        override_with(&mut p.predator_growth, self.delta);
        override_with(&mut scenario.initial.prey, self.prey);
        override_with(&mut scenario.initial.predator, self.predator);
        override_with(&mut scenario.settings.duration, self.duration);
        override_with(&mut scenario.settings.step_count, self.steps);

        let adaptive = match (self.scheme, scenario.settings.scheme) {
            (Some(SchemeArg::Rk4), _) => None,
            (Some(SchemeArg::Dopri5), Scheme::DormandPrince(current)) => Some(current),
            (Some(SchemeArg::Dopri5), Scheme::Rk4) => Some(AdaptiveSettings::default()),
            (None, Scheme::DormandPrince(current)) => Some(current),
            (None, Scheme::Rk4) => None,
        };
        scenario.settings.scheme = match adaptive {
            Some(mut settings) => {
                override_with(&mut settings.rtol, self.rtol);
                override_with(&mut settings.atol, self.atol);
                Scheme::DormandPrince(settings)
            }
            None => Scheme::Rk4,
        };

        scenario.validate().context("Invalid simulation settings")?;
        Ok(scenario)
    }
}

fn parse_state(text: &str) -> Result<State, String> {
    let (prey, predator) = text
        .split_once(',')
        .ok_or_else(|| format!("expected `prey,predator`, got `{text}`"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid population `{value}`: {err}"))
    };
    Ok(State::new(parse(prey)?, parse(predator)?))
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Run { scenario, format } => {
            let scenario = scenario.resolve()?;
            info!(
                parameters = ?scenario.parameters,
                initial = ?scenario.initial,
                steps = scenario.settings.step_count,
                "running scenario"
            );
            let trajectory = scenario.run()?;
            match format {
                Format::Summary => out.write_all(render_summary(&trajectory).as_bytes())?,
                Format::Csv => out.write_all(render_csv(&trajectory).as_bytes())?,
                Format::Json => {
                    serde_json::to_writer_pretty(&mut out, &trajectory)
                        .context("Failed to serialize trajectory")?;
                    writeln!(out)?;
                }
            }
        }
        Commands::Sweep {
            scenario,
            axis,
            values,
        } => {
            let scenario = scenario.resolve()?;
            info!(?axis, runs = values.len(), "running sweep");
            let runs = sweep(
                &scenario.parameters,
                scenario.initial,
                &scenario.settings,
                axis.into(),
                &values,
            )?;
            writeln!(out, "{SWEEP_HEADER}")?;
            for run in &runs {
                writeln!(out, "{}", sweep_row(run))?;
            }
        }
        Commands::Orbits {
            scenario,
            mut starts,
            with_equilibrium,
        } => {
            let scenario = scenario.resolve()?;
            if with_equilibrium {
                starts.push(equilibrium(&scenario.parameters)?);
            }
            info!(runs = starts.len(), "comparing initial states");
            let runs = sweep_initial_states(&scenario.parameters, &scenario.settings, &starts)?;
            writeln!(out, "{ORBIT_HEADER}")?;
            for run in &runs {
                writeln!(out, "{}", orbit_row(run))?;
            }
        }
        Commands::Harvest {
            scenario,
            at,
            predator_factor,
            prey_factor,
            format,
        } => {
            let scenario = scenario.resolve()?;
            let harvest = Harvest {
                time: at,
                prey_factor,
                predator_factor,
            };
            info!(?harvest, "running harvest experiment");
            let run = simulate_with_harvest(
                scenario.initial,
                &scenario.parameters,
                &scenario.settings,
                harvest,
            )?;
            match format {
                Format::Summary => out.write_all(render_harvest_summary(&run).as_bytes())?,
                Format::Csv => out.write_all(render_harvest_csv(&run).as_bytes())?,
                Format::Json => {
                    serde_json::to_writer_pretty(&mut out, &run)
                        .context("Failed to serialize harvest run")?;
                    writeln!(out)?;
                }
            }
        }
        Commands::Phase {
            scenario,
            prey_max,
            predator_max,
            samples,
        } => {
            let scenario = scenario.resolve()?;
            let lines = nullclines(&scenario.parameters)?;
            let arrows = direction_field(
                &scenario.parameters,
                &AxisRange {
                    min: 0.0,
                    max: prey_max,
                    samples,
                },
                &AxisRange {
                    min: 0.0,
                    max: predator_max,
                    samples,
                },
            )?;
            let document = serde_json::json!({
                "nullclines": lines,
                "direction_field": arrows,
            });
            serde_json::to_writer_pretty(&mut out, &document)
                .context("Failed to serialize phase portrait")?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}
