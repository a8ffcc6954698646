use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The qdrec developers",
    version,
    about = "qdrec CLI - Record quantum-dynamics observables into schema-driven HDF5 files and post-process projected densities of states.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bin atom- and orbital-projected densities of states onto an energy grid.
    Pdos(PdosArgs),
    /// Run a built-in model dynamics and record its observables to an HDF5 file.
    Run(RunArgs),
    /// List the datasets stored in a recorded HDF5 file.
    Inspect(InspectArgs),
    /// Estimate decoherence rates and coherence intervals from a recorded ensemble.
    Rates(RatesArgs),
}

/// Arguments for the `pdos` subcommand.
#[derive(Args, Debug)]
pub struct PdosArgs {
    #[command(subcommand)]
    pub command: PdosCommands,
}

/// Supported projection-file layouts.
#[derive(Subcommand, Debug)]
pub enum PdosCommands {
    /// Sum Quantum ESPRESSO `projwfc` output over atoms, orbitals and elements.
    Qe(QePdosArgs),
    /// Bin eigenvalue files with per-atom orbital weights and a self-determined Fermi level.
    Levels(LevelsPdosArgs),
}

/// Arguments for the `pdos qe` subcommand.
#[derive(Args, Debug)]
pub struct QePdosArgs {
    // --- Core Arguments ---
    /// Path to the analysis configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Prefix for the output tables; `_alp.txt` and `_bet.txt` are appended.
    #[arg(short, long, required = true, value_name = "PREFIX")]
    pub output: PathBuf,

    // --- Window Overrides ---
    /// Override the lower edge of the energy window from the config file, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub emin: Option<f64>,

    /// Override the upper edge of the energy window from the config file, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub emax: Option<f64>,

    /// Override the bin width from the config file, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub de: Option<f64>,

    /// Override the energy origin of the output axis, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub fermi: Option<f64>,
}

/// Arguments for the `pdos levels` subcommand.
#[derive(Args, Debug)]
pub struct LevelsPdosArgs {
    // --- Core Arguments ---
    /// Path to the analysis configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path for the output table.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    // --- Window Overrides ---
    /// Override the lower edge of the energy window from the config file, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub emin: Option<f64>,

    /// Override the upper edge of the energy window from the config file, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub emax: Option<f64>,

    /// Override the bin width from the config file, in eV.
    #[arg(long, value_name = "FLOAT")]
    pub de: Option<f64>,

    /// Override the electron count used to place the Fermi level.
    #[arg(long, value_name = "FLOAT")]
    pub electrons: Option<f64>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(subcommand)]
    pub command: RunCommands,
}

/// Built-in model dynamics.
#[derive(Subcommand, Debug)]
pub enum RunCommands {
    /// Surface-hopping ensemble of phase-shifted harmonic oscillators.
    Tsh(RunModelArgs),
    /// Damped Rabi oscillation of a reduced density matrix.
    Heom(RunModelArgs),
    /// Coherent wavepacket on a position grid with its reciprocal companion.
    Exact(RunModelArgs),
}

/// Arguments shared by the model-dynamics runners.
#[derive(Args, Debug)]
pub struct RunModelArgs {
    /// Path for the recorded HDF5 file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a model configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Model Overrides ---
    /// Override the number of recorded steps.
    #[arg(long, value_name = "INT")]
    pub steps: Option<usize>,

    /// Override the output level that gates dataset registration.
    #[arg(long, value_name = "INT")]
    pub output_level: Option<u8>,

    /// Buffer all observables in memory and flush them once at the end.
    #[arg(long)]
    pub buffered: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the recorded HDF5 file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Print one dataset with summary statistics instead of the full listing.
    #[arg(short, long, value_name = "NAME")]
    pub dataset: Option<String>,
}

/// Arguments for the `rates` subcommand.
#[derive(Args, Debug)]
pub struct RatesArgs {
    /// Path to a recorded surface-hopping HDF5 file holding `hvib_adi`, `p` and `Cadi`.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Recorded step to analyze. Defaults to the last step.
    #[arg(long, value_name = "INT")]
    pub step: Option<usize>,

    /// Nuclear mass used to recover kinetic energies from momenta, in atomic units.
    #[arg(long, value_name = "FLOAT", default_value_t = 2000.0)]
    pub mass: f64,

    /// Baseline damping parameter of the energy-gap rate expression.
    #[arg(long, value_name = "FLOAT", default_value_t = 1.0)]
    pub c_param: f64,

    /// Kinetic-energy weight of the energy-gap rate expression.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.1)]
    pub eps_param: f64,

    /// Rescale each rate by the instantaneous energy gap relative to its run average.
    #[arg(long)]
    pub dephasing_informed: bool,
}
