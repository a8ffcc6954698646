use crate::cli::{LevelsPdosArgs, QePdosArgs, RunModelArgs};
use crate::error::{CliError, Result};
use qdrec::analysis::pdos::{
    Broadening, EnergyWindow, LevelsConfig, LevelsProjection, OrbitalChannel, QeConfig,
    QeProjection, SpinTreatment,
};
use qdrec::demo::exact::ExactDemoConfig;
use qdrec::demo::heom::HeomDemoConfig;
use qdrec::demo::tsh::TshDemoConfig;
use qdrec::record::schema::OutputLevel;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

fn load_partial<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading configuration from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialEnergyWindow {
    emin: Option<f64>,
    emax: Option<f64>,
    de: Option<f64>,
}

impl PartialEnergyWindow {
    /// CLI window flags win over the file section; every edge must come
    /// from one of the two.
    fn resolve(
        self,
        emin: Option<f64>,
        emax: Option<f64>,
        de: Option<f64>,
    ) -> Result<EnergyWindow> {
        let require = |value: Option<f64>, key: &str, flag: &str| {
            value.ok_or_else(|| {
                CliError::Config(format!(
                    "A value for 'window.{}' is required either in the config file or via {}.",
                    key, flag
                ))
            })
        };
        Ok(EnergyWindow {
            emin: require(emin.or(self.emin), "emin", "--emin")?,
            emax: require(emax.or(self.emax), "emax", "--emax")?,
            de: require(de.or(self.de), "de", "--de")?,
        })
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialBroadening {
    spacing: Option<f64>,
    width: Option<f64>,
}

impl PartialBroadening {
    fn resolve(self) -> Result<Broadening> {
        let require = |value: Option<f64>, key: &str| {
            value.ok_or_else(|| {
                CliError::Config(format!(
                    "`broadening.{}` is required when the broadening section is present.",
                    key
                ))
            })
        };
        Ok(Broadening {
            spacing: require(self.spacing, "spacing")?,
            width: require(self.width, "width")?,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialQeProjection {
    orbitals: Vec<String>,
    atoms: Vec<usize>,
    elements: Vec<String>,
}

impl From<PartialQeProjection> for QeProjection {
    fn from(p: PartialQeProjection) -> Self {
        Self {
            orbitals: p.orbitals,
            atoms: p.atoms,
            elements: p.elements,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialQePdosConfig {
    prefix: Option<String>,
    window: Option<PartialEnergyWindow>,
    #[serde(rename = "fermi-energy")]
    fermi_energy: Option<f64>,
    nspin: Option<u8>,
    #[serde(default)]
    projections: Vec<PartialQeProjection>,
    broadening: Option<PartialBroadening>,
}

impl PartialQePdosConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_partial(path)
    }

    pub fn merge_with_cli(self, args: &QePdosArgs) -> Result<QeConfig> {
        let prefix = self
            .prefix
            .ok_or_else(|| CliError::Config("`prefix` is required.".to_string()))?;
        let window = self
            .window
            .unwrap_or_default()
            .resolve(args.emin, args.emax, args.de)?;
        let fermi = args.fermi.or(self.fermi_energy).ok_or_else(|| {
            CliError::Config(
                "A value for 'fermi-energy' is required either in the config file or via --fermi."
                    .to_string(),
            )
        })?;
        let spin = SpinTreatment::from_nspin(self.nspin.unwrap_or(1))
            .map_err(|e| CliError::Config(e.to_string()))?;
        if self.projections.is_empty() {
            return Err(CliError::Config(
                "At least one `[[projections]]` entry is required.".to_string(),
            ));
        }

        Ok(QeConfig {
            prefix,
            window,
            projections: self.projections.into_iter().map(Into::into).collect(),
            fermi,
            spin,
            broadening: self.broadening.map(PartialBroadening::resolve).transpose()?,
        })
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum PartialOrbitalChannel {
    Total,
    S,
    P,
    D,
}

impl From<PartialOrbitalChannel> for OrbitalChannel {
    fn from(p: PartialOrbitalChannel) -> Self {
        match p {
            PartialOrbitalChannel::Total => OrbitalChannel::Total,
            PartialOrbitalChannel::S => OrbitalChannel::S,
            PartialOrbitalChannel::P => OrbitalChannel::P,
            PartialOrbitalChannel::D => OrbitalChannel::D,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialLevelsProjection {
    channel: PartialOrbitalChannel,
    atoms: Vec<usize>,
}

impl From<PartialLevelsProjection> for LevelsProjection {
    fn from(p: PartialLevelsProjection) -> Self {
        Self {
            channel: p.channel.into(),
            atoms: p.atoms,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialLevelsPdosConfig {
    prefix: Option<String>,
    window: Option<PartialEnergyWindow>,
    electrons: Option<f64>,
    #[serde(default)]
    projections: Vec<PartialLevelsProjection>,
    broadening: Option<PartialBroadening>,
}

impl PartialLevelsPdosConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_partial(path)
    }

    pub fn merge_with_cli(self, args: &LevelsPdosArgs) -> Result<LevelsConfig> {
        let prefix = self
            .prefix
            .ok_or_else(|| CliError::Config("`prefix` is required.".to_string()))?;
        let window = self
            .window
            .unwrap_or_default()
            .resolve(args.emin, args.emax, args.de)?;
        let electrons = args.electrons.or(self.electrons).ok_or_else(|| {
            CliError::Config(
                "A value for 'electrons' is required either in the config file or via --electrons."
                    .to_string(),
            )
        })?;
        if self.projections.is_empty() {
            return Err(CliError::Config(
                "At least one `[[projections]]` entry is required.".to_string(),
            ));
        }

        Ok(LevelsConfig {
            prefix,
            window,
            projections: self.projections.into_iter().map(Into::into).collect(),
            electrons,
            broadening: self.broadening.map(PartialBroadening::resolve).transpose()?,
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialTshDemoConfig {
    nsteps: Option<usize>,
    ntraj: Option<usize>,
    ndof: Option<usize>,
    nstates: Option<usize>,
    dt: Option<f64>,
    #[serde(rename = "rabi-frequency")]
    rabi_frequency: Option<f64>,
    #[serde(rename = "nuclear-frequency")]
    nuclear_frequency: Option<f64>,
    mass: Option<f64>,
    amplitude: Option<f64>,
    #[serde(rename = "energy-gap")]
    energy_gap: Option<f64>,
    coupling: Option<f64>,
    #[serde(rename = "mixing-angle")]
    mixing_angle: Option<f64>,
    #[serde(rename = "output-level")]
    output_level: Option<u8>,
    seed: Option<u64>,
}

impl PartialTshDemoConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_partial(path)
    }

    pub fn merge_with_cli(self, args: &RunModelArgs) -> TshDemoConfig {
        let defaults = TshDemoConfig::default();
        TshDemoConfig {
            nsteps: args.steps.or(self.nsteps).unwrap_or(defaults.nsteps),
            ntraj: self.ntraj.unwrap_or(defaults.ntraj),
            ndof: self.ndof.unwrap_or(defaults.ndof),
            nstates: self.nstates.unwrap_or(defaults.nstates),
            dt: self.dt.unwrap_or(defaults.dt),
            rabi_frequency: self.rabi_frequency.unwrap_or(defaults.rabi_frequency),
            nuclear_frequency: self.nuclear_frequency.unwrap_or(defaults.nuclear_frequency),
            mass: self.mass.unwrap_or(defaults.mass),
            amplitude: self.amplitude.unwrap_or(defaults.amplitude),
            energy_gap: self.energy_gap.unwrap_or(defaults.energy_gap),
            coupling: self.coupling.unwrap_or(defaults.coupling),
            mixing_angle: self.mixing_angle.unwrap_or(defaults.mixing_angle),
            output_level: resolve_level(args, self.output_level, defaults.output_level),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialHeomDemoConfig {
    nsteps: Option<usize>,
    nquant: Option<usize>,
    dt: Option<f64>,
    #[serde(rename = "rabi-frequency")]
    rabi_frequency: Option<f64>,
    #[serde(rename = "dephasing-rate")]
    dephasing_rate: Option<f64>,
    #[serde(rename = "output-level")]
    output_level: Option<u8>,
}

impl PartialHeomDemoConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_partial(path)
    }

    pub fn merge_with_cli(self, args: &RunModelArgs) -> HeomDemoConfig {
        let defaults = HeomDemoConfig::default();
        HeomDemoConfig {
            nsteps: args.steps.or(self.nsteps).unwrap_or(defaults.nsteps),
            nquant: self.nquant.unwrap_or(defaults.nquant),
            dt: self.dt.unwrap_or(defaults.dt),
            rabi_frequency: self.rabi_frequency.unwrap_or(defaults.rabi_frequency),
            dephasing_rate: self.dephasing_rate.unwrap_or(defaults.dephasing_rate),
            output_level: resolve_level(args, self.output_level, defaults.output_level),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialExactDemoConfig {
    nsteps: Option<usize>,
    ngrid: Option<usize>,
    nstates: Option<usize>,
    dt: Option<f64>,
    #[serde(rename = "box-length")]
    box_length: Option<f64>,
    mass: Option<f64>,
    frequency: Option<f64>,
    displacement: Option<f64>,
    #[serde(rename = "rabi-frequency")]
    rabi_frequency: Option<f64>,
    #[serde(rename = "mixing-angle")]
    mixing_angle: Option<f64>,
    #[serde(rename = "custom-pops")]
    custom_pops: Option<bool>,
    #[serde(rename = "output-level")]
    output_level: Option<u8>,
}

impl PartialExactDemoConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_partial(path)
    }

    pub fn merge_with_cli(self, args: &RunModelArgs) -> ExactDemoConfig {
        let defaults = ExactDemoConfig::default();
        ExactDemoConfig {
            nsteps: args.steps.or(self.nsteps).unwrap_or(defaults.nsteps),
            ngrid: self.ngrid.unwrap_or(defaults.ngrid),
            nstates: self.nstates.unwrap_or(defaults.nstates),
            dt: self.dt.unwrap_or(defaults.dt),
            box_length: self.box_length.unwrap_or(defaults.box_length),
            mass: self.mass.unwrap_or(defaults.mass),
            frequency: self.frequency.unwrap_or(defaults.frequency),
            displacement: self.displacement.unwrap_or(defaults.displacement),
            rabi_frequency: self.rabi_frequency.unwrap_or(defaults.rabi_frequency),
            mixing_angle: self.mixing_angle.unwrap_or(defaults.mixing_angle),
            custom_pops: self.custom_pops.unwrap_or(defaults.custom_pops),
            output_level: resolve_level(args, self.output_level, defaults.output_level),
        }
    }
}

fn resolve_level(args: &RunModelArgs, file_level: Option<u8>, fallback: OutputLevel) -> OutputLevel {
    args.output_level
        .or(file_level)
        .map(OutputLevel)
        .unwrap_or(fallback)
}
