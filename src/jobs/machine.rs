//! SLURM machine profiles.
//!
//! Profiles are read from a TOML table keyed by machine label:
//!
//! ```toml
//! [machines.hypatia]
//! partition = "cores24"
//! nodes = 1
//! ntasks = 1
//! modules = ["python/3.8"]
//! extra_sbatch = ["--exclusive"]
//! ```
//!
//! Every field is optional. A built-in set ([`MachineProfiles::builtin`]) is shipped with the
//! crate.

use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::fluxpower_errors::FluxPowerError;

static BUILTIN_MACHINES: &str = include_str!("data/machines.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineProfile {
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default = "MachineProfile::default_nodes")]
    pub nodes: u32,
    #[serde(default = "MachineProfile::default_ntasks")]
    pub ntasks: u32,
    #[serde(default)]
    pub account: Option<String>,
    /// Environment modules loaded before running the job.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Raw `#SBATCH` options, without the `#SBATCH` prefix.
    #[serde(default)]
    pub extra_sbatch: Vec<String>,
}

impl MachineProfile {
    fn default_nodes() -> u32 {
        1
    }
    fn default_ntasks() -> u32 {
        1
    }
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self {
            partition: None,
            nodes: Self::default_nodes(),
            ntasks: Self::default_ntasks(),
            account: None,
            modules: Vec::new(),
            extra_sbatch: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineProfiles {
    #[serde(default)]
    machines: BTreeMap<String, MachineProfile>,
}

impl MachineProfiles {
    pub fn from_toml_str(content: &str) -> Result<Self, FluxPowerError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Utf8Path) -> Result<Self, FluxPowerError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Profiles shipped with the crate.
    pub fn builtin() -> Result<Self, FluxPowerError> {
        Self::from_toml_str(BUILTIN_MACHINES)
    }

    /// Profile of one machine; an unknown label is a [`FluxPowerError::ConfigurationError`].
    pub fn get(&self, label: &str) -> Result<&MachineProfile, FluxPowerError> {
        self.machines.get(label).ok_or_else(|| {
            FluxPowerError::ConfigurationError(format!(
                "unknown machine {label:?} (known: {})",
                self.labels().join(", ")
            ))
        })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.machines.keys().map(String::as_str).collect()
    }
}
