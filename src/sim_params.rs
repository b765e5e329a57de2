//! # Simulation parameter files
//!
//! The skewer orchestrator needs two facts about a snapshot that only the simulation parameter
//! file knows: its **redshift** and the **cosmology** of the run. Both are read through the
//! [`SnapshotParameters`] trait; [`GadgetParamFile`] implements it for Gadget / MP-Gadget
//! parameter files.
//!
//! ## Gadget parameter format
//!
//! One `Key value` (Gadget-2) or `Key = value` (MP-Gadget) pair per line, comments introduced by
//! `%` or `#`. The keys used here are:
//!
//! | Key           | Meaning                                      |
//! |---------------|----------------------------------------------|
//! | `OutputList`  | comma-separated scale factors of snapshots   |
//! | `HubbleParam` | h                                            |
//! | `Omega0`      | total matter density Ω_m                     |
//! | `OmegaBaryon` | baryon density Ω_b                           |
//! | `MNue`, `MNum`, `MNut` | neutrino masses in eV (optional)    |
//!
//! Snapshot `i` sits at redshift `z_i = 1/a_i − 1`.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use camino::Utf8Path;
use regex::Regex;

use crate::{
    constants::{KmsPerMpc, Redshift, SnapNum},
    cosmology::{CosmologyRate, HubbleEngine, SimCosmology},
    fluxpower_errors::FluxPowerError,
};

/// Read access to the per-snapshot information of a simulation.
pub trait SnapshotParameters {
    /// Redshift of every snapshot, indexed by snapshot number.
    fn redshifts(&self) -> Result<Vec<Redshift>, FluxPowerError>;

    /// Cosmology the simulation was run with.
    fn cosmology(&self) -> Result<SimCosmology, FluxPowerError>;

    /// Redshift of one snapshot.
    fn snapshot_redshift(&self, snap_num: SnapNum) -> Result<Redshift, FluxPowerError> {
        let zs = self.redshifts()?;
        zs.get(snap_num).copied().ok_or_else(|| {
            FluxPowerError::ParamFileError(format!(
                "snapshot {snap_num} not in output list ({} snapshots)",
                zs.len()
            ))
        })
    }
}

/// Gadget / MP-Gadget parameter file, parsed into a key → raw value map.
#[derive(Debug, Clone)]
pub struct GadgetParamFile {
    entries: HashMap<String, String>,
}

impl GadgetParamFile {
    /// Read and parse `paramfile.gadget`.
    pub fn read(path: &Utf8Path) -> Result<Self, FluxPowerError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse the textual content of a parameter file.
    pub fn parse(content: &str) -> Result<Self, FluxPowerError> {
        let line_re = Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:=\s*|\s+)(.*?)\s*$")
            .map_err(|e| FluxPowerError::ParamFileError(e.to_string()))?;

        let entries = content
            .lines()
            .map(|line| line.split(['%', '#']).next().unwrap_or(""))
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                line_re.captures(line).map(|cap| {
                    (
                        cap[1].to_string(),
                        cap[2].trim_matches(|c| c == '"' || c == '\'').to_string(),
                    )
                })
            })
            .collect();

        Ok(GadgetParamFile { entries })
    }

    /// Raw string value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn get_f64(&self, key: &str) -> Result<f64, FluxPowerError> {
        let raw = self
            .get(key)
            .ok_or_else(|| FluxPowerError::ParamFileError(format!("missing key {key}")))?;
        raw.parse().map_err(|_| {
            FluxPowerError::ParamFileError(format!("value of {key} is not a number: {raw}"))
        })
    }

    fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, FluxPowerError> {
        match self.get(key) {
            Some(_) => self.get_f64(key),
            None => Ok(default),
        }
    }
}

impl SnapshotParameters for GadgetParamFile {
    fn redshifts(&self) -> Result<Vec<Redshift>, FluxPowerError> {
        let raw = self
            .get("OutputList")
            .ok_or_else(|| FluxPowerError::ParamFileError("missing key OutputList".into()))?;

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map(|a| 1.0 / a - 1.0)
                    .map_err(|_| FluxPowerError::ParamFileError(format!("bad scale factor: {s}")))
            })
            .collect()
    }

    fn cosmology(&self) -> Result<SimCosmology, FluxPowerError> {
        let h = self.get_f64("HubbleParam")?;
        let omega0 = self.get_f64("Omega0")?;
        let omega_b = self.get_f64("OmegaBaryon")?;
        let mnu = self.get_f64_or("MNue", 0.0)?
            + self.get_f64_or("MNum", 0.0)?
            + self.get_f64_or("MNut", 0.0)?;

        Ok(SimCosmology {
            h0: 100.0 * h,
            ombh2: omega_b * h * h,
            omch2: (omega0 - omega_b) * h * h,
            mnu,
        })
    }
}

/// Redshift of a snapshot and the velocity ↔ comoving conversion at that redshift.
///
/// Arguments
/// -----------------
/// * `params`: the simulation parameter source.
/// * `snap_num`: snapshot index.
/// * `engine`: optional full cosmology engine, preferred over the analytic fallback.
///
/// Return
/// ----------
/// * `(dkms_dmpc, z)`.
pub fn dkms_dmpc_z(
    params: &dyn SnapshotParameters,
    snap_num: SnapNum,
    engine: Option<Arc<dyn HubbleEngine>>,
) -> Result<(KmsPerMpc, Redshift), FluxPowerError> {
    let z = params.snapshot_redshift(snap_num)?;
    let rate = CosmologyRate::new(params.cosmology()?, engine);
    let dkms_dmpc = rate.dkms_dmpc_at(z)?;
    Ok((dkms_dmpc, z))
}
