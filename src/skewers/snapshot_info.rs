//! Per-snapshot metadata sidecar.
//!
//! One JSON object per `(snap_num, n_skewers, width_Mpc)` written next to the skewer files. The
//! per-rescaling arrays are index-aligned: entry `i` of `sim_T0`, `sim_gamma`, `sim_mf`,
//! `sim_sigT_Mpc`, `sim_scale_T0`, `sim_scale_gamma` and `sk_files` all describe the same file.
//! The key names are shared with the tools that build P1D archives from these sidecars.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Kelvin, KmPerS, Mpc, Redshift, SnapNum},
    fluxpower_errors::FluxPowerError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub raw_dir: Utf8PathBuf,
    pub post_dir: Utf8PathBuf,
    /// Axis as requested; `None` means the extractor default (axis 1).
    pub axis: Option<u8>,
    pub z: Redshift,
    pub snap_num: SnapNum,
    pub n_skewers: usize,
    #[serde(rename = "width_Mpc")]
    pub width_mpc: Mpc,
    pub width_kms: KmPerS,
    #[serde(rename = "T0_ini")]
    pub t0_ini: Kelvin,
    pub gamma_ini: f64,
    #[serde(rename = "scales_T0")]
    pub scales_t0: Vec<f64>,
    pub scales_gamma: Vec<f64>,

    #[serde(rename = "sim_T0")]
    pub sim_t0: Vec<Kelvin>,
    pub sim_gamma: Vec<f64>,
    pub sim_mf: Vec<f64>,
    #[serde(rename = "sim_sigT_Mpc")]
    pub sim_sigt_mpc: Vec<Mpc>,
    #[serde(rename = "sim_scale_T0")]
    pub sim_scale_t0: Vec<f64>,
    pub sim_scale_gamma: Vec<f64>,
    pub sk_files: Vec<String>,
    pub snapshot_filename: String,
}

impl SnapshotInfo {
    /// Number of rescalings recorded in the sidecar.
    pub fn n_rescalings(&self) -> usize {
        self.sk_files.len()
    }

    /// Write the sidecar as `<dir>/<snapshot_filename>` and return the path.
    ///
    /// The write is not atomic: an interrupted run leaves a truncated file behind.
    pub fn write(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, FluxPowerError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.snapshot_filename);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(writer, self)?;
        Ok(path)
    }

    /// Read a sidecar back from disk.
    pub fn read(path: &Utf8Path) -> Result<Self, FluxPowerError> {
        let reader = BufReader::new(File::open(path)?);
        let info: SnapshotInfo = serde_json::from_reader(reader)?;

        let n = info.sk_files.len();
        let aligned = [
            info.sim_t0.len(),
            info.sim_gamma.len(),
            info.sim_mf.len(),
            info.sim_sigt_mpc.len(),
            info.sim_scale_t0.len(),
            info.sim_scale_gamma.len(),
        ]
        .iter()
        .all(|&len| len == n);
        if !aligned {
            return Err(FluxPowerError::InconsistentData(format!(
                "per-rescaling arrays of {path} have different lengths"
            )));
        }
        Ok(info)
    }
}
