//! Seams to the external sightline-extraction library.
//!
//! Two collaborators live outside this crate:
//!
//! * a [`ThermalRelationFitter`] measuring the temperature-density relation `(T0, γ)` of a
//!   snapshot from its particle data,
//! * a [`SpectrumExtractor`] binning raw particle data into gridded skewers, optionally after
//!   imposing a new `(T0, γ)`.
//!
//! The extractor may be lazy: nothing is guaranteed to be computed until
//! [`GriddedSkewers::mean_flux`] is asked for.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Kelvin, KmPerS, SnapNum},
    fluxpower_errors::FluxPowerError,
};

/// Temperature-density relation `T = T0 (ρ/ρ̄)^(γ−1)` fitted on a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalFit {
    #[serde(rename = "T0")]
    pub t0: Kelvin,
    pub gamma: f64,
}

/// Explicit thermal state imposed on the extracted skewers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalOverride {
    #[serde(rename = "T0")]
    pub t0: Kelvin,
    pub gamma: f64,
}

/// Everything the extractor needs to produce one skewer file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Directory with the raw snapshots (`<raw_dir>/output`).
    pub output_dir: Utf8PathBuf,
    pub snap_num: SnapNum,
    /// Skewers per side of the box.
    pub n_skewers: usize,
    /// Pixel width handed to the extractor, already shrunk by the resolution tweak.
    pub resolution_kms: KmPerS,
    /// Extraction axis (1, 2 or 3).
    pub axis: u8,
    pub savedir: Utf8PathBuf,
    pub savefile: String,
    /// H(z) in km/s/Mpc the extractor must use instead of its own.
    pub external_hz: f64,
    /// `None` keeps the native thermal state of the snapshot.
    pub thermal_override: Option<ThermalOverride>,
}

impl ExtractionRequest {
    /// Full path of the skewer file this request produces.
    pub fn output_path(&self) -> Utf8PathBuf {
        self.savedir.join(&self.savefile)
    }
}

/// A set of gridded skewers, possibly not computed yet.
pub trait GriddedSkewers {
    /// Mean transmitted flux; forces the computation of the skewers.
    fn mean_flux(&mut self) -> Result<f64, FluxPowerError>;

    /// Persist the skewers to the file named in the request.
    fn save_file(&mut self) -> Result<(), FluxPowerError>;
}

pub trait SpectrumExtractor {
    type Skewers: GriddedSkewers;

    fn extract(&self, request: &ExtractionRequest) -> Result<Self::Skewers, FluxPowerError>;
}

pub trait ThermalRelationFitter {
    fn fit_td_rel(
        &self,
        snap_num: SnapNum,
        output_dir: &Utf8Path,
    ) -> Result<ThermalFit, FluxPowerError>;
}
