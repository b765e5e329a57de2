//! # Nearest-grid-point emulator
//!
//! [`NearestGridPointEmulator`] answers every query with the archived P1D of the closest model,
//! linearly interpolated onto the requested wavenumbers. The archive is fixed at construction
//! and queries do not mutate the emulator.
//!
//! The search is a linear scan. When several entries are at the same distance the one with the
//! lowest archive index is returned.
//!
//! ## Example
//!
//! ```rust
//! use fluxpower::emulator::archive::ArchiveEntry;
//! use fluxpower::emulator::nearest_grid_point::{EmulatorConfig, NearestGridPointEmulator};
//! use fluxpower::emulator::EmulatorParams;
//!
//! let entry = |mf: f64| ArchiveEntry {
//!     params: EmulatorParams::from_pairs([("mF", mf)]).unwrap(),
//!     k_mpc: vec![0.1, 1.0],
//!     p1d_mpc: vec![mf, mf],
//! };
//! let emu = NearestGridPointEmulator::new(
//!     vec![entry(0.6), entry(0.7)],
//!     EmulatorConfig::default(),
//! )
//! .unwrap();
//!
//! let model = EmulatorParams::from_pairs([("mF", 0.68)]).unwrap();
//! assert_eq!(emu.emulate(&model, &[0.5]).unwrap(), vec![0.7]);
//! ```

use nalgebra::DMatrix;
use tracing::debug;

use crate::{
    emulator::{archive::ArchiveEntry, EmulatorParams},
    fluxpower_errors::FluxPowerError,
    interpolation::{linear_interp, Extrapolation},
};

/// Behaviour of the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EmulatorConfig {
    /// Policy for query wavenumbers outside the native grid of the nearest entry.
    pub extrapolation: Extrapolation,
    /// Log every query and the selected entry.
    pub verbose: bool,
}

impl EmulatorConfig {
    pub fn builder() -> EmulatorConfigBuilder {
        EmulatorConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmulatorConfigBuilder {
    config: EmulatorConfig,
}

impl EmulatorConfigBuilder {
    pub fn extrapolation(mut self, v: Extrapolation) -> Self {
        self.config.extrapolation = v;
        self
    }
    pub fn verbose(mut self, v: bool) -> Self {
        self.config.verbose = v;
        self
    }
    pub fn build(self) -> Result<EmulatorConfig, FluxPowerError> {
        Ok(self.config)
    }
}

#[derive(Debug, Clone)]
pub struct NearestGridPointEmulator {
    archive: Vec<ArchiveEntry>,
    config: EmulatorConfig,
}

impl NearestGridPointEmulator {
    /// Build the emulator over a non-empty archive.
    pub fn new(
        archive: Vec<ArchiveEntry>,
        config: EmulatorConfig,
    ) -> Result<Self, FluxPowerError> {
        if archive.is_empty() {
            return Err(FluxPowerError::ConfigurationError(
                "emulator archive is empty".into(),
            ));
        }
        for (i, entry) in archive.iter().enumerate() {
            entry.validate(i)?;
        }
        if config.verbose {
            debug!(n_entries = archive.len(), "nearest-grid-point emulator ready");
        }
        Ok(NearestGridPointEmulator { archive, config })
    }

    pub fn archive(&self) -> &[ArchiveEntry] {
        &self.archive
    }

    pub fn config(&self) -> EmulatorConfig {
        self.config
    }

    /// Distance from `model` to every archived entry, in archive order.
    pub fn get_distances(&self, model: &EmulatorParams) -> Vec<f64> {
        self.archive
            .iter()
            .map(|entry| model.distance(&entry.params))
            .collect()
    }

    /// Index of the archived entry closest to `model`.
    pub fn find_nearest_model(&self, model: &EmulatorParams) -> usize {
        let distances = self.get_distances(model);
        let mut nearest = 0;
        for (i, &d) in distances.iter().enumerate() {
            if d < distances[nearest] {
                nearest = i;
            }
        }
        nearest
    }

    /// Archived entry closest to `model`.
    pub fn get_nearest_model(&self, model: &EmulatorParams) -> &ArchiveEntry {
        let nearest = self.find_nearest_model(model);
        if self.config.verbose {
            debug!(nearest, params = ?self.archive[nearest].params, "nearest archive entry");
        }
        &self.archive[nearest]
    }

    /// P1D of the nearest model on `k_mpc`.
    ///
    /// Arguments
    /// -----------------
    /// * `model`: query point.
    /// * `k_mpc`: wavenumbers (1/Mpc) where the P1D is wanted.
    ///
    /// Return
    /// ----------
    /// * The linearly interpolated P1D; out-of-range wavenumbers follow
    ///   [`EmulatorConfig::extrapolation`].
    pub fn emulate(
        &self,
        model: &EmulatorParams,
        k_mpc: &[f64],
    ) -> Result<Vec<f64>, FluxPowerError> {
        if self.config.verbose {
            debug!(?model, "asked to emulate model");
        }
        let nearest = self.get_nearest_model(model);
        linear_interp(
            k_mpc,
            &nearest.k_mpc,
            &nearest.p1d_mpc,
            self.config.extrapolation,
        )
    }

    /// Same as [`emulate`](Self::emulate), with an all-zero covariance of matching size.
    pub fn emulate_with_covariance(
        &self,
        model: &EmulatorParams,
        k_mpc: &[f64],
    ) -> Result<(Vec<f64>, DMatrix<f64>), FluxPowerError> {
        let p1d = self.emulate(model, k_mpc)?;
        let n = p1d.len();
        Ok((p1d, DMatrix::zeros(n, n)))
    }
}
