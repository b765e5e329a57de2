//! # Thermal rescaling sweep
//!
//! For one snapshot, [`SkewerExtraction::run`] extracts one skewer file per `(scale_T0,
//! scale_gamma)` pair and writes a single [`SnapshotInfo`] describing all of them.
//!
//! ## Pipeline
//!
//! 1. The snapshot redshift `z` and `dv/dX(z)` come from the simulation parameters
//!    ([`dkms_dmpc_z`]); the velocity width of a cell is `width_kms = width_Mpc · dv/dX` and the
//!    extractor is forced to use `H(z) = dv/dX · (1 + z)`.
//! 2. The temperature-density relation `(T0_ini, γ_ini)` is fitted **once** and the resulting
//!    [`ThermalFit`] is handed to every rescaling.
//! 3. Rescalings run sequentially, outer loop on `scale_T0`, inner loop on `scale_gamma`. The pair
//!    `(1, 1)` keeps the native thermal state; any other pair imposes
//!    `(T0_ini · scale_T0, γ_ini · scale_gamma)`.
//! 4. Each skewer set is computed and saved exactly once; its mean flux, thermal state and
//!    comoving thermal-broadening length are appended to the sidecar.
//!
//! Extractor failures are propagated as they are. Files already written are left on disk.
//!
//! ## Example
//!
//! ```rust,no_run
//! use camino::Utf8Path;
//! use fluxpower::sim_params::GadgetParamFile;
//! use fluxpower::skewers::command_bridge::CommandExtractor;
//! use fluxpower::skewers::orchestrator::{ExtractionParams, SkewerExtraction};
//!
//! let raw_dir = Utf8Path::new("/sims/L10_N512");
//! let params = GadgetParamFile::read(&raw_dir.join("paramfile.gadget")).unwrap();
//! let bridge = CommandExtractor::from_command_line("python3 bridge.py").unwrap();
//!
//! let extraction = SkewerExtraction {
//!     raw_dir,
//!     post_dir: Utf8Path::new("/sims/L10_N512/post"),
//!     sim_params: &params,
//!     hubble_engine: None,
//!     fitter: &bridge,
//!     extractor: &bridge,
//! };
//! let config = ExtractionParams::builder()
//!     .n_skewers(50)
//!     .scales_t0(vec![0.8, 1.0, 1.2])
//!     .build()
//!     .unwrap();
//! let info = extraction.run(4, &config).unwrap();
//! println!("{} files", info.n_rescalings());
//! ```

use std::cmp::Ordering;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use camino::Utf8Path;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::{
    constants::{Mpc, SnapNum, RESOLUTION_TWEAK},
    cosmology::HubbleEngine,
    fluxpower_errors::FluxPowerError,
    sim_params::{dkms_dmpc_z, SnapshotParameters},
    skewers::{
        extractor::{
            ExtractionRequest, GriddedSkewers, SpectrumExtractor, ThermalFit, ThermalOverride,
            ThermalRelationFitter,
        },
        skewers_dir, skewers_filename, snapshot_json_filename,
        snapshot_info::SnapshotInfo,
    },
    thermal::thermal_broadening_mpc,
};

/// Axis used by the extractor when none is requested.
pub const DEFAULT_AXIS: u8 = 1;

/// Resolution and rescaling grid of one extraction run.
///
/// Defaults
/// -----------------
/// * `n_skewers`: 50
/// * `width_mpc`: 0.1
/// * `axis`: `None` (extractor default, files under `skewers/`)
/// * `scales_t0`, `scales_gamma`: `[1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionParams {
    /// Skewers per side of the box.
    pub n_skewers: usize,
    /// Cell width in comoving Mpc.
    pub width_mpc: Mpc,
    pub axis: Option<u8>,
    pub scales_t0: Vec<f64>,
    pub scales_gamma: Vec<f64>,
}

impl ExtractionParams {
    pub fn builder() -> ExtractionParamsBuilder {
        ExtractionParamsBuilder::new()
    }

    /// Check the parameters.
    ///
    /// Validation rules
    /// -----------------
    /// * `axis` ∈ {1, 2, 3} when set, otherwise [`FluxPowerError::ConfigurationError`].
    /// * `n_skewers > 0`, `width_mpc > 0`.
    /// * both scale lists non-empty with strictly positive entries.
    pub fn validate(&self) -> Result<(), FluxPowerError> {
        if let Some(axis) = self.axis {
            if !(1..=3).contains(&axis) {
                return Err(FluxPowerError::ConfigurationError(format!(
                    "axis must be 1, 2 or 3, got {axis}"
                )));
            }
        }
        if self.n_skewers == 0 {
            return Err(FluxPowerError::InvalidExtractionParameter(
                "n_skewers must be > 0".into(),
            ));
        }
        if !gt0(self.width_mpc) {
            return Err(FluxPowerError::InvalidExtractionParameter(
                "width_Mpc must be > 0".into(),
            ));
        }
        let lists = [
            ("scales_T0", &self.scales_t0),
            ("scales_gamma", &self.scales_gamma),
        ];
        for (name, scales) in lists {
            if scales.is_empty() {
                return Err(FluxPowerError::InvalidExtractionParameter(format!(
                    "{name} must not be empty"
                )));
            }
            if !scales.iter().all(|&s| gt0(s)) {
                return Err(FluxPowerError::InvalidExtractionParameter(format!(
                    "{name} must contain positive values"
                )));
            }
        }
        Ok(())
    }

    /// Every `(scale_T0, scale_gamma)` pair, outer loop on `scale_T0`.
    pub fn rescalings(&self) -> Vec<(f64, f64)> {
        self.scales_t0
            .iter()
            .copied()
            .cartesian_product(self.scales_gamma.iter().copied())
            .collect()
    }
}

impl Default for ExtractionParams {
    fn default() -> Self {
        ExtractionParams {
            n_skewers: 50,
            width_mpc: 0.1,
            axis: None,
            scales_t0: vec![1.0],
            scales_gamma: vec![1.0],
        }
    }
}

/// Builder for [`ExtractionParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct ExtractionParamsBuilder {
    params: ExtractionParams,
}

impl ExtractionParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_skewers(mut self, v: usize) -> Self {
        self.params.n_skewers = v;
        self
    }
    pub fn width_mpc(mut self, v: Mpc) -> Self {
        self.params.width_mpc = v;
        self
    }
    pub fn axis(mut self, v: Option<u8>) -> Self {
        self.params.axis = v;
        self
    }
    pub fn scales_t0(mut self, v: Vec<f64>) -> Self {
        self.params.scales_t0 = v;
        self
    }
    pub fn scales_gamma(mut self, v: Vec<f64>) -> Self {
        self.params.scales_gamma = v;
        self
    }

    /// Finalize the builder; see [`ExtractionParams::validate`].
    pub fn build(self) -> Result<ExtractionParams, FluxPowerError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// Everything needed to extract the skewers of one simulation.
pub struct SkewerExtraction<'a, E, F> {
    /// Simulation directory; raw snapshots live under `<raw_dir>/output`.
    pub raw_dir: &'a Utf8Path,
    pub post_dir: &'a Utf8Path,
    pub sim_params: &'a dyn SnapshotParameters,
    /// Full cosmology engine; `None` selects the analytic expansion rate.
    pub hubble_engine: Option<Arc<dyn HubbleEngine>>,
    pub fitter: &'a F,
    pub extractor: &'a E,
}

impl<E, F> SkewerExtraction<'_, E, F>
where
    E: SpectrumExtractor,
    F: ThermalRelationFitter,
{
    /// Extract every rescaling of one snapshot and write its sidecar.
    ///
    /// Arguments
    /// -----------------
    /// * `snap_num`: snapshot index in the simulation output list.
    /// * `params`: validated resolution and rescaling grid.
    ///
    /// Return
    /// ----------
    /// * The [`SnapshotInfo`] that was written to
    ///   `<post_dir>/skewers[_<axis>]/snap_skewers_<snap>_Ns<n>_wM<width>.json`.
    ///
    /// Errors
    /// ----------
    /// * [`FluxPowerError::ConfigurationError`] for an invalid axis or if H(z) cannot be derived
    ///   for the snapshot.
    /// * [`FluxPowerError::InvalidExtractionParameter`] for invalid resolution or scales.
    /// * Any error of the fitter or extractor, unchanged.
    pub fn run(
        &self,
        snap_num: SnapNum,
        params: &ExtractionParams,
    ) -> Result<SnapshotInfo, FluxPowerError> {
        params.validate()?;
        let (dkms_dmpc, z) = dkms_dmpc_z(self.sim_params, snap_num, self.hubble_engine.clone())?;
        let width_kms = params.width_mpc * dkms_dmpc;
        let hz = dkms_dmpc * (1.0 + z);
        if !hz.is_finite() || hz <= 0.0 {
            return Err(FluxPowerError::ConfigurationError(format!(
                "no valid H(z) for snapshot {snap_num} (got {hz})"
            )));
        }
        info!(snap_num, z, width_kms, hz, "starting skewer extraction");

        let output_dir = self.raw_dir.join("output");
        let start = Instant::now();
        let fit = self.fitter.fit_td_rel(snap_num, &output_dir)?;
        info!(
            t0 = fit.t0,
            gamma = fit.gamma,
            elapsed_s = start.elapsed().as_secs_f64(),
            "fitted temperature-density relation"
        );

        let savedir = skewers_dir(self.post_dir, params.axis);
        fs::create_dir_all(&savedir)?;

        let mut info = SnapshotInfo {
            raw_dir: self.raw_dir.to_owned(),
            post_dir: self.post_dir.to_owned(),
            axis: params.axis,
            z,
            snap_num,
            n_skewers: params.n_skewers,
            width_mpc: params.width_mpc,
            width_kms,
            t0_ini: fit.t0,
            gamma_ini: fit.gamma,
            scales_t0: params.scales_t0.clone(),
            scales_gamma: params.scales_gamma.clone(),
            sim_t0: Vec::new(),
            sim_gamma: Vec::new(),
            sim_mf: Vec::new(),
            sim_sigt_mpc: Vec::new(),
            sim_scale_t0: Vec::new(),
            sim_scale_gamma: Vec::new(),
            sk_files: Vec::new(),
            snapshot_filename: snapshot_json_filename(
                snap_num,
                params.n_skewers,
                params.width_mpc,
            ),
        };

        for (scale_t0, scale_gamma) in params.rescalings() {
            let start = Instant::now();
            let savefile = skewers_filename(
                snap_num,
                params.n_skewers,
                params.width_mpc,
                Some(scale_t0),
                Some(scale_gamma),
            );
            let request = ExtractionRequest {
                output_dir: output_dir.clone(),
                snap_num,
                n_skewers: params.n_skewers,
                resolution_kms: width_kms * RESOLUTION_TWEAK,
                axis: params.axis.unwrap_or(DEFAULT_AXIS),
                savedir: savedir.clone(),
                savefile,
                external_hz: hz,
                thermal_override: thermal_override(&fit, scale_t0, scale_gamma),
            };

            let path = request.output_path();
            if path.exists() {
                warn!(%path, "skewer file already exists, extracting again");
            }

            let mut skewers = self.extractor.extract(&request)?;
            let mean_flux = skewers.mean_flux()?;
            skewers.save_file()?;

            let (t0, gamma) = match request.thermal_override {
                Some(over) => (over.t0, over.gamma),
                None => (fit.t0, fit.gamma),
            };
            let sigt_mpc = thermal_broadening_mpc(t0, dkms_dmpc);
            debug!(
                scale_t0,
                scale_gamma,
                t0,
                gamma,
                mean_flux,
                sigt_mpc,
                elapsed_s = start.elapsed().as_secs_f64(),
                "extracted rescaling"
            );

            info.sim_t0.push(t0);
            info.sim_gamma.push(gamma);
            info.sim_mf.push(mean_flux);
            info.sim_sigt_mpc.push(sigt_mpc);
            info.sim_scale_t0.push(scale_t0);
            info.sim_scale_gamma.push(scale_gamma);
            info.sk_files.push(request.savefile);
        }

        let path = info.write(&savedir)?;
        info!(%path, n_files = info.n_rescalings(), "wrote snapshot sidecar");
        Ok(info)
    }
}

/// Parse a comma-separated list of scales such as `"0.8, 1.0, 1.2"`.
///
/// `flag` names the option in the error message.
pub fn parse_scales(flag: &str, raw: &str) -> Result<Vec<f64>, FluxPowerError> {
    raw.split(',')
        .map(str::trim)
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                FluxPowerError::InvalidExtractionParameter(format!("{flag}: not a number: {s:?}"))
            })
        })
        .collect()
}

/// True iff `x > 0` (NaN is rejected).
fn gt0(x: f64) -> bool {
    x.partial_cmp(&0.0) == Some(Ordering::Greater)
}

/// Thermal state to impose for one rescaling; `None` keeps the native one.
fn thermal_override(fit: &ThermalFit, scale_t0: f64, scale_gamma: f64) -> Option<ThermalOverride> {
    if scale_t0 == 1.0 && scale_gamma == 1.0 {
        None
    } else {
        Some(ThermalOverride {
            t0: fit.t0 * scale_t0,
            gamma: fit.gamma * scale_gamma,
        })
    }
}
