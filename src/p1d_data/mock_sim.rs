//! # Mock P1D measurements from simulations
//!
//! Turns the P1D measured in a simulation (comoving units, native k-grid) into a mock
//! observation: velocity units, the k-grid of an observational dataset and that dataset's
//! covariance.
//!
//! ## Unit conversion
//!
//! With `c(z) = H(z) / (1 + z)` in km/s/Mpc,
//!
//! ```text
//! k_Mpc = k_kms · c(z)
//! P_kms(k_kms) = c(z) · P_Mpc(k_kms · c(z))
//! ```
//!
//! `P_Mpc` is evaluated with a not-a-knot cubic spline through the native bins, the `k = 0` bin
//! excluded. Requesting a wavenumber outside the native range is a
//! [`FluxPowerError::RangeError`].
//!
//! ## Low-k cull
//!
//! The smallest wavenumber a simulation resolves is its first non-zero native bin, converted to
//! velocity units at the **lowest** simulated redshift. All reference wavenumbers below it are
//! dropped, and the same number of leading rows and columns is removed from every covariance,
//! so all redshifts share one k-grid.
//!
//! ## Covariance
//!
//! Each redshift takes the covariance of the closest reference bin (lowest index on a tie),
//! multiplied by `data_cov_factor`.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    constants::Redshift,
    cosmology::{CosmologyRate, HubbleEngine, SimCosmology},
    fluxpower_errors::FluxPowerError,
    interpolation::CubicSpline,
    p1d_data::{
        reference::{CovarianceLabel, ReferenceDataset},
        P1DData, P1DRecord,
    },
};

/// P1D measured in one simulation for one skewer extraction, per redshift.
///
/// Stored as `<basedir>/<sim_label>/<skewers_label>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationP1D {
    pub zs: Vec<Redshift>,
    /// Native wavenumbers in 1/Mpc, one grid per redshift, starting at `k = 0`.
    #[serde(rename = "k_Mpc")]
    pub k_mpc: Vec<Vec<f64>>,
    /// Power in Mpc on the matching grid.
    #[serde(rename = "p1d_Mpc")]
    pub p1d_mpc: Vec<Vec<f64>>,
    pub cosmology: SimCosmology,
}

impl SimulationP1D {
    pub fn path(basedir: &Utf8Path, sim_label: &str, skewers_label: &str) -> Utf8PathBuf {
        basedir.join(sim_label).join(format!("{skewers_label}.json"))
    }

    pub fn read(path: &Utf8Path) -> Result<Self, FluxPowerError> {
        let reader = BufReader::new(File::open(path)?);
        let sim: SimulationP1D = serde_json::from_reader(reader)?;
        sim.validate()?;
        Ok(sim)
    }

    fn validate(&self) -> Result<(), FluxPowerError> {
        if self.zs.is_empty() {
            return Err(FluxPowerError::InconsistentData(
                "simulation P1D has no redshift".into(),
            ));
        }
        if self.k_mpc.len() != self.zs.len() || self.p1d_mpc.len() != self.zs.len() {
            return Err(FluxPowerError::InconsistentData(format!(
                "{} redshifts, {} k grids, {} P1D arrays",
                self.zs.len(),
                self.k_mpc.len(),
                self.p1d_mpc.len()
            )));
        }
        for (iz, (k, p)) in self.k_mpc.iter().zip(&self.p1d_mpc).enumerate() {
            if k.len() != p.len() || k.len() < 2 {
                return Err(FluxPowerError::InconsistentData(format!(
                    "redshift bin {iz}: {} wavenumbers for {} powers",
                    k.len(),
                    p.len()
                )));
            }
        }
        Ok(())
    }

    /// Index of the lowest simulated redshift.
    fn lowest_z_index(&self) -> usize {
        let mut best = 0;
        for (i, &z) in self.zs.iter().enumerate() {
            if z < self.zs[best] {
                best = i;
            }
        }
        best
    }
}

/// Which simulation to mock, with which covariance, at which redshifts.
#[derive(Debug, Clone, PartialEq)]
pub struct MockP1DParams {
    /// Directory of the simulation suite.
    pub basedir: Utf8PathBuf,
    pub sim_label: String,
    /// Skewer extraction, e.g. `Ns500_wM0.05`.
    pub skewers_label: String,
    /// Directory holding the reference covariance tables.
    pub data_dir: Utf8PathBuf,
    pub data_cov_label: CovarianceLabel,
    pub data_cov_factor: f64,
    pub zmin: Option<Redshift>,
    pub zmax: Option<Redshift>,
    pub z_list: Option<Vec<Redshift>>,
}

impl MockP1DParams {
    /// Start a builder from the required paths and labels.
    ///
    /// Defaults
    /// -----------------
    /// * `data_cov_label`: `Chabanier2019`
    /// * `data_cov_factor`: 1.0
    /// * no redshift filter
    pub fn builder(
        basedir: impl Into<Utf8PathBuf>,
        sim_label: impl Into<String>,
        skewers_label: impl Into<String>,
        data_dir: impl Into<Utf8PathBuf>,
    ) -> MockP1DParamsBuilder {
        MockP1DParamsBuilder {
            basedir: basedir.into(),
            sim_label: sim_label.into(),
            skewers_label: skewers_label.into(),
            data_dir: data_dir.into(),
            data_cov_label: CovarianceLabel::Chabanier2019.to_string(),
            data_cov_factor: 1.0,
            zmin: None,
            zmax: None,
            z_list: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockP1DParamsBuilder {
    basedir: Utf8PathBuf,
    sim_label: String,
    skewers_label: String,
    data_dir: Utf8PathBuf,
    data_cov_label: String,
    data_cov_factor: f64,
    zmin: Option<Redshift>,
    zmax: Option<Redshift>,
    z_list: Option<Vec<Redshift>>,
}

impl MockP1DParamsBuilder {
    pub fn data_cov_label(mut self, v: impl Into<String>) -> Self {
        self.data_cov_label = v.into();
        self
    }
    pub fn data_cov_factor(mut self, v: f64) -> Self {
        self.data_cov_factor = v;
        self
    }
    pub fn zmin(mut self, v: Redshift) -> Self {
        self.zmin = Some(v);
        self
    }
    pub fn zmax(mut self, v: Redshift) -> Self {
        self.zmax = Some(v);
        self
    }
    pub fn z_list(mut self, v: Vec<Redshift>) -> Self {
        self.z_list = Some(v);
        self
    }

    /// Finalize the builder.
    ///
    /// Errors
    /// ----------
    /// * [`FluxPowerError::ConfigurationError`] for an unknown covariance label, a non-positive
    ///   covariance factor or `zmin > zmax`.
    pub fn build(self) -> Result<MockP1DParams, FluxPowerError> {
        let data_cov_label = self.data_cov_label.parse()?;
        if self.data_cov_factor.is_nan() || self.data_cov_factor <= 0.0 {
            return Err(FluxPowerError::ConfigurationError(format!(
                "data_cov_factor must be > 0, got {}",
                self.data_cov_factor
            )));
        }
        if let (Some(zmin), Some(zmax)) = (self.zmin, self.zmax) {
            if zmin > zmax {
                return Err(FluxPowerError::ConfigurationError(format!(
                    "zmin ({zmin}) is above zmax ({zmax})"
                )));
            }
        }
        Ok(MockP1DParams {
            basedir: self.basedir,
            sim_label: self.sim_label,
            skewers_label: self.skewers_label,
            data_dir: self.data_dir,
            data_cov_label,
            data_cov_factor: self.data_cov_factor,
            zmin: self.zmin,
            zmax: self.zmax,
            z_list: self.z_list,
        })
    }
}

/// Build a mock measurement from files on disk.
///
/// Arguments
/// -----------------
/// * `params`: simulation, covariance dataset and redshift filter.
/// * `engine`: optional full cosmology engine for the simulation; the analytic expansion rate is
///   used otherwise.
///
/// Return
/// ----------
/// * One record per retained simulated redshift, all on the culled reference k-grid.
pub fn load_mock_p1d(
    params: &MockP1DParams,
    engine: Option<Arc<dyn HubbleEngine>>,
) -> Result<P1DData, FluxPowerError> {
    let reference = ReferenceDataset::load(params.data_cov_label, &params.data_dir)?;
    let sim_path = SimulationP1D::path(&params.basedir, &params.sim_label, &params.skewers_label);
    let sim = SimulationP1D::read(&sim_path)?;
    info!(%sim_path, covariance = %params.data_cov_label, "loading mock P1D");

    let rate = CosmologyRate::new(sim.cosmology, engine);
    let mut data = mock_p1d(&reference, &sim, &rate, params.data_cov_factor)?;

    if params.zmin.is_some() || params.zmax.is_some() {
        data = data.drop_zbins(params.zmin, params.zmax);
    }
    if let Some(z_list) = &params.z_list {
        data = data.select_zs(z_list);
    }
    Ok(data)
}

/// Convert simulated P1D to velocity units on the reference k-grid.
///
/// Arguments
/// -----------------
/// * `reference`: dataset providing the k-grid and covariances.
/// * `sim`: native simulated P1D.
/// * `rate`: expansion rate of the simulation cosmology.
/// * `cov_factor`: multiplies every covariance matrix.
pub fn mock_p1d(
    reference: &ReferenceDataset,
    sim: &SimulationP1D,
    rate: &CosmologyRate,
    cov_factor: f64,
) -> Result<P1DData, FluxPowerError> {
    sim.validate()?;

    let iz_min = sim.lowest_z_index();
    let dkms_dmpc_zmin = rate.dkms_dmpc_at(sim.zs[iz_min])?;
    let k_min_kms = sim.k_mpc[0][1] / dkms_dmpc_zmin;

    let n_cull = reference.k().iter().filter(|&&k| k < k_min_kms).count();
    let k = reference.k()[n_cull..].to_vec();
    let n = k.len();
    debug!(k_min_kms, n_cull, n_kept = n, "culled low-k reference bins");

    let records = sim
        .zs
        .iter()
        .enumerate()
        .map(|(iz, &z)| {
            let k_mpc = &sim.k_mpc[iz][1..];
            let p1d_mpc = &sim.p1d_mpc[iz][1..];
            let conversion = rate.dkms_dmpc_at(z)?;

            let spline = CubicSpline::new(k_mpc, p1d_mpc)?;
            let k_interp: Vec<f64> = k.iter().map(|&kk| kk * conversion).collect();
            let pk = spline
                .eval_many(&k_interp)?
                .into_iter()
                .map(|p| p * conversion)
                .collect();

            let iz_data = reference.nearest_z_index(z);
            let full_cov = reference.cov(iz_data).ok_or_else(|| {
                FluxPowerError::InconsistentData(format!("no covariance for bin {iz_data}"))
            })?;
            let cov = full_cov.view((n_cull, n_cull), (n, n)).into_owned() * cov_factor;

            P1DRecord::new(z, k.clone(), pk, cov)
        })
        .collect::<Result<Vec<_>, FluxPowerError>>()?;

    P1DData::new(records)
}
