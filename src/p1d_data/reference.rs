//! # Observational reference datasets
//!
//! Mock measurements borrow the k-grid and per-redshift covariance of a published P1D
//! measurement. Two datasets are known, selected by [`CovarianceLabel`]:
//!
//! | Label           | Measurement                                   |
//! |-----------------|-----------------------------------------------|
//! | `Chabanier2019` | eBOSS DR14 (Chabanier et al. 2019)            |
//! | `PD2013`        | BOSS DR9 (Palanque-Delabrouille et al. 2013)  |
//!
//! ## Table format
//!
//! Each dataset is a CSV file `<data_dir>/<label>.csv` in long format, one covariance element per
//! row:
//!
//! ```text
//! z,i,j,k,cov
//! 2.2,0,0,0.00108,1.52e-2
//! 2.2,0,1,0.00108,3.1e-3
//! ...
//! ```
//!
//! `k` (s/km) is the wavenumber of row index `i`. Every redshift must provide the full `n × n`
//! matrix on the same k-grid.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::DMatrix;
use serde::Deserialize;

use crate::{
    constants::{Redshift, EPS},
    fluxpower_errors::FluxPowerError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CovarianceLabel {
    Chabanier2019,
    PD2013,
}

impl CovarianceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CovarianceLabel::Chabanier2019 => "Chabanier2019",
            CovarianceLabel::PD2013 => "PD2013",
        }
    }

    /// Location of the dataset table under `data_dir`.
    pub fn table_path(&self, data_dir: &Utf8Path) -> Utf8PathBuf {
        data_dir.join(format!("{}.csv", self.as_str()))
    }
}

impl fmt::Display for CovarianceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CovarianceLabel {
    type Err = FluxPowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Chabanier2019" => Ok(CovarianceLabel::Chabanier2019),
            "PD2013" => Ok(CovarianceLabel::PD2013),
            other => Err(FluxPowerError::ConfigurationError(format!(
                "unknown covariance label {other:?} (expected Chabanier2019 or PD2013)"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CovarianceRow {
    z: f64,
    i: usize,
    j: usize,
    k: f64,
    cov: f64,
}

/// k-grid and covariance matrices of an observational P1D measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDataset {
    label: CovarianceLabel,
    z: Vec<Redshift>,
    k: Vec<f64>,
    cov: Vec<DMatrix<f64>>,
}

impl ReferenceDataset {
    /// Assemble a dataset from its parts.
    ///
    /// `k` must be strictly increasing and every matrix `k.len() × k.len()`.
    pub fn from_parts(
        label: CovarianceLabel,
        z: Vec<Redshift>,
        k: Vec<f64>,
        cov: Vec<DMatrix<f64>>,
    ) -> Result<Self, FluxPowerError> {
        let n = k.len();
        if z.is_empty() || z.len() != cov.len() {
            return Err(FluxPowerError::InconsistentData(format!(
                "{label}: {} redshifts for {} covariance matrices",
                z.len(),
                cov.len()
            )));
        }
        if k.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FluxPowerError::InconsistentData(format!(
                "{label}: k-grid must be strictly increasing"
            )));
        }
        if cov.iter().any(|c| c.nrows() != n || c.ncols() != n) {
            return Err(FluxPowerError::InconsistentData(format!(
                "{label}: covariance matrices must be {n}x{n}"
            )));
        }
        Ok(ReferenceDataset { label, z, k, cov })
    }

    /// Load `<data_dir>/<label>.csv`.
    pub fn load(label: CovarianceLabel, data_dir: &Utf8Path) -> Result<Self, FluxPowerError> {
        let path = label.table_path(data_dir);
        let mut reader = csv::Reader::from_path(&path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<CovarianceRow>, csv::Error>>()?;
        Self::from_rows(label, &rows)
    }

    fn from_rows(label: CovarianceLabel, rows: &[CovarianceRow]) -> Result<Self, FluxPowerError> {
        let n = rows.iter().map(|r| r.i.max(r.j) + 1).max().unwrap_or(0);

        let mut z: Vec<Redshift> = Vec::new();
        for row in rows {
            if !z.iter().any(|&zz| (zz - row.z).abs() < EPS) {
                z.push(row.z);
            }
        }
        z.sort_by(f64::total_cmp);

        let mut k = vec![f64::NAN; n];
        let mut cov = vec![DMatrix::<f64>::zeros(n, n); z.len()];
        // one flag per (z, i, j) cell
        let mut filled = vec![vec![false; n * n]; z.len()];
        for row in rows {
            let iz = z
                .iter()
                .position(|&zz| (zz - row.z).abs() < EPS)
                .unwrap_or_default();
            if k[row.i].is_nan() {
                k[row.i] = row.k;
            } else if (k[row.i] - row.k).abs() > EPS * k[row.i].abs().max(1.0) {
                return Err(FluxPowerError::InconsistentData(format!(
                    "{label}: row index {} has wavenumbers {} and {}",
                    row.i, k[row.i], row.k
                )));
            }
            let cell = &mut filled[iz][row.i * n + row.j];
            if *cell {
                return Err(FluxPowerError::InconsistentData(format!(
                    "{label}: covariance at z = {} has entry ({}, {}) twice",
                    z[iz], row.i, row.j
                )));
            }
            *cell = true;
            cov[iz][(row.i, row.j)] = row.cov;
        }

        for (iz, cells) in filled.iter().enumerate() {
            if let Some(missing) = cells.iter().position(|&set| !set) {
                return Err(FluxPowerError::InconsistentData(format!(
                    "{label}: covariance at z = {} is missing entry ({}, {})",
                    z[iz],
                    missing / n,
                    missing % n
                )));
            }
        }

        Self::from_parts(label, z, k, cov)
    }

    pub fn label(&self) -> CovarianceLabel {
        self.label
    }

    /// Redshift bins, ascending.
    pub fn z(&self) -> &[Redshift] {
        &self.z
    }

    /// Wavenumbers in s/km, ascending.
    pub fn k(&self) -> &[f64] {
        &self.k
    }

    pub fn cov(&self, iz: usize) -> Option<&DMatrix<f64>> {
        self.cov.get(iz)
    }

    /// Index of the redshift bin closest to `z`; the lower index wins a tie.
    pub fn nearest_z_index(&self, z: Redshift) -> usize {
        let mut best = 0;
        for (i, &zi) in self.z.iter().enumerate() {
            if (zi - z).abs() < (self.z[best] - z).abs() {
                best = i;
            }
        }
        best
    }
}
