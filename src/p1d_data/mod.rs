//! # P1D measurements
//!
//! A [`P1DData`] is a set of per-redshift [`P1DRecord`]s sharing one velocity-unit k-grid, in the
//! shape of an observational measurement: power `Pk(k)` and its covariance at each redshift.
//!
//! ## Submodules
//!
//! * [`reference`] – observational datasets used only for their k-grid and covariance.
//! * [`mock_sim`] – mock measurements built from simulated P1D.
//!
//! ## Redshift selection
//!
//! * [`P1DData::drop_zbins`] keeps the records with `zmin ≤ z ≤ zmax`.
//! * [`P1DData::select_zs`] maps every requested redshift to the closest available one (the
//!   lowest index wins a tie), collapses duplicates and keeps the original order.

pub mod mock_sim;
pub mod reference;

use std::collections::BTreeSet;

use itertools::Itertools;
use nalgebra::DMatrix;

use crate::{constants::Redshift, fluxpower_errors::FluxPowerError};

/// Power spectrum and covariance at one redshift, in velocity units.
#[derive(Debug, Clone, PartialEq)]
pub struct P1DRecord {
    pub z: Redshift,
    /// Wavenumbers in s/km, ascending.
    pub k: Vec<f64>,
    /// Power in km/s.
    pub pk: Vec<f64>,
    pub cov: DMatrix<f64>,
}

impl P1DRecord {
    /// Build a record, checking that `k`, `pk` and `cov` are aligned.
    pub fn new(
        z: Redshift,
        k: Vec<f64>,
        pk: Vec<f64>,
        cov: DMatrix<f64>,
    ) -> Result<Self, FluxPowerError> {
        let n = k.len();
        if pk.len() != n || cov.nrows() != n || cov.ncols() != n {
            return Err(FluxPowerError::InconsistentData(format!(
                "record at z = {z}: {n} wavenumbers, {} powers, {}x{} covariance",
                pk.len(),
                cov.nrows(),
                cov.ncols()
            )));
        }
        Ok(P1DRecord { z, k, pk, cov })
    }
}

/// Per-redshift P1D records sharing one k-grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct P1DData {
    records: Vec<P1DRecord>,
}

impl P1DData {
    /// Wrap a list of records; they must all share the same k-grid.
    pub fn new(records: Vec<P1DRecord>) -> Result<Self, FluxPowerError> {
        if let Some(first) = records.first() {
            if records.iter().any(|r| r.k != first.k) {
                return Err(FluxPowerError::InconsistentData(
                    "P1D records do not share the same k-grid".into(),
                ));
            }
        }
        Ok(P1DData { records })
    }

    pub fn records(&self) -> &[P1DRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Redshift of every record.
    pub fn z(&self) -> Vec<Redshift> {
        self.records.iter().map(|r| r.z).collect()
    }

    /// Shared k-grid (empty when there is no record).
    pub fn k(&self) -> &[f64] {
        self.records.first().map(|r| r.k.as_slice()).unwrap_or(&[])
    }

    pub fn pk(&self, iz: usize) -> Option<&[f64]> {
        self.records.get(iz).map(|r| r.pk.as_slice())
    }

    pub fn cov(&self, iz: usize) -> Option<&DMatrix<f64>> {
        self.records.get(iz).map(|r| &r.cov)
    }

    /// Keep only the records with `zmin ≤ z ≤ zmax`; a missing bound is not applied.
    pub fn drop_zbins(self, zmin: Option<Redshift>, zmax: Option<Redshift>) -> Self {
        let records = self
            .records
            .into_iter()
            .filter(|r| zmin.map_or(true, |zmin| r.z >= zmin))
            .filter(|r| zmax.map_or(true, |zmax| r.z <= zmax))
            .collect();
        P1DData { records }
    }

    /// Keep the records closest to each of `z_list`, without duplicates, in their original order.
    pub fn select_zs(self, z_list: &[Redshift]) -> Self {
        let selected: BTreeSet<usize> = z_list
            .iter()
            .filter_map(|&target| {
                self.records
                    .iter()
                    .position_min_by(|a, b| (a.z - target).abs().total_cmp(&(b.z - target).abs()))
            })
            .collect();

        let records = self
            .records
            .into_iter()
            .enumerate()
            .filter(|(i, _)| selected.contains(i))
            .map(|(_, r)| r)
            .collect();
        P1DData { records }
    }
}
