//! Tabulated expansion history.
//!
//! A full background solver is an external dependency; its output can be exported once as a
//! two-column CSV table and replayed here:
//!
//! ```text
//! z,H_kms_Mpc
//! 0.0,67.0
//! 0.5,88.7
//! ...
//! ```
//!
//! Values between rows are obtained with a not-a-knot cubic spline. Redshifts outside the table
//! fail with [`FluxPowerError::RangeError`].

use camino::Utf8Path;
use serde::Deserialize;

use crate::{
    constants::Redshift, cosmology::HubbleEngine, fluxpower_errors::FluxPowerError,
    interpolation::CubicSpline,
};

#[derive(Debug, Deserialize)]
struct HubbleRow {
    z: f64,
    #[serde(rename = "H_kms_Mpc")]
    hubble: f64,
}

#[derive(Debug, Clone)]
pub struct TabulatedHubble {
    spline: CubicSpline,
}

impl TabulatedHubble {
    /// Build the engine from parallel arrays of redshift and H(z) (km/s/Mpc).
    pub fn from_table(z: &[f64], hubble: &[f64]) -> Result<Self, FluxPowerError> {
        Ok(TabulatedHubble {
            spline: CubicSpline::new(z, hubble)?,
        })
    }

    /// Read a `z,H_kms_Mpc` CSV file. Rows may appear in any order.
    pub fn from_csv(path: &Utf8Path) -> Result<Self, FluxPowerError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = reader
            .deserialize::<HubbleRow>()
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by(|a, b| a.z.total_cmp(&b.z));

        let (z, hubble): (Vec<f64>, Vec<f64>) = rows.iter().map(|r| (r.z, r.hubble)).unzip();
        Self::from_table(&z, &hubble)
    }
}

impl HubbleEngine for TabulatedHubble {
    fn hubble_parameter(&self, z: Redshift) -> Result<f64, FluxPowerError> {
        self.spline.eval(z)
    }
}
