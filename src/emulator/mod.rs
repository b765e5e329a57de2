//! # Nearest-grid-point P1D emulator
//!
//! The emulator predicts the P1D of a model by returning the P1D of the closest simulated model
//! in an archive. Models are points in the space spanned by eight physical summary parameters;
//! closeness is a weighted squared Euclidean distance.
//!
//! ## Parameters and weights
//!
//! | Name       | Meaning                                        | Weight |
//! |------------|------------------------------------------------|--------|
//! | `mF`       | mean transmitted flux                          | 0.01   |
//! | `kF_Mpc`   | gas filtering wavenumber (1/Mpc)               | 0.1    |
//! | `sigT_Mpc` | thermal broadening length (Mpc)                | 0.02   |
//! | `gamma`    | slope of the temperature-density relation      | 0.02   |
//! | `Delta2_p` | linear power amplitude at the pivot            | 0.01   |
//! | `n_p`      | linear power slope at the pivot                | 0.01   |
//! | `alpha_p`  | linear power running at the pivot              | 0.01   |
//! | `f_p`      | logarithmic growth rate at the pivot           | 0.005  |
//!
//! ```text
//! d(m1, m2) = Σ_k ((m1[k] − m2[k]) / w[k])²
//! ```
//!
//! the sum running over the parameters set in **both** models.
//!
//! ## Submodules
//!
//! * [`archive`] – archive entries and their JSON loader.
//! * [`nearest_grid_point`] – the emulator itself.

pub mod archive;
pub mod nearest_grid_point;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fluxpower_errors::FluxPowerError;

/// One of the emulator input coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    MeanFlux,
    KfMpc,
    SigTMpc,
    Gamma,
    Delta2P,
    NP,
    AlphaP,
    FP,
}

impl ParamName {
    pub const ALL: [ParamName; 8] = [
        ParamName::MeanFlux,
        ParamName::KfMpc,
        ParamName::SigTMpc,
        ParamName::Gamma,
        ParamName::Delta2P,
        ParamName::NP,
        ParamName::AlphaP,
        ParamName::FP,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::MeanFlux => "mF",
            ParamName::KfMpc => "kF_Mpc",
            ParamName::SigTMpc => "sigT_Mpc",
            ParamName::Gamma => "gamma",
            ParamName::Delta2P => "Delta2_p",
            ParamName::NP => "n_p",
            ParamName::AlphaP => "alpha_p",
            ParamName::FP => "f_p",
        }
    }

    /// Typical uncertainty of the parameter, used to normalise distances.
    pub fn weight(&self) -> f64 {
        match self {
            ParamName::MeanFlux => 0.01,
            ParamName::KfMpc => 0.1,
            ParamName::SigTMpc => 0.02,
            ParamName::Gamma => 0.02,
            ParamName::Delta2P => 0.01,
            ParamName::NP => 0.01,
            ParamName::AlphaP => 0.01,
            ParamName::FP => 0.005,
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = FluxPowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| FluxPowerError::UnknownParameter(s.to_string()))
    }
}

/// A point in emulator parameter space; unset coordinates are ignored by the metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmulatorParams {
    #[serde(rename = "mF", default, skip_serializing_if = "Option::is_none")]
    pub mean_flux: Option<f64>,
    #[serde(rename = "kF_Mpc", default, skip_serializing_if = "Option::is_none")]
    pub kf_mpc: Option<f64>,
    #[serde(rename = "sigT_Mpc", default, skip_serializing_if = "Option::is_none")]
    pub sigt_mpc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(rename = "Delta2_p", default, skip_serializing_if = "Option::is_none")]
    pub delta2_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_p: Option<f64>,
}

impl EmulatorParams {
    /// Build a model from `(name, value)` pairs.
    ///
    /// Return
    /// ----------
    /// * [`FluxPowerError::UnknownParameter`] on the first name that is not an emulator
    ///   coordinate.
    ///
    /// ```rust
    /// use fluxpower::emulator::EmulatorParams;
    ///
    /// let model = EmulatorParams::from_pairs([("mF", 0.7), ("gamma", 1.4)]).unwrap();
    /// assert_eq!(model.gamma, Some(1.4));
    /// assert!(EmulatorParams::from_pairs([("T0", 1e4)]).is_err());
    /// ```
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, FluxPowerError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut params = EmulatorParams::default();
        for (name, value) in pairs {
            params.set(name.parse()?, value);
        }
        Ok(params)
    }

    pub fn get(&self, name: ParamName) -> Option<f64> {
        match name {
            ParamName::MeanFlux => self.mean_flux,
            ParamName::KfMpc => self.kf_mpc,
            ParamName::SigTMpc => self.sigt_mpc,
            ParamName::Gamma => self.gamma,
            ParamName::Delta2P => self.delta2_p,
            ParamName::NP => self.n_p,
            ParamName::AlphaP => self.alpha_p,
            ParamName::FP => self.f_p,
        }
    }

    pub fn set(&mut self, name: ParamName, value: f64) {
        let slot = match name {
            ParamName::MeanFlux => &mut self.mean_flux,
            ParamName::KfMpc => &mut self.kf_mpc,
            ParamName::SigTMpc => &mut self.sigt_mpc,
            ParamName::Gamma => &mut self.gamma,
            ParamName::Delta2P => &mut self.delta2_p,
            ParamName::NP => &mut self.n_p,
            ParamName::AlphaP => &mut self.alpha_p,
            ParamName::FP => &mut self.f_p,
        };
        *slot = Some(value);
    }

    /// Weighted squared distance to `other`, over the parameters set in both models.
    pub fn distance(&self, other: &EmulatorParams) -> f64 {
        ParamName::ALL
            .iter()
            .filter_map(|&name| {
                let (a, b) = (self.get(name)?, other.get(name)?);
                Some(((a - b) / name.weight()).powi(2))
            })
            .sum()
    }
}
