//! # Expansion rate and velocity ↔ comoving conversion
//!
//! Skewers are extracted on a grid of fixed **velocity** width, but simulation boxes, archived
//! power spectra and emulator coordinates live in **comoving Mpc**. The bridge between the two is
//!
//! ```text
//! dv/dX (z) = H(z) / (1 + z)        [km/s/Mpc]
//! ```
//!
//! and every component that converts between the two unit systems must obtain `H(z)` the same
//! way, otherwise `width_kms = width_Mpc · dv/dX` would drift between extraction and any later
//! reinterpretation of the skewers.
//!
//! ## Strategies
//!
//! [`CosmologyRate`] is an explicit strategy chosen at construction:
//!
//! * [`CosmologyRate::Full`] – delegates to a [`HubbleEngine`] (a full background solver, or a
//!   table exported from one such as [`tabulated::TabulatedHubble`]).
//! * [`CosmologyRate::Approximate`] – analytic flat ΛCDM,
//!   `H(z) = H0 · sqrt(Ωm (1+z)³ + 1 − Ωm)`, with `Ωm = (ω_c + ω_b) / h²`.
//!   This approximation ignores massive neutrinos and refuses cosmologies that have them
//!   ([`FluxPowerError::PhysicsUnsupported`]).
//!
//! ## Example
//!
//! ```rust
//! use fluxpower::cosmology::{CosmologyRate, SimCosmology};
//!
//! let cosmo = SimCosmology { h0: 67.0, ombh2: 0.022, omch2: 0.12, mnu: 0.0 };
//! let rate = CosmologyRate::new(cosmo, None);
//! let dkms_dmpc = rate.dkms_dmpc_at(3.0).unwrap();
//! assert!(dkms_dmpc > 70.0 && dkms_dmpc < 80.0);
//! ```

pub mod tabulated;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{KmsPerMpc, Redshift},
    fluxpower_errors::FluxPowerError,
};

/// Cosmological parameters of a simulation, in the CAMB convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimCosmology {
    /// Hubble constant (km/s/Mpc)
    #[serde(rename = "H0")]
    pub h0: f64,
    /// Physical baryon density ω_b = Ω_b h²
    pub ombh2: f64,
    /// Physical cold dark matter density ω_c = Ω_c h²
    pub omch2: f64,
    /// Sum of neutrino masses (eV)
    #[serde(default)]
    pub mnu: f64,
}

impl SimCosmology {
    /// Dimensionless Hubble parameter h = H0 / 100.
    pub fn little_h(&self) -> f64 {
        self.h0 / 100.0
    }

    /// Total matter density Ω_m = (ω_c + ω_b) / h².
    pub fn omega_m(&self) -> f64 {
        (self.omch2 + self.ombh2) / self.little_h().powi(2)
    }
}

/// A source of the Hubble expansion rate H(z), in km/s/Mpc.
pub trait HubbleEngine: std::fmt::Debug + Send + Sync {
    fn hubble_parameter(&self, z: Redshift) -> Result<f64, FluxPowerError>;
}

/// Strategy used to compute the expansion rate of a simulation.
#[derive(Debug)]
pub enum CosmologyRate {
    Full(Arc<dyn HubbleEngine>),
    Approximate(SimCosmology),
}

impl CosmologyRate {
    /// Select the strategy: a provided engine is always preferred over the analytic fallback.
    pub fn new(cosmology: SimCosmology, engine: Option<Arc<dyn HubbleEngine>>) -> Self {
        match engine {
            Some(engine) => CosmologyRate::Full(engine),
            None => CosmologyRate::Approximate(cosmology),
        }
    }

    /// Hubble parameter H(z) in km/s/Mpc.
    pub fn hubble_parameter(&self, z: Redshift) -> Result<f64, FluxPowerError> {
        match self {
            CosmologyRate::Full(engine) => engine.hubble_parameter(z),
            CosmologyRate::Approximate(cosmo) => {
                if cosmo.mnu != 0.0 {
                    return Err(FluxPowerError::PhysicsUnsupported(format!(
                        "analytic expansion rate cannot handle massive neutrinos (mnu = {} eV)",
                        cosmo.mnu
                    )));
                }
                let om = cosmo.omega_m();
                Ok(cosmo.h0 * (om * (1.0 + z).powi(3) + (1.0 - om)).sqrt())
            }
        }
    }

    /// Velocity ↔ comoving conversion dv/dX = H(z)/(1+z), in km/s/Mpc.
    pub fn dkms_dmpc_at(&self, z: Redshift) -> Result<KmsPerMpc, FluxPowerError> {
        let hz = self.hubble_parameter(z)?;
        let dkms_dmpc = hz / (1.0 + z);
        debug!(z, hz, dkms_dmpc, "expansion rate");
        Ok(dkms_dmpc)
    }
}
