//! # Constants and type definitions for fluxpower
//!
//! This module centralizes the **physical constants**, **numerical tweaks**, and **common type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Thermal broadening reference values
//! - Extractor resolution tweak (pixel-count floor compensation)
//! - Unit-tagged type aliases for velocities, comoving lengths and wavenumbers
//!
//! Unit conventions follow the Lyman-α forest literature: comoving lengths in **Mpc**
//! (no `h`), velocities in **km/s**, expansion-rate conversions in **km/s/Mpc**.

// -------------------------------------------------------------------------------------------------
// Physical constants
// -------------------------------------------------------------------------------------------------

/// RMS thermal broadening (km/s) of hydrogen absorption at the reference temperature.
pub const SIGMA_T_REF_KMS: f64 = 9.1;

/// Reference temperature (K) for [`SIGMA_T_REF_KMS`].
pub const T_REF_K: f64 = 1.0e4;

// -------------------------------------------------------------------------------------------------
// Numerical tweaks
// -------------------------------------------------------------------------------------------------

/// The extractor computes `n_pix = floor(L_kms / pix_kms)`; shrinking the requested pixel width
/// by this factor keeps the realized resolution at or below the request.
pub const RESOLUTION_TWEAK: f64 = 0.99999;

/// Number of decimal digits kept when scales and widths enter a file name.
pub const FILENAME_DECIMALS: i32 = 3;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-10;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Redshift
pub type Redshift = f64;
/// Velocity in km/s
pub type KmPerS = f64;
/// Comoving length in Mpc
pub type Mpc = f64;
/// Velocity ↔ comoving-length conversion factor dv/dX, in km/s/Mpc
pub type KmsPerMpc = f64;
/// Temperature in Kelvin
pub type Kelvin = f64;
/// Snapshot index in the simulation output list
pub type SnapNum = usize;
