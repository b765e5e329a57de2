//! Thermal broadening conversions.
//!
//! Gas at temperature `T0` smears absorption features in velocity space with an RMS width
//! `σ_T = 9.1 km/s · sqrt(T0 / 10⁴ K)`. Dividing by the expansion-rate conversion `dv/dX`
//! gives the same scale as a comoving length.

use crate::constants::{Kelvin, KmPerS, KmsPerMpc, Mpc, SIGMA_T_REF_KMS, T_REF_K};

/// Thermal broadening RMS in velocity units (km/s), given `T0` in Kelvin.
pub fn thermal_broadening_kms(t0: Kelvin) -> KmPerS {
    SIGMA_T_REF_KMS * (t0 / T_REF_K).sqrt()
}

/// Thermal broadening RMS in comoving units (Mpc).
///
/// Arguments
/// -----------------
/// * `t0`: temperature at mean density (K).
/// * `dkms_dmpc`: velocity ↔ comoving conversion at the snapshot redshift (km/s/Mpc).
pub fn thermal_broadening_mpc(t0: Kelvin, dkms_dmpc: KmsPerMpc) -> Mpc {
    thermal_broadening_kms(t0) / dkms_dmpc
}
