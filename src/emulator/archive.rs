//! Archive of simulated models: a parameter vector and the P1D measured for it.
//!
//! On disk the archive is a JSON array of flat objects. Emulator coordinates and the native
//! `k_Mpc` / `p1d_Mpc` arrays sit side by side; any other key is ignored.
//!
//! ```text
//! [
//!   {"mF": 0.71, "sigT_Mpc": 0.12, "gamma": 1.45, "kF_Mpc": 11.2,
//!    "Delta2_p": 0.35, "n_p": -2.30, "z": 3.0,
//!    "k_Mpc": [0.1, 0.2, ...], "p1d_Mpc": [0.41, 0.38, ...]},
//!   ...
//! ]
//! ```

use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{emulator::EmulatorParams, fluxpower_errors::FluxPowerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    #[serde(flatten)]
    pub params: EmulatorParams,
    /// Native wavenumbers in 1/Mpc, ascending.
    #[serde(rename = "k_Mpc")]
    pub k_mpc: Vec<f64>,
    #[serde(rename = "p1d_Mpc")]
    pub p1d_mpc: Vec<f64>,
}

impl ArchiveEntry {
    pub(crate) fn validate(&self, index: usize) -> Result<(), FluxPowerError> {
        if self.k_mpc.len() != self.p1d_mpc.len() || self.k_mpc.len() < 2 {
            return Err(FluxPowerError::InconsistentData(format!(
                "archive entry {index}: {} wavenumbers for {} powers",
                self.k_mpc.len(),
                self.p1d_mpc.len()
            )));
        }
        if self.k_mpc.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FluxPowerError::InconsistentData(format!(
                "archive entry {index}: k_Mpc must be strictly increasing"
            )));
        }
        Ok(())
    }
}

/// Read an archive from a JSON file.
pub fn read_archive(path: &Utf8Path) -> Result<Vec<ArchiveEntry>, FluxPowerError> {
    let reader = BufReader::new(File::open(path)?);
    let archive: Vec<ArchiveEntry> = serde_json::from_reader(reader)?;
    for (i, entry) in archive.iter().enumerate() {
        entry.validate(i)?;
    }
    info!(%path, n_entries = archive.len(), "read P1D archive");
    Ok(archive)
}

#[cfg(test)]
mod archive_test {
    use super::*;

    #[test]
    fn test_flat_entry() {
        let json = r#"{"mF": 0.7, "gamma": 1.4, "z": 3.0, "k_Mpc": [0.1, 0.2], "p1d_Mpc": [1.0, 0.5]}"#;
        let entry: ArchiveEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.params.mean_flux, Some(0.7));
        assert_eq!(entry.params.gamma, Some(1.4));
        assert_eq!(entry.params.n_p, None);
        assert_eq!(entry.k_mpc, vec![0.1, 0.2]);
        assert!(entry.validate(0).is_ok());
    }

    #[test]
    fn test_read_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("archive.json");
        std::fs::write(
            &path,
            r#"[{"mF": 0.7, "k_Mpc": [0.1, 0.2], "p1d_Mpc": [1.0, 0.5]},
                {"mF": 0.6, "k_Mpc": [0.2, 0.1], "p1d_Mpc": [1.0, 0.5]}]"#,
        )
        .unwrap();

        assert!(matches!(
            read_archive(&path),
            Err(FluxPowerError::InconsistentData(_))
        ));
    }
}
