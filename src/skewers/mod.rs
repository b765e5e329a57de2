//! # Skewer extraction
//!
//! Everything related to turning one raw simulation snapshot into a set of skewer files, one per
//! thermal rescaling, plus a JSON sidecar describing the whole set.
//!
//! ## Layout on disk
//!
//! ```text
//! <post_dir>/skewers[_<axis>]/
//! ├── skewers_<snap>_Ns<n>_wM<width>[_sT<scale_T0>][_sg<scale_gamma>].hdf5
//! └── snap_skewers_<snap>_Ns<n>_wM<width>.json
//! ```
//!
//! Widths and scales enter the names truncated to three decimals, so two requests that agree to
//! that precision share a file name. A scale equal to one is left out of the name.
//!
//! ## Submodules
//!
//! * [`extractor`] – traits for the external spectrum extractor and temperature-density fitter.
//! * [`command_bridge`] – adapter running those collaborators as an external command.
//! * [`snapshot_info`] – the per-snapshot JSON sidecar.
//! * [`orchestrator`] – the rescaling sweep itself.

pub mod command_bridge;
pub mod extractor;
pub mod orchestrator;
pub mod snapshot_info;

use camino::{Utf8Path, Utf8PathBuf};

use crate::constants::{Mpc, SnapNum, FILENAME_DECIMALS};

/// Truncate to [`FILENAME_DECIMALS`] decimals and print the shortest representation that keeps
/// at least one decimal digit (`0.1`, `1.2`, `2.0`).
pub(crate) fn format_truncated(value: f64) -> String {
    let scale = 10f64.powi(FILENAME_DECIMALS);
    let truncated = (scale * value).trunc() / scale;
    format!("{truncated:?}")
}

/// File name storing skewers for a particular temperature model.
///
/// Arguments
/// -----------------
/// * `snap_num`: snapshot index.
/// * `n_skewers`: skewers per side.
/// * `width_mpc`: cell width in comoving Mpc.
/// * `scale_t0`, `scale_gamma`: thermal rescalings; omitted from the name when `None` or one.
pub fn skewers_filename(
    snap_num: SnapNum,
    n_skewers: usize,
    width_mpc: Mpc,
    scale_t0: Option<f64>,
    scale_gamma: Option<f64>,
) -> String {
    let mut filename = format!(
        "skewers_{snap_num}_Ns{n_skewers}_wM{}",
        format_truncated(width_mpc)
    );
    if let Some(s) = scale_t0.filter(|&s| s != 1.0) {
        filename.push_str(&format!("_sT{}", format_truncated(s)));
    }
    if let Some(s) = scale_gamma.filter(|&s| s != 1.0) {
        filename.push_str(&format!("_sg{}", format_truncated(s)));
    }
    filename.push_str(".hdf5");
    filename
}

/// File name describing the set of skewers for a given snapshot.
pub fn snapshot_json_filename(snap_num: SnapNum, n_skewers: usize, width_mpc: Mpc) -> String {
    format!(
        "snap_skewers_{snap_num}_Ns{n_skewers}_wM{}.json",
        format_truncated(width_mpc)
    )
}

/// Directory holding the skewers of one extraction axis.
///
/// `None` means the extractor default axis and maps to `<post_dir>/skewers`.
pub fn skewers_dir(post_dir: &Utf8Path, axis: Option<u8>) -> Utf8PathBuf {
    match axis {
        Some(axis) => post_dir.join(format!("skewers_{axis}")),
        None => post_dir.join("skewers"),
    }
}

#[cfg(test)]
mod skewers_naming_test {
    use super::*;

    #[test]
    fn test_format_truncated() {
        assert_eq!(format_truncated(0.1), "0.1");
        assert_eq!(format_truncated(0.05), "0.05");
        assert_eq!(format_truncated(1.2), "1.2");
        assert_eq!(format_truncated(2.0), "2.0");
        assert_eq!(format_truncated(0.12345), "0.123");
        assert_eq!(format_truncated(0.9999), "0.999");
    }

    #[test]
    fn test_skewers_filename() {
        assert_eq!(
            skewers_filename(0, 50, 0.1, Some(0.8), Some(1.0)),
            "skewers_0_Ns50_wM0.1_sT0.8.hdf5"
        );
        assert_eq!(
            skewers_filename(12, 500, 0.05, Some(1.0), Some(1.4)),
            "skewers_12_Ns500_wM0.05_sg1.4.hdf5"
        );
        assert_eq!(
            skewers_filename(3, 10, 0.1, Some(1.2), Some(0.9)),
            "skewers_3_Ns10_wM0.1_sT1.2_sg0.9.hdf5"
        );
        assert_eq!(
            skewers_filename(3, 10, 0.1, None, None),
            "skewers_3_Ns10_wM0.1.hdf5"
        );
    }

    #[test]
    fn test_skewers_filename_deterministic_and_injective() {
        let a = skewers_filename(1, 50, 0.1, Some(0.8), Some(1.1));
        assert_eq!(a, skewers_filename(1, 50, 0.1, Some(0.8), Some(1.1)));

        // differences below the truncation are invisible
        assert_eq!(a, skewers_filename(1, 50, 0.1, Some(0.8004), Some(1.1)));

        let variants = [
            skewers_filename(2, 50, 0.1, Some(0.8), Some(1.1)),
            skewers_filename(1, 51, 0.1, Some(0.8), Some(1.1)),
            skewers_filename(1, 50, 0.2, Some(0.8), Some(1.1)),
            skewers_filename(1, 50, 0.1, Some(0.9), Some(1.1)),
            skewers_filename(1, 50, 0.1, Some(0.8), Some(1.2)),
        ];
        for v in &variants {
            assert_ne!(&a, v);
        }
    }

    #[test]
    fn test_snapshot_json_filename_and_dir() {
        assert_eq!(
            snapshot_json_filename(7, 50, 0.1),
            "snap_skewers_7_Ns50_wM0.1.json"
        );
        let post = Utf8Path::new("/data/post");
        assert_eq!(skewers_dir(post, None), Utf8Path::new("/data/post/skewers"));
        assert_eq!(skewers_dir(post, Some(2)), Utf8Path::new("/data/post/skewers_2"));
    }
}
