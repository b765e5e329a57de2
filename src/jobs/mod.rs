//! # Batch job scripts
//!
//! Post-processing a simulation runs one job per snapshot. This module builds the command-line
//! options of those jobs, renders them as SLURM scripts ([`script::JobScript`]) for a machine
//! profile ([`machine::MachineProfiles`]) and optionally submits them.
//!
//! ## Layout on disk
//!
//! ```text
//! <post_dir>/<prefix>_<snap>.sub          submission script
//! <post_dir>/info_sub_<prefix>_<snap>     scheduler reply, when submitted
//! <post_dir>/slurm_<prefix>_<snap>.out    job logs
//! <post_dir>/slurm_<prefix>_<snap>.err
//! ```
//!
//! Only snapshots with `z < zmax` get a script.

pub mod machine;
pub mod script;

use std::fs::File;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::{
    constants::{Mpc, Redshift, SnapNum},
    fluxpower_errors::FluxPowerError,
    sim_params::SnapshotParameters,
    skewers::orchestrator::ExtractionParams,
};

use script::JobScript;

/// Comma-separated list of floats, `"0.8, 1.0, 1.2"`.
pub fn string_from_list(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Options of the `extract_skewers` binary for one snapshot.
///
/// Scale lists and the extractor command are quoted so that they survive word splitting in the
/// job script. Without `extractor` the job relies on `FLUXPOWER_EXTRACTOR` at run time.
pub fn extraction_options_string(
    raw_dir: &Utf8Path,
    post_dir: &Utf8Path,
    snap_num: SnapNum,
    params: &ExtractionParams,
    extractor: Option<&str>,
    verbose: bool,
) -> String {
    let mut options = vec![
        format!("--raw_dir {raw_dir}"),
        format!("--post_dir {post_dir}"),
        format!("--snap_num {snap_num}"),
        format!("--n_skewers {}", params.n_skewers),
        format!("--width_Mpc {:?}", params.width_mpc),
        format!("--scales_T0 \"{}\"", string_from_list(&params.scales_t0)),
        format!("--scales_gamma \"{}\"", string_from_list(&params.scales_gamma)),
    ];
    if let Some(axis) = params.axis {
        options.push(format!("--axis {axis}"));
    }
    if let Some(extractor) = extractor {
        options.push(format!("--extractor \"{extractor}\""));
    }
    if verbose {
        options.push("--verbose".into());
    }
    options.join(" ")
}

/// Options of the flux-power measurement for one snapshot.
#[allow(clippy::too_many_arguments)]
pub fn p1d_options_string(
    post_dir: &Utf8Path,
    snap_num: SnapNum,
    n_skewers: usize,
    width_mpc: Mpc,
    scales_tau: &[f64],
    p1d_label: Option<&str>,
    add_p3d: bool,
    verbose: bool,
) -> String {
    let mut options = vec![
        format!("--post_dir {post_dir}"),
        format!("--snap_num {snap_num}"),
        format!("--n_skewers {n_skewers}"),
        format!("--width_Mpc {width_mpc:?}"),
        format!("--scales_tau \"{}\"", string_from_list(scales_tau)),
    ];
    if let Some(label) = p1d_label {
        options.push(format!("--p1d_label {label}"));
    }
    if add_p3d {
        options.push("--add_p3d".into());
    }
    if verbose {
        options.push("--verbose".into());
    }
    options.join(" ")
}

/// Submit `script` with `scheduler`, writing the scheduler reply to `info_file`.
pub fn submit(
    scheduler: &str,
    script: &Utf8Path,
    info_file: &Utf8Path,
) -> Result<(), FluxPowerError> {
    let output = Command::new(scheduler)
        .arg(script.as_str())
        .stdout(Stdio::from(File::create(info_file)?))
        .stderr(Stdio::piped())
        .output()?;
    if !output.status.success() {
        return Err(FluxPowerError::ExternalFailure(format!(
            "{scheduler} {script} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Write, and optionally submit, one job script per snapshot below `zmax`.
///
/// Arguments
/// -----------------
/// * `post_dir`: directory receiving the scripts.
/// * `sim_params`: source of the snapshot redshifts.
/// * `zmax`: snapshots with `z ≥ zmax` are skipped.
/// * `prefix`: script name prefix (`skewers`, `p1d`, ...).
/// * `scheduler`: submission command (e.g. `sbatch`); `None` only writes the scripts.
/// * `make_job`: builds the job of one snapshot.
///
/// Return
/// ----------
/// * The paths of the scripts written, in snapshot order.
pub fn write_scripts_in_sim<F>(
    post_dir: &Utf8Path,
    sim_params: &dyn SnapshotParameters,
    zmax: Redshift,
    prefix: &str,
    scheduler: Option<&str>,
    make_job: F,
) -> Result<Vec<Utf8PathBuf>, FluxPowerError>
where
    F: Fn(SnapNum) -> Result<JobScript, FluxPowerError>,
{
    let mut written = Vec::new();
    for (snap_num, z) in sim_params.redshifts()?.into_iter().enumerate() {
        if z >= zmax {
            debug!(snap_num, z, "skipping snapshot above zmax");
            continue;
        }
        let script_path = post_dir.join(format!("{prefix}_{snap_num}.sub"));
        make_job(snap_num)?.write(&script_path)?;
        info!(snap_num, z, script = %script_path, "wrote job script");

        if let Some(scheduler) = scheduler {
            let info_file = post_dir.join(format!("info_sub_{prefix}_{snap_num}"));
            submit(scheduler, &script_path, &info_file)?;
            info!(snap_num, %info_file, "submitted job");
        }
        written.push(script_path);
    }
    Ok(written)
}

/// Log base path of the job of one snapshot.
pub fn output_files(post_dir: &Utf8Path, prefix: &str, snap_num: SnapNum) -> Utf8PathBuf {
    post_dir.join(format!("slurm_{prefix}_{snap_num}"))
}
