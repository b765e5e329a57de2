//! Write (and optionally submit) one SLURM script per snapshot of a simulation.
//!
//! ```text
//! write_job_scripts --post_dir /sims/L10/post --machine hypatia --zmax 5.5 \
//!     skewers --raw_dir /sims/L10 --n_skewers 500 --width_Mpc 0.05 --scales_T0 "0.8, 1.0"
//! write_job_scripts --post_dir /sims/L10/post --machine hypatia --zmax 5.5 --run \
//!     p1d --n_skewers 500 --width_Mpc 0.05 --scales_tau "0.9, 1.0, 1.1"
//! ```

use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fluxpower::{
    fluxpower_errors::FluxPowerError,
    jobs::{
        extraction_options_string,
        machine::{MachineProfile, MachineProfiles},
        output_files, p1d_options_string,
        script::JobScript,
        write_scripts_in_sim,
    },
    sim_params::GadgetParamFile,
    skewers::orchestrator::{parse_scales, ExtractionParams},
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Base directory with simulation post-processings
    #[arg(long = "post_dir")]
    post_dir: Utf8PathBuf,

    /// Machine profile label
    #[arg(long)]
    machine: String,

    /// TOML file with machine profiles (built-in profiles when absent)
    #[arg(long)]
    machines: Option<Utf8PathBuf>,

    /// Only snapshots below this redshift get a job
    #[arg(long)]
    zmax: f64,

    /// Wall time of each job
    #[arg(long, default_value = "01:00:00")]
    time: String,

    /// Submit the scripts after writing them
    #[arg(long)]
    run: bool,

    /// Scheduler submission command
    #[arg(long, default_value = "sbatch")]
    scheduler: String,

    /// Print runtime information
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Skewer extraction jobs
    Skewers {
        /// Base directory with raw simulation outputs
        #[arg(long = "raw_dir")]
        raw_dir: Utf8PathBuf,

        #[arg(long)]
        axis: Option<u8>,

        #[arg(long = "n_skewers", default_value_t = 10)]
        n_skewers: usize,

        #[arg(long = "width_Mpc", default_value_t = 0.1)]
        width_mpc: f64,

        #[arg(long = "scales_T0", default_value = "1.0")]
        scales_t0: String,

        #[arg(long = "scales_gamma", default_value = "1.0")]
        scales_gamma: String,

        /// Bridge command passed to every job (`FLUXPOWER_EXTRACTOR` of the job otherwise)
        #[arg(long)]
        extractor: Option<String>,

        #[arg(long, default_value = "extract_skewers")]
        executable: String,
    },
    /// Flux power measurement jobs
    P1d {
        #[arg(long = "n_skewers", default_value_t = 10)]
        n_skewers: usize,

        #[arg(long = "width_Mpc", default_value_t = 0.1)]
        width_mpc: f64,

        #[arg(long = "scales_tau", default_value = "1.0")]
        scales_tau: String,

        #[arg(long = "p1d_label")]
        p1d_label: Option<String>,

        #[arg(long = "add_p3d")]
        add_p3d: bool,

        #[arg(long, default_value = "archive_flux_power.py")]
        executable: String,
    },
}

fn job(
    cli: &Cli,
    machine: &MachineProfile,
    job_name: &str,
    executable: &str,
    options: String,
    prefix: &str,
    snap_num: usize,
) -> JobScript {
    JobScript {
        job_name: job_name.to_string(),
        executable: executable.to_string(),
        options,
        time: cli.time.clone(),
        output_files: output_files(&cli.post_dir, prefix, snap_num),
        machine: machine.clone(),
    }
}

fn run(cli: &Cli) -> Result<(), FluxPowerError> {
    let profiles = match &cli.machines {
        Some(path) => MachineProfiles::from_file(path)?,
        None => MachineProfiles::builtin()?,
    };
    let machine = profiles.get(&cli.machine)?;
    let scheduler = cli.run.then_some(cli.scheduler.as_str());
    let post_dir: &Utf8Path = &cli.post_dir;

    let written = match &cli.command {
        Commands::Skewers {
            raw_dir,
            axis,
            n_skewers,
            width_mpc,
            scales_t0,
            scales_gamma,
            extractor,
            executable,
        } => {
            let params = ExtractionParams::builder()
                .n_skewers(*n_skewers)
                .width_mpc(*width_mpc)
                .axis(*axis)
                .scales_t0(parse_scales("scales_T0", scales_t0)?)
                .scales_gamma(parse_scales("scales_gamma", scales_gamma)?)
                .build()?;
            let sim_params = GadgetParamFile::read(&raw_dir.join("paramfile.gadget"))?;
            write_scripts_in_sim(post_dir, &sim_params, cli.zmax, "skewers", scheduler, |snap| {
                let options = extraction_options_string(
                    raw_dir,
                    post_dir,
                    snap,
                    &params,
                    extractor.as_deref(),
                    cli.verbose,
                );
                Ok(job(cli, machine, "extract_skewers", executable, options, "skewers", snap))
            })?
        }
        Commands::P1d {
            n_skewers,
            width_mpc,
            scales_tau,
            p1d_label,
            add_p3d,
            executable,
        } => {
            let scales_tau = parse_scales("scales_tau", scales_tau)?;
            let sim_params = GadgetParamFile::read(&post_dir.join("paramfile.gadget"))?;
            write_scripts_in_sim(post_dir, &sim_params, cli.zmax, "p1d", scheduler, |snap| {
                let options = p1d_options_string(
                    post_dir,
                    snap,
                    *n_skewers,
                    *width_mpc,
                    &scales_tau,
                    p1d_label.as_deref(),
                    *add_p3d,
                    cli.verbose,
                );
                Ok(job(cli, machine, "flux_p1d", executable, options, "p1d", snap))
            })?
        }
    };

    info!(n_scripts = written.len(), "job scripts written");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
