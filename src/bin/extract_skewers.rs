//! Extract skewers for one snapshot, for a grid of thermal rescalings.
//!
//! ```text
//! extract_skewers --raw_dir /sims/L10 --post_dir /sims/L10/post --snap_num 4 \
//!     --n_skewers 50 --scales_T0 "0.8, 1.0, 1.2" --extractor "python3 bridge.py"
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use fluxpower::{
    cosmology::{tabulated::TabulatedHubble, HubbleEngine},
    fluxpower_errors::FluxPowerError,
    sim_params::GadgetParamFile,
    skewers::{
        command_bridge::CommandExtractor,
        orchestrator::{parse_scales, ExtractionParams, SkewerExtraction},
    },
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base directory with raw simulation outputs
    #[arg(long = "raw_dir")]
    raw_dir: Utf8PathBuf,

    /// Base directory with simulation post-processings
    #[arg(long = "post_dir")]
    post_dir: Utf8PathBuf,

    /// Snapshot number
    #[arg(long = "snap_num")]
    snap_num: usize,

    /// Axis to extract skewers (1, 2, 3)
    #[arg(long)]
    axis: Option<u8>,

    /// Number of skewers per side
    #[arg(long = "n_skewers", default_value_t = 10)]
    n_skewers: usize,

    /// Cell width (in Mpc)
    #[arg(long = "width_Mpc", default_value_t = 0.1)]
    width_mpc: f64,

    /// Comma-separated list of T0 scalings to use
    #[arg(long = "scales_T0", default_value = "1.0")]
    scales_t0: String,

    /// Comma-separated list of gamma scalings to use
    #[arg(long = "scales_gamma", default_value = "1.0")]
    scales_gamma: String,

    /// Bridge command running the spectrum extractor
    #[arg(long, env = "FLUXPOWER_EXTRACTOR")]
    extractor: String,

    /// CSV table `z,H_kms_Mpc` from a full cosmology engine
    #[arg(long = "hubble_table")]
    hubble_table: Option<Utf8PathBuf>,

    /// Print runtime information
    #[arg(long)]
    verbose: bool,
}

fn run(args: Args) -> Result<(), FluxPowerError> {
    let params = ExtractionParams::builder()
        .n_skewers(args.n_skewers)
        .width_mpc(args.width_mpc)
        .axis(args.axis)
        .scales_t0(parse_scales("scales_T0", &args.scales_t0)?)
        .scales_gamma(parse_scales("scales_gamma", &args.scales_gamma)?)
        .build()?;

    let sim_params = GadgetParamFile::read(&args.raw_dir.join("paramfile.gadget"))?;
    let hubble_engine = match &args.hubble_table {
        Some(path) => Some(Arc::new(TabulatedHubble::from_csv(path)?) as Arc<dyn HubbleEngine>),
        None => None,
    };
    let bridge = CommandExtractor::from_command_line(&args.extractor)?;

    let extraction = SkewerExtraction {
        raw_dir: &args.raw_dir,
        post_dir: &args.post_dir,
        sim_params: &sim_params,
        hubble_engine,
        fitter: &bridge,
        extractor: &bridge,
    };
    extraction.run(args.snap_num, &params)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(args) {
        Ok(()) => {
            println!("DONE");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
