//! # External command bridge
//!
//! [`CommandExtractor`] implements both [`SpectrumExtractor`] and [`ThermalRelationFitter`] by
//! running an external program (typically a thin wrapper around the Python extraction library).
//!
//! ## Protocol
//!
//! ```text
//! <program> [args..] fit-tdr --snap-num <N> --output-dir <DIR>
//!     stdout: {"T0": <f64>, "gamma": <f64>}
//!
//! <program> [args..] extract            (stdin: ExtractionRequest as JSON)
//!     writes <savedir>/<savefile>
//!     stdout: {"mean_flux": <f64>}
//! ```
//!
//! Any file already at `<savedir>/<savefile>` is removed before `extract` runs, so the file found
//! afterwards is always the bridge's own output.
//!
//! A non-zero exit status is reported as [`FluxPowerError::ExternalFailure`] carrying the
//! program's stderr unmodified. Calls block until the program exits; there is no timeout.

use std::fs;
use std::io::{self, Write};
use std::process::{Command, Output, Stdio};

use camino::Utf8Path;
use serde::Deserialize;
use tracing::debug;

use crate::{
    constants::SnapNum,
    fluxpower_errors::FluxPowerError,
    skewers::extractor::{
        ExtractionRequest, GriddedSkewers, SpectrumExtractor, ThermalFit, ThermalRelationFitter,
    },
};

#[derive(Debug, Deserialize)]
struct MeanFluxReply {
    mean_flux: f64,
}

#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    /// Build the bridge from a command line such as `"python3 bridge.py"`.
    pub fn from_command_line(command_line: &str) -> Result<Self, FluxPowerError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            FluxPowerError::ConfigurationError("empty extractor command".into())
        })?;
        Ok(CommandExtractor {
            program,
            args: parts.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    fn check_status(&self, output: Output) -> Result<Vec<u8>, FluxPowerError> {
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(FluxPowerError::ExternalFailure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    fn run_extract(&self, request: &ExtractionRequest) -> Result<f64, FluxPowerError> {
        let payload = serde_json::to_vec(request)?;
        let path = request.output_path();
        match fs::remove_file(&path) {
            Ok(()) => debug!(%path, "removed previous skewer file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(program = %self.program, file = %request.savefile, "running extractor");

        let mut child = self
            .command()
            .arg("extract")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload)?;
        }
        let stdout = self.check_status(child.wait_with_output()?)?;
        let reply: MeanFluxReply = serde_json::from_slice(&stdout)?;
        Ok(reply.mean_flux)
    }
}

impl ThermalRelationFitter for CommandExtractor {
    fn fit_td_rel(
        &self,
        snap_num: SnapNum,
        output_dir: &Utf8Path,
    ) -> Result<ThermalFit, FluxPowerError> {
        let output = self
            .command()
            .arg("fit-tdr")
            .arg("--snap-num")
            .arg(snap_num.to_string())
            .arg("--output-dir")
            .arg(output_dir.as_str())
            .output()?;
        let stdout = self.check_status(output)?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}

/// Skewers produced by a [`CommandExtractor`]; computed on the first call to `mean_flux`.
#[derive(Debug)]
pub struct CommandSkewers {
    bridge: CommandExtractor,
    request: ExtractionRequest,
    mean_flux: Option<f64>,
}

impl GriddedSkewers for CommandSkewers {
    fn mean_flux(&mut self) -> Result<f64, FluxPowerError> {
        if let Some(mf) = self.mean_flux {
            return Ok(mf);
        }
        let mf = self.bridge.run_extract(&self.request)?;
        self.mean_flux = Some(mf);
        Ok(mf)
    }

    fn save_file(&mut self) -> Result<(), FluxPowerError> {
        // the bridge writes the file as part of the extraction, any older file is gone by now
        self.mean_flux()?;
        let path = self.request.output_path();
        if path.exists() {
            Ok(())
        } else {
            Err(FluxPowerError::ExternalFailure(format!(
                "extractor reported success but {path} was not written"
            )))
        }
    }
}

impl SpectrumExtractor for CommandExtractor {
    type Skewers = CommandSkewers;

    fn extract(&self, request: &ExtractionRequest) -> Result<Self::Skewers, FluxPowerError> {
        Ok(CommandSkewers {
            bridge: self.clone(),
            request: request.clone(),
            mean_flux: None,
        })
    }
}
