//! SLURM submission scripts.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::{fluxpower_errors::FluxPowerError, jobs::machine::MachineProfile};

/// One batch job: a single command run under a machine profile.
#[derive(Debug, Clone, PartialEq)]
pub struct JobScript {
    /// SLURM job name, e.g. `flux_p1d`.
    pub job_name: String,
    pub executable: String,
    /// Command-line options appended to the executable.
    pub options: String,
    /// Wall time, `HH:MM:SS`.
    pub time: String,
    /// Base path of the job logs; `.out` and `.err` are appended.
    pub output_files: Utf8PathBuf,
    pub machine: MachineProfile,
}

impl JobScript {
    /// Text of the submission script.
    pub fn render(&self) -> String {
        let machine = &self.machine;
        let mut sbatch = vec![format!("--job-name={}", self.job_name)];
        if let Some(partition) = &machine.partition {
            sbatch.push(format!("--partition={partition}"));
        }
        if let Some(account) = &machine.account {
            sbatch.push(format!("--account={account}"));
        }
        sbatch.push(format!("--nodes={}", machine.nodes));
        sbatch.push(format!("--ntasks={}", machine.ntasks));
        sbatch.push(format!("--time={}", self.time));
        sbatch.push(format!("--output={}.out", self.output_files));
        sbatch.push(format!("--error={}.err", self.output_files));
        sbatch.extend(machine.extra_sbatch.iter().cloned());

        let mut lines = vec!["#!/bin/bash".to_string()];
        lines.extend(sbatch.iter().map(|option| format!("#SBATCH {option}")));
        lines.push(String::new());
        lines.extend(machine.modules.iter().map(|module| format!("module load {module}")));
        lines.push(format!("{} {}", self.executable, self.options.trim_end()));

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), FluxPowerError> {
        fs::write(path, self.render())?;
        Ok(())
    }
}
