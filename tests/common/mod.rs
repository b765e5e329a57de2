#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;

use camino::Utf8Path;
use fluxpower::{
    constants::{Redshift, SnapNum},
    cosmology::{HubbleEngine, SimCosmology},
    fluxpower_errors::FluxPowerError,
    sim_params::SnapshotParameters,
    skewers::extractor::{
        ExtractionRequest, GriddedSkewers, SpectrumExtractor, ThermalFit, ThermalRelationFitter,
    },
};

/// Snapshot table with a fixed list of redshifts.
#[derive(Debug, Clone)]
pub struct FixedSnapshots {
    pub zs: Vec<Redshift>,
    pub cosmology: SimCosmology,
}

impl FixedSnapshots {
    pub fn new(zs: &[Redshift]) -> Self {
        FixedSnapshots {
            zs: zs.to_vec(),
            cosmology: SimCosmology {
                h0: 67.0,
                ombh2: 0.022,
                omch2: 0.12,
                mnu: 0.0,
            },
        }
    }
}

impl SnapshotParameters for FixedSnapshots {
    fn redshifts(&self) -> Result<Vec<Redshift>, FluxPowerError> {
        Ok(self.zs.clone())
    }

    fn cosmology(&self) -> Result<SimCosmology, FluxPowerError> {
        Ok(self.cosmology)
    }
}

/// Expansion rate independent of redshift.
#[derive(Debug)]
pub struct ConstantHubble(pub f64);

impl HubbleEngine for ConstantHubble {
    fn hubble_parameter(&self, _z: Redshift) -> Result<f64, FluxPowerError> {
        Ok(self.0)
    }
}

/// Fitter returning a fixed thermal state and counting its calls.
#[derive(Debug)]
pub struct FixedFitter {
    pub fit: ThermalFit,
    pub calls: Cell<usize>,
}

impl FixedFitter {
    pub fn new(t0: f64, gamma: f64) -> Self {
        FixedFitter {
            fit: ThermalFit { t0, gamma },
            calls: Cell::new(0),
        }
    }
}

impl ThermalRelationFitter for FixedFitter {
    fn fit_td_rel(
        &self,
        _snap_num: SnapNum,
        _output_dir: &Utf8Path,
    ) -> Result<ThermalFit, FluxPowerError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.fit)
    }
}

/// Extractor writing a small text file per request and recording every request.
#[derive(Debug, Default)]
pub struct RecordingExtractor {
    pub requests: RefCell<Vec<ExtractionRequest>>,
    /// Fail on the request with this index.
    pub fail_at: Option<usize>,
}

#[derive(Debug)]
pub struct FakeSkewers {
    request: ExtractionRequest,
    computed: bool,
    saves: usize,
}

impl GriddedSkewers for FakeSkewers {
    fn mean_flux(&mut self) -> Result<f64, FluxPowerError> {
        self.computed = true;
        // hotter gas, slightly more transmission
        let t0 = self.request.thermal_override.map_or(1e4, |o| o.t0);
        Ok(0.6 + t0 * 1e-6)
    }

    fn save_file(&mut self) -> Result<(), FluxPowerError> {
        assert!(self.computed, "skewers saved before being computed");
        self.saves += 1;
        assert_eq!(self.saves, 1, "skewers saved twice");
        fs::write(
            self.request.output_path(),
            serde_json::to_string(&self.request)?,
        )?;
        Ok(())
    }
}

impl SpectrumExtractor for RecordingExtractor {
    type Skewers = FakeSkewers;

    fn extract(&self, request: &ExtractionRequest) -> Result<FakeSkewers, FluxPowerError> {
        let index = self.requests.borrow().len();
        self.requests.borrow_mut().push(request.clone());
        if self.fail_at == Some(index) {
            return Err(FluxPowerError::ExternalFailure(format!(
                "fake extractor failed on {}",
                request.savefile
            )));
        }
        Ok(FakeSkewers {
            request: request.clone(),
            computed: false,
            saves: 0,
        })
    }
}
