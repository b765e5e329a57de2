use std::sync::Arc;

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use fluxpower::{
    constants::RESOLUTION_TWEAK,
    fluxpower_errors::FluxPowerError,
    skewers::{
        extractor::ThermalOverride,
        orchestrator::{ExtractionParams, SkewerExtraction},
        snapshot_info::SnapshotInfo,
    },
};

mod common;
use common::{ConstantHubble, FixedFitter, FixedSnapshots, RecordingExtractor};

struct Dirs {
    _tmp: tempfile::TempDir,
    raw: Utf8PathBuf,
    post: Utf8PathBuf,
}

fn dirs() -> Dirs {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap().to_owned();
    Dirs {
        raw: root.join("raw"),
        post: root.join("post"),
        _tmp: tmp,
    }
}

#[test]
fn test_rescaling_sweep_end_to_end() {
    let dirs = dirs();
    // z = 3 with H(z) = 300 km/s/Mpc gives dv/dX = 75 km/s/Mpc
    let snapshots = FixedSnapshots::new(&[3.0]);
    let fitter = FixedFitter::new(1e4, 1.4);
    let extractor = RecordingExtractor::default();

    let extraction = SkewerExtraction {
        raw_dir: &dirs.raw,
        post_dir: &dirs.post,
        sim_params: &snapshots,
        hubble_engine: Some(Arc::new(ConstantHubble(300.0))),
        fitter: &fitter,
        extractor: &extractor,
    };
    let params = ExtractionParams::builder()
        .n_skewers(50)
        .width_mpc(0.1)
        .scales_t0(vec![0.8, 1.2])
        .scales_gamma(vec![1.0])
        .build()
        .unwrap();

    let info = extraction.run(0, &params).unwrap();

    assert_eq!(fitter.calls.get(), 1);
    assert_relative_eq!(info.z, 3.0);
    assert_relative_eq!(info.width_kms, 7.5, epsilon = 1e-12);
    assert_eq!(info.t0_ini, 1e4);
    assert_eq!(info.gamma_ini, 1.4);
    assert_eq!(
        info.sk_files,
        vec![
            "skewers_0_Ns50_wM0.1_sT0.8.hdf5".to_string(),
            "skewers_0_Ns50_wM0.1_sT1.2.hdf5".to_string(),
        ]
    );
    assert_relative_eq!(info.sim_t0[0], 8000.0, epsilon = 1e-9);
    assert_relative_eq!(info.sim_t0[1], 12000.0, epsilon = 1e-9);
    assert_eq!(info.sim_gamma, vec![1.4, 1.4]);
    assert_eq!(info.sim_scale_t0, vec![0.8, 1.2]);
    assert_eq!(info.sim_scale_gamma, vec![1.0, 1.0]);
    // σ_T = 9.1 sqrt(T0 / 1e4) km/s, divided by 75 km/s/Mpc
    assert_relative_eq!(
        info.sim_sigt_mpc[0],
        9.1 * 0.8_f64.sqrt() / 75.0,
        max_relative = 1e-12
    );
    assert!(info.sim_mf[1] > info.sim_mf[0]);

    let requests = extractor.requests.borrow();
    assert_eq!(requests.len(), 2);
    for request in requests.iter() {
        assert_eq!(request.external_hz, 300.0);
        assert_relative_eq!(request.resolution_kms, 7.5 * RESOLUTION_TWEAK, epsilon = 1e-12);
        assert_eq!(request.axis, 1);
        assert_eq!(request.n_skewers, 50);
        assert_eq!(request.output_dir, dirs.raw.join("output"));
        assert_eq!(request.savedir, dirs.post.join("skewers"));
        assert!(request.output_path().exists());
    }
    assert_eq!(
        requests[0].thermal_override.map(|o| o.gamma),
        Some(1.4),
        "a rescaled T0 imposes the full thermal state"
    );

    let sidecar = dirs
        .post
        .join("skewers")
        .join("snap_skewers_0_Ns50_wM0.1.json");
    assert_eq!(SnapshotInfo::read(&sidecar).unwrap(), info);
}

#[test]
fn test_native_thermal_state_is_not_overridden() {
    let dirs = dirs();
    let snapshots = FixedSnapshots::new(&[4.0, 3.0]);
    let fitter = FixedFitter::new(1.2e4, 1.5);
    let extractor = RecordingExtractor::default();

    let extraction = SkewerExtraction {
        raw_dir: &dirs.raw,
        post_dir: &dirs.post,
        sim_params: &snapshots,
        hubble_engine: None,
        fitter: &fitter,
        extractor: &extractor,
    };
    let params = ExtractionParams::builder()
        .axis(Some(2))
        .scales_gamma(vec![1.0, 1.3])
        .build()
        .unwrap();

    let info = extraction.run(1, &params).unwrap();
    assert_eq!(info.axis, Some(2));
    assert_eq!(
        info.sk_files,
        vec![
            "skewers_1_Ns50_wM0.1.hdf5".to_string(),
            "skewers_1_Ns50_wM0.1_sg1.3.hdf5".to_string(),
        ]
    );

    let requests = extractor.requests.borrow();
    assert_eq!(requests[0].thermal_override, None);
    let over: ThermalOverride = requests[1].thermal_override.unwrap();
    assert_eq!(over.t0, 1.2e4);
    assert_relative_eq!(over.gamma, 1.95, epsilon = 1e-12);
    assert_eq!(requests[0].axis, 2);
    assert_eq!(requests[0].savedir, dirs.post.join("skewers_2"));
    assert!(dirs
        .post
        .join("skewers_2/snap_skewers_1_Ns50_wM0.1.json")
        .exists());
}

#[test]
fn test_existing_file_is_extracted_again() {
    let dirs = dirs();
    let snapshots = FixedSnapshots::new(&[3.0]);
    let fitter = FixedFitter::new(1e4, 1.4);
    let extractor = RecordingExtractor::default();

    let stale = dirs.post.join("skewers/skewers_0_Ns50_wM0.1.hdf5");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "stale").unwrap();

    let extraction = SkewerExtraction {
        raw_dir: &dirs.raw,
        post_dir: &dirs.post,
        sim_params: &snapshots,
        hubble_engine: None,
        fitter: &fitter,
        extractor: &extractor,
    };
    extraction
        .run(0, &ExtractionParams::default())
        .unwrap();

    assert_eq!(extractor.requests.borrow().len(), 1);
    assert_ne!(std::fs::read_to_string(&stale).unwrap(), "stale");
}

#[test]
fn test_extractor_failure_is_fatal() {
    let dirs = dirs();
    let snapshots = FixedSnapshots::new(&[3.0]);
    let fitter = FixedFitter::new(1e4, 1.4);
    let extractor = RecordingExtractor {
        fail_at: Some(1),
        ..Default::default()
    };

    let extraction = SkewerExtraction {
        raw_dir: &dirs.raw,
        post_dir: &dirs.post,
        sim_params: &snapshots,
        hubble_engine: None,
        fitter: &fitter,
        extractor: &extractor,
    };
    let params = ExtractionParams::builder()
        .scales_t0(vec![0.8, 1.0, 1.2])
        .build()
        .unwrap();

    let err = extraction.run(0, &params).unwrap_err();
    assert_eq!(
        err,
        FluxPowerError::ExternalFailure(
            "fake extractor failed on skewers_0_Ns50_wM0.1.hdf5".into()
        )
    );
    // no retry, no sidecar, first file left in place
    assert_eq!(extractor.requests.borrow().len(), 2);
    let skewers_dir = dirs.post.join("skewers");
    assert!(skewers_dir.join("skewers_0_Ns50_wM0.1_sT0.8.hdf5").exists());
    assert!(!skewers_dir.join("snap_skewers_0_Ns50_wM0.1.json").exists());
}

#[test]
fn test_massive_neutrinos_need_an_engine() {
    let dirs = dirs();
    let mut snapshots = FixedSnapshots::new(&[3.0]);
    snapshots.cosmology.mnu = 0.3;
    let fitter = FixedFitter::new(1e4, 1.4);
    let extractor = RecordingExtractor::default();

    let extraction = SkewerExtraction {
        raw_dir: &dirs.raw,
        post_dir: &dirs.post,
        sim_params: &snapshots,
        hubble_engine: None,
        fitter: &fitter,
        extractor: &extractor,
    };
    assert!(matches!(
        extraction.run(0, &ExtractionParams::default()),
        Err(FluxPowerError::PhysicsUnsupported(_))
    ));
    assert_eq!(fitter.calls.get(), 0);
}

#[test]
fn test_unvalidated_params_are_rejected_by_run() {
    let dirs = dirs();
    let snapshots = FixedSnapshots::new(&[3.0]);
    let fitter = FixedFitter::new(1e4, 1.4);
    let extractor = RecordingExtractor::default();

    let extraction = SkewerExtraction {
        raw_dir: &dirs.raw,
        post_dir: &dirs.post,
        sim_params: &snapshots,
        hubble_engine: None,
        fitter: &fitter,
        extractor: &extractor,
    };
    let params = ExtractionParams {
        axis: Some(7),
        n_skewers: 0,
        ..Default::default()
    };

    assert!(matches!(
        extraction.run(0, &params),
        Err(FluxPowerError::ConfigurationError(_))
    ));
    let params = ExtractionParams {
        width_mpc: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        extraction.run(0, &params),
        Err(FluxPowerError::InvalidExtractionParameter(_))
    ));

    assert_eq!(fitter.calls.get(), 0);
    assert!(extractor.requests.borrow().is_empty());
    assert!(!dirs.post.join("skewers_7").exists());
    assert!(!dirs.post.join("skewers").exists());
}
