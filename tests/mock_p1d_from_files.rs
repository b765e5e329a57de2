use std::fs;

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use fluxpower::{
    cosmology::{CosmologyRate, SimCosmology},
    fluxpower_errors::FluxPowerError,
    p1d_data::mock_sim::{load_mock_p1d, MockP1DParams, SimulationP1D},
};

const REFERENCE_Z: [f64; 3] = [2.0, 3.0, 4.0];
const N_K: usize = 10;

fn cosmology() -> SimCosmology {
    SimCosmology {
        h0: 67.0,
        ombh2: 0.022,
        omch2: 0.12,
        mnu: 0.0,
    }
}

fn reference_k(i: usize) -> f64 {
    0.0005 + 0.0025 * i as f64
}

fn reference_cov(iz: usize, i: usize, j: usize) -> f64 {
    let diag = if i == j { 100.0 } else { 0.0 };
    (iz + 1) as f64 * (10.0 * (i + j) as f64 + 1.0 + diag)
}

/// Cubic in k, reproduced exactly by the spline.
fn p1d_model(k: f64) -> f64 {
    0.5 + 0.2 * k - 0.05 * k * k + 0.003 * k.powi(3)
}

struct Suite {
    _tmp: tempfile::TempDir,
    basedir: Utf8PathBuf,
    data_dir: Utf8PathBuf,
}

/// Reference covariance table plus one simulated P1D at z = 4, 3, 2.
fn suite() -> Suite {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap().to_owned();
    let basedir = root.join("sims");
    let data_dir = root.join("data");
    fs::create_dir_all(basedir.join("L10_N128")).unwrap();
    fs::create_dir_all(&data_dir).unwrap();

    let mut table = String::from("z,i,j,k,cov\n");
    for (iz, z) in REFERENCE_Z.iter().enumerate() {
        for i in 0..N_K {
            for j in 0..N_K {
                table.push_str(&format!(
                    "{z},{i},{j},{},{}\n",
                    reference_k(i),
                    reference_cov(iz, i, j)
                ));
            }
        }
    }
    fs::write(data_dir.join("Chabanier2019.csv"), table).unwrap();

    let zs = vec![4.0, 3.0, 2.0];
    let k: Vec<f64> = (0..=60).map(|i| 0.05 * i as f64).collect();
    let p: Vec<f64> = k.iter().map(|&kk| p1d_model(kk)).collect();
    let sim = SimulationP1D {
        k_mpc: vec![k; zs.len()],
        p1d_mpc: vec![p; zs.len()],
        zs,
        cosmology: cosmology(),
    };
    fs::write(
        SimulationP1D::path(&basedir, "L10_N128", "Ns500_wM0.05"),
        serde_json::to_string(&sim).unwrap(),
    )
    .unwrap();

    Suite {
        _tmp: tmp,
        basedir,
        data_dir,
    }
}

fn builder(suite: &Suite) -> fluxpower::p1d_data::mock_sim::MockP1DParamsBuilder {
    MockP1DParams::builder(
        suite.basedir.clone(),
        "L10_N128",
        "Ns500_wM0.05",
        suite.data_dir.clone(),
    )
    .data_cov_label("Chabanier2019")
}

#[test]
fn test_mock_from_files_with_zrange() {
    let suite = suite();
    let params = builder(&suite)
        .data_cov_factor(2.0)
        .zmin(2.5)
        .build()
        .unwrap();

    let data = load_mock_p1d(&params, None).unwrap();
    assert_eq!(data.z(), vec![4.0, 3.0]);

    // the first reference bin sits below the first native bin at z = 2
    assert_eq!(data.k().len(), N_K - 1);
    assert_relative_eq!(data.k()[0], reference_k(1));

    let rate = CosmologyRate::new(cosmology(), None);
    for (iz, &z) in [4.0, 3.0].iter().enumerate() {
        let conversion = rate.dkms_dmpc_at(z).unwrap();
        let pk = data.pk(iz).unwrap();
        for (&k, &p) in data.k().iter().zip(pk) {
            assert_relative_eq!(p, conversion * p1d_model(k * conversion), max_relative = 1e-9);
        }
    }

    // z = 4 takes the covariance of the third reference bin, culled and doubled
    let cov = data.cov(0).unwrap();
    assert_eq!(cov.shape(), (N_K - 1, N_K - 1));
    assert_relative_eq!(cov[(0, 0)], 2.0 * reference_cov(2, 1, 1));
    assert_relative_eq!(cov[(2, 5)], 2.0 * reference_cov(2, 3, 6));
    assert_relative_eq!(data.cov(1).unwrap()[(4, 4)], 2.0 * reference_cov(1, 5, 5));
}

#[test]
fn test_mock_from_files_with_zlist() {
    let suite = suite();
    let params = builder(&suite).z_list(vec![2.1, 3.9]).build().unwrap();

    let data = load_mock_p1d(&params, None).unwrap();
    // selection keeps the native order of the simulation
    assert_eq!(data.z(), vec![4.0, 2.0]);
    assert_relative_eq!(data.cov(1).unwrap()[(0, 0)], reference_cov(0, 1, 1));
}

#[test]
fn test_missing_simulation_file() {
    let suite = suite();
    let params = MockP1DParams::builder(
        suite.basedir.clone(),
        "L10_N128",
        "Ns1000_wM0.05",
        suite.data_dir.clone(),
    )
    .build()
    .unwrap();

    assert!(matches!(
        load_mock_p1d(&params, None),
        Err(FluxPowerError::IoError(_))
    ));
}

#[test]
fn test_unknown_covariance_label() {
    let suite = suite();
    assert!(matches!(
        builder(&suite).data_cov_label("Karacayli2022").build(),
        Err(FluxPowerError::ConfigurationError(_))
    ));
}
