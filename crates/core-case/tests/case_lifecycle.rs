//! Direct design and optimize case lifecycles on a temp directory.

use std::f64::consts::PI;
use std::fs;

use core_airfoil::{Airfoil, UsedAs};
use core_case::{AsBezierCase, DirectDesignCase, OptimizeCase};
use core_geom::Strategy;
use core_worker::OptimizerState;
use tempfile::tempdir;

fn write_seed_dat(path: &std::path::Path) {
    let n_side = 31;
    let yt = |x: f64| {
        0.6 * (0.2969 * x.sqrt() - 0.126 * x - 0.3516 * x * x + 0.2843 * x.powi(3)
            - 0.1015 * x.powi(4))
    };
    let mut text = String::from("Seedfoil\n");
    for i in 0..n_side {
        let b = PI * i as f64 / (n_side - 1) as f64;
        let xc: f64 = (1.0 + b.cos()) / 2.0;
        text.push_str(&format!("{:.7} {:.7}\n", xc, yt(xc)));
    }
    for i in 1..n_side {
        let b = PI * i as f64 / (n_side - 1) as f64;
        let xc: f64 = (1.0 - b.cos()) / 2.0;
        text.push_str(&format!("{:.7} {:.7}\n", xc, -yt(xc)));
    }
    fs::write(path, text).unwrap();
}

#[test]
fn direct_design_creates_and_numbers_designs() {
    let dir = tempdir().unwrap();
    let seed_path = dir.path().join("Seedfoil.dat");
    write_seed_dat(&seed_path);

    let mut case = DirectDesignCase::new(Airfoil::from_file(&seed_path)).unwrap();
    assert!(case.design_dir_abs().is_dir());
    assert_eq!(case.design_dir(), "Seedfoil_designs");

    // first design is a normalized splined copy saved as Design___0
    let working = case.initial_airfoil_design().unwrap();
    assert!(working.is_edited());
    assert_eq!(case.designs().len(), 1);
    let first = &case.designs()[0];
    assert_eq!(first.file_name().unwrap(), "Design___0.dat");
    assert_eq!(first.used_as(), UsedAs::Design);
    assert!(first.path_abs().unwrap().is_file());
    assert_eq!(first.geometry().unwrap().strategy(), Strategy::Splined);
    assert!(first.is_normalized());

    // the next design gets number 1
    let second = case.add_design(&working).unwrap();
    assert_eq!(second.file_name().unwrap(), "Design___1.dat");
    assert_eq!(case.designs().len(), 2);
}

#[test]
fn existing_designs_are_reread_sorted() {
    let dir = tempdir().unwrap();
    let seed_path = dir.path().join("Seedfoil.dat");
    write_seed_dat(&seed_path);

    {
        let mut case = DirectDesignCase::new(Airfoil::from_file(&seed_path)).unwrap();
        let working = case.initial_airfoil_design().unwrap();
        case.add_design(&working).unwrap();
        case.add_design(&working).unwrap();
        // no close: designs stay on disk
    }

    let case = DirectDesignCase::new(Airfoil::from_file(&seed_path)).unwrap();
    let names: Vec<String> = case
        .designs()
        .iter()
        .filter_map(|a| a.file_name())
        .collect();
    assert_eq!(
        names,
        vec!["Design___0.dat", "Design___1.dat", "Design___2.dat"]
    );
}

#[test]
fn remove_design_returns_neighbour_and_keeps_first() {
    let dir = tempdir().unwrap();
    let seed_path = dir.path().join("Seedfoil.dat");
    write_seed_dat(&seed_path);

    let mut case = DirectDesignCase::new(Airfoil::from_file(&seed_path)).unwrap();
    let working = case.initial_airfoil_design().unwrap();
    case.add_design(&working).unwrap();
    case.add_design(&working).unwrap();

    let next = case.remove_design("Design___1.dat").unwrap();
    assert_eq!(next.file_name().unwrap(), "Design___2.dat");
    assert!(!case.design_dir_abs().join("Design___1.dat").exists());

    // the initial design cannot be removed once it is the only one
    case.remove_design("Design___2.dat").unwrap();
    assert!(case.remove_design("Design___0.dat").is_none());
}

#[test]
fn final_from_design_names_mod() {
    let dir = tempdir().unwrap();
    let seed_path = dir.path().join("Seedfoil.dat");
    write_seed_dat(&seed_path);

    let mut case = DirectDesignCase::new(Airfoil::from_file(&seed_path)).unwrap();
    let working = case.initial_airfoil_design().unwrap();

    let final_airfoil = case.get_final_from_design(&working).unwrap();
    assert_eq!(final_airfoil.name(), "Seedfoil_mod");
    assert_eq!(
        final_airfoil.path_abs().unwrap(),
        dir.path().join("Seedfoil_mod.dat")
    );
}

#[test]
fn close_removes_single_design_dir() {
    let dir = tempdir().unwrap();
    let seed_path = dir.path().join("Seedfoil.dat");
    write_seed_dat(&seed_path);

    let mut case = DirectDesignCase::new(Airfoil::from_file(&seed_path)).unwrap();
    case.initial_airfoil_design().unwrap();
    let design_dir = case.design_dir_abs();
    assert!(design_dir.is_dir());
    case.close();
    assert!(!design_dir.exists());
}

#[test]
fn as_bezier_case_fits_seed() {
    let dir = tempdir().unwrap();
    let seed_path = dir.path().join("Seedfoil.dat");
    write_seed_dat(&seed_path);

    let mut case = AsBezierCase::new(Airfoil::from_file(&seed_path)).unwrap();
    // the conversion lands next to the seed
    assert!(dir.path().join("Seedfoil_bezier.bez").is_file());
    assert_eq!(case.case().design_dir(), "Seedfoil_bezier_designs");

    let working = case.case_mut().initial_airfoil_design().unwrap();
    assert_eq!(
        working.geometry().unwrap().strategy(),
        Strategy::Bezier
    );
    // designs of an as-bezier case are .bez files
    assert_eq!(
        case.case().designs()[0].file_name().unwrap(),
        "Design___0.bez"
    );
}

#[test]
fn optimize_case_round_trip() {
    let dir = tempdir().unwrap();
    write_seed_dat(&dir.path().join("Seedfoil.dat"));
    let input_path = dir.path().join("glider.inp");
    fs::write(
        &input_path,
        "&optimization_options\n  airfoil_file = 'Seedfoil.dat'\n  shape_functions = 'bezier'\n/\n",
    )
    .unwrap();

    let case = OptimizeCase::new(&input_path, None).unwrap();
    assert_eq!(case.out_name(), "glider");
    assert_eq!(case.state(), OptimizerState::NotReady);
    assert!(!case.is_running());
    assert!(!case.is_finished());
    assert!(case.airfoil_seed().is_some());
    assert_eq!(
        case.result_airfoil_path(),
        dir.path().join("glider.dat")
    );

    // without executable a run fails, the case stays consistent
    assert!(case.run().is_err());
    case.close();
}

#[test]
fn optimize_is_finished_checks_result_freshness() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("glider.inp");
    fs::write(&input_path, "&optimization_options\n/\n").unwrap();

    // with an executable path set the state is Ready
    let case = OptimizeCase::new(&input_path, Some("/bin/true".into())).unwrap();
    assert_eq!(case.state(), OptimizerState::Ready);
    assert!(!case.is_finished());

    // result dir older than the result airfoil: finished
    fs::create_dir_all(case.result_dir()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(case.result_airfoil_path(), "glider\n1.0 0.0\n0.0 0.0\n1.0 0.0\n").unwrap();
    assert!(case.is_finished());
}
