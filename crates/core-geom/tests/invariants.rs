//! Property tests over randomly parameterized NACA-style airfoils.

mod common;

use core_geom::modify::PanelCount;
use core_geom::Geometry;
use core_geom::Strategy as GeoStrategy;
use proptest::prelude::*;

fn arb_airfoil() -> impl proptest::strategy::Strategy<Value = (Vec<f64>, Vec<f64>)> {
    // camber 0..4%, position 20..60%, thickness 8..18%, 21..81 side points
    (0.0f64..0.04, 0.2f64..0.6, 0.08f64..0.18, 10usize..40)
        .prop_map(|(m, p, t, n)| common::naca4(m, p, t, 2 * n + 1))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn normalize_establishes_invariants((x, y) in arb_airfoil()) {
        let mut geo = Geometry::new(x, y, GeoStrategy::Splined).unwrap();
        geo.normalize().unwrap();

        let ile = geo.ile();
        prop_assert_eq!(geo.x()[ile], 0.0);
        prop_assert_eq!(geo.y()[ile], 0.0);
        prop_assert_eq!(geo.x()[0], 1.0);
        prop_assert_eq!(*geo.x().last().unwrap(), 1.0);
        prop_assert_eq!(*geo.y().last().unwrap(), -geo.y()[0]);

        let (xr, yr) = geo.le_real();
        prop_assert!((xr * xr + yr * yr).sqrt() <= 1e-6);
    }

    #[test]
    fn normalize_is_idempotent((x, y) in arb_airfoil()) {
        let mut geo = Geometry::new(x, y, GeoStrategy::Splined).unwrap();
        geo.normalize().unwrap();
        let x1 = geo.x().to_vec();
        let y1 = geo.y().to_vec();

        geo.normalize().unwrap();
        for (a, b) in x1.iter().zip(geo.x().iter()) {
            prop_assert!((a - b).abs() < 1e-10);
        }
        for (a, b) in y1.iter().zip(geo.y().iter()) {
            prop_assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn sides_concatenate((x, y) in arb_airfoil()) {
        let mut geo = Geometry::new(x, y, GeoStrategy::Splined).unwrap();
        geo.normalize().unwrap();

        let mut cx: Vec<f64> = geo.upper().x().iter().rev().copied().collect();
        cx.extend_from_slice(&geo.lower().x()[1..]);
        prop_assert_eq!(cx, geo.x().to_vec());
    }

    #[test]
    fn repanel_preserves_shape((x, y) in arb_airfoil()) {
        let mut geo = Geometry::new(x, y, GeoStrategy::Splined).unwrap();
        geo.normalize().unwrap();
        let hp = geo.upper().highpoint().1;

        geo.repanel(PanelCount::Total(180), 0.84, 0.7).unwrap();
        prop_assert_eq!(geo.n_panels(), 180);
        prop_assert!((geo.upper().highpoint().1 - hp).abs() < 1e-4);
    }

    #[test]
    fn shoelace_area_counter_clockwise((x, y) in arb_airfoil()) {
        let mut area = 0.0;
        for i in 0..x.len() - 1 {
            area += x[i] * y[i + 1] - x[i + 1] * y[i];
        }
        prop_assert!(area >= 0.0);
    }
}
