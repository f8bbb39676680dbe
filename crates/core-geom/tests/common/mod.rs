#![allow(dead_code)] // shared across integration test binaries, each uses a subset

use std::f64::consts::PI;

/// NACA 4-digit coordinates from upper TE over the LE to lower TE with
/// cosine point spacing, open trailing edge.
pub fn naca4(m: f64, p: f64, t: f64, n_side: usize) -> (Vec<f64>, Vec<f64>) {
    let mut x = Vec::with_capacity(2 * n_side - 1);
    let mut y = Vec::with_capacity(2 * n_side - 1);

    // upper side TE -> LE
    for i in 0..n_side {
        let beta = PI * i as f64 / (n_side - 1) as f64;
        let xc = (1.0 + beta.cos()) / 2.0;
        let (xu, yu, _, _) = naca4_point(m, p, t, xc);
        x.push(xu);
        y.push(yu);
    }
    // lower side LE -> TE
    for i in 1..n_side {
        let beta = PI * i as f64 / (n_side - 1) as f64;
        let xc = (1.0 - beta.cos()) / 2.0;
        let (_, _, xl, yl) = naca4_point(m, p, t, xc);
        x.push(xl);
        y.push(yl);
    }
    (x, y)
}

pub fn naca2412(n_side: usize) -> (Vec<f64>, Vec<f64>) {
    naca4(0.02, 0.4, 0.12, n_side)
}

pub fn naca0012(n_side: usize) -> (Vec<f64>, Vec<f64>) {
    naca4(0.0, 0.0, 0.12, n_side)
}

fn naca4_point(m: f64, p: f64, t: f64, xc: f64) -> (f64, f64, f64, f64) {
    let yt = 5.0
        * t
        * (0.2969 * xc.sqrt() - 0.1260 * xc - 0.3516 * xc * xc + 0.2843 * xc.powi(3)
            - 0.1015 * xc.powi(4));
    let (yc, dyc) = if m == 0.0 || p == 0.0 {
        (0.0, 0.0)
    } else if xc < p {
        (
            m / (p * p) * (2.0 * p * xc - xc * xc),
            2.0 * m / (p * p) * (p - xc),
        )
    } else {
        (
            m / (1.0 - p).powi(2) * ((1.0 - 2.0 * p) + 2.0 * p * xc - xc * xc),
            2.0 * m / (1.0 - p).powi(2) * (p - xc),
        )
    };
    let theta = dyc.atan();
    (
        xc - yt * theta.sin(),
        yc + yt * theta.cos(),
        xc + yt * theta.sin(),
        yc - yt * theta.cos(),
    )
}
