//! Panel (parameter) distributions for repaneling.

use std::f64::consts::PI;

use core_spline::util::linspace;

/// Default leading edge bunch of a fresh distribution.
pub const LE_BUNCH_DEFAULT: f64 = 0.84;
/// Default trailing edge bunch of a fresh distribution.
pub const TE_BUNCH_DEFAULT: f64 = 0.7;

/// Cosine-like distribution of `n_points` values in 0..1 for one side.
///
/// `le_bunch` and `te_bunch` are 0..1 where 1 is the full bunching at the
/// respective edge. The TE area replaces the cosine tail with a
/// geometrically growing panel chain whose last panel is
/// `(1 - te_bunch * 0.9)` of the interior size.
pub fn side_distribution(n_points: usize, le_bunch: f64, te_bunch: f64) -> Vec<f64> {
    let ufac_start = (0.1 - le_bunch * 0.1).clamp(0.0, 0.5);
    let ufac_end = 0.65;

    let beta = linspace(ufac_start * PI, ufac_end * PI, n_points);
    let u_cos: Vec<f64> = beta.iter().map(|&b| (1.0 - b.cos()) * 0.5).collect();

    // difference chain, then shrink the TE end geometrically
    let mut du: Vec<f64> = u_cos.windows(2).map(|w| w[1] - w[0]).collect();

    let te_du_end = 1.0 - te_bunch * 0.9;
    let te_du_growth = 1.2;

    let mut ip = du.len() - 1;
    let mut du_ip = te_du_end * du[ip];
    while du_ip < du[ip] {
        du[ip] = du_ip;
        if ip == 0 {
            break;
        }
        ip -= 1;
        du_ip *= te_du_growth;
    }

    let mut u = vec![0.0; n_points];
    for (i, &d) in du.iter().enumerate() {
        u[i + 1] = u[i] + d;
    }
    let total = u[n_points - 1];
    for ui in u.iter_mut() {
        *ui /= total;
    }
    u[0] = 0.0;
    u[n_points - 1] = 1.0;
    u
}

/// Split a total panel count on upper and lower side; an odd count gives
/// the upper side one extra panel.
pub fn split_panels(n_panels: usize) -> (usize, usize) {
    if n_panels % 2 == 0 {
        (n_panels / 2, n_panels / 2)
    } else {
        (n_panels / 2 + 1, n_panels / 2)
    }
}

/// Stretch an existing knot distribution so the LE parameter moves from
/// `u_le_old` to `u_le_new` while both sides keep their relative spacing.
pub fn stretch_retain(u: &[f64], ile: usize, u_le_new: f64) -> Vec<f64> {
    let u_le_old = u[ile];
    let stretch = u_le_new / u_le_old;

    let mut out = Vec::with_capacity(u.len());
    for &ui in &u[..=ile] {
        out.push(ui * stretch);
    }
    for &ui in &u[ile + 1..] {
        out.push(u_le_new + (ui - u_le_old) * (1.0 - u_le_new) / (1.0 - u_le_old));
    }
    let last = out.len() - 1;
    out[last] = 1.0;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_spans_unit_interval() {
        let u = side_distribution(101, LE_BUNCH_DEFAULT, TE_BUNCH_DEFAULT);
        assert_eq!(u.len(), 101);
        assert_eq!(u[0], 0.0);
        assert_eq!(u[100], 1.0);
        for w in u.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn le_bunch_shrinks_first_panel() {
        let bunched = side_distribution(51, 1.0, 0.0);
        let plain = side_distribution(51, 0.0, 0.0);
        assert!(bunched[1] < plain[1]);
    }

    #[test]
    fn te_bunch_shrinks_last_panel() {
        let bunched = side_distribution(51, 0.5, 1.0);
        let plain = side_distribution(51, 0.5, 0.0);
        let last_b = bunched[50] - bunched[49];
        let last_p = plain[50] - plain[49];
        assert!(last_b < last_p);
    }

    #[test]
    fn split_odd_favours_upper() {
        assert_eq!(split_panels(200), (100, 100));
        assert_eq!(split_panels(201), (101, 100));
    }

    #[test]
    fn stretch_retain_moves_le() {
        let u = vec![0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        let out = stretch_retain(&u, 3, 0.4);
        assert_eq!(out[0], 0.0);
        assert!((out[3] - 0.4).abs() < 1e-12);
        assert_eq!(out[6], 1.0);
        // relative spacing preserved on the upper part
        assert!((out[1] / out[3] - u[1] / u[3]).abs() < 1e-12);
    }
}
