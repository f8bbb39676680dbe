//! Air properties at 15 °C sea level and Reynolds number conversions.

/// Density in kg/m^3.
pub const RHO: f64 = 1.225;
/// Dynamic viscosity in kg/(m s).
pub const ETA: f64 = 1.789e-5;
/// Gravitational acceleration in m/s^2.
pub const G: f64 = 9.81;

/// Reynolds number from speed (m/s) and chord (m), rounded to 1000.
pub fn re_from_v(v: f64, chord: f64) -> f64 {
    let re = v * chord * RHO / ETA;
    (re / 1000.0).round() * 1000.0
}

/// Speed in m/s for a Reynolds number and chord (m), rounded to 1 dp.
pub fn v_from_re(re: f64, chord: f64) -> f64 {
    let v = re * ETA / (chord * RHO);
    (v * 10.0).round() / 10.0
}

/// `Re*sqrt(cl)` for a chord (m) and wing loading (kg/m^2): the constant
/// of a type 2 polar.
pub fn re_sqrt_cl(chord: f64, load: f64) -> f64 {
    let re = chord * RHO.sqrt() / ETA * (2.0 * G * load).sqrt();
    (re / 1000.0).round() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_round_trip() {
        let re = re_from_v(20.0, 0.2);
        assert_eq!(re % 1000.0, 0.0);
        let v = v_from_re(re, 0.2);
        assert!((v - 20.0).abs() <= 0.05);
    }

    #[test]
    fn re_sqrt_cl_magnitude() {
        // 20 cm chord at 4 kg/m^2 is glider territory, a few hundred k
        let resc = re_sqrt_cl(0.2, 4.0);
        assert!(resc > 100_000.0 && resc < 200_000.0, "resc = {resc}");
    }
}
