//! Dewpoint from temperature and relative humidity.
//!
//! Magnus approximation with the Sonntag (1990) coefficients, valid for
//! roughly −45 °C to 60 °C over water. Relative humidity is clamped to
//! (0, 100] before the logarithm.

const A: f64 = 17.62;
const B: f64 = 243.12;

/// Dewpoint in °C.
pub fn dewpoint_c(temperature_c: f64, humidity_pct: f64) -> f64 {
    let rh = humidity_pct.clamp(0.01, 100.0) / 100.0;
    let gamma = rh.ln() + A * temperature_c / (B + temperature_c);
    B * gamma / (A - gamma)
}
