//! Physical constants and unit conversions used across the toolkit.
//!
//! All internal energies are atomic units (Hartree) unless a function says
//! otherwise; the conversions below are the CODATA 2018 values.

pub const HA_TO_EV: f64 = 27.211386245988;
pub const EV_TO_HA: f64 = 1.0 / HA_TO_EV;

/// One atomic unit of time in femtoseconds.
pub const AU_TO_FS: f64 = 0.02418884326585747;
pub const FS_TO_AU: f64 = 1.0 / AU_TO_FS;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_conversions_are_inverse() {
        let e = 1.37;
        assert!((e * HA_TO_EV * EV_TO_HA - e).abs() < 1e-14);
    }

    #[test]
    fn hartree_is_about_27_ev() {
        assert!((HA_TO_EV - 27.2114).abs() < 1e-4);
    }
}
