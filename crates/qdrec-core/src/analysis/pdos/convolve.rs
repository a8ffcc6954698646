//! Gaussian broadening of binned spectra.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use tracing::debug;

/// Gaussian envelope applied when resampling a binned spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Broadening {
    /// Spacing of the resampled grid, usually finer than the source grid.
    pub spacing: f64,
    /// Standard deviation of the Gaussian.
    pub width: f64,
}

/// Convolves binned data with Gaussians of the given width, resampling from
/// the source spacing `dx0` onto `broadening.spacing`.
///
/// Each source point is replaced by a Gaussian carrying its bin area
/// `dx0 * y`, so column integrals are preserved as long as the window
/// extends well past the occupied bins. The resampled grid starts at the
/// source origin and holds `floor(dx0 / spacing)` times as many points.
pub fn gaussian_convolve(
    x0: ArrayView1<'_, f64>,
    y0: ArrayView2<'_, f64>,
    dx0: f64,
    broadening: &Broadening,
) -> (Array1<f64>, Array2<f64>) {
    let mult = (dx0 / broadening.spacing) as usize;
    let n0 = y0.nrows();
    let nproj = y0.ncols();
    let n = n0 * mult;
    debug!(
        n0,
        n,
        width = broadening.width,
        "Broadening onto a resampled grid"
    );

    let x = Array1::from_shape_fn(n, |i| x0[0] + i as f64 * broadening.spacing);
    let mut y = Array2::zeros((n, nproj));

    let area = broadening.width * (2.0 * std::f64::consts::PI).sqrt();
    let alp = 0.5 / (broadening.width * broadening.width);

    for j in 0..nproj {
        for i0 in 0..n0 {
            // Spreads the source bin area over the unit-area Gaussian.
            let w = dx0 * y0[[i0, j]] / area;
            let center = x0[i0];
            for (xi, yij) in x.iter().zip(y.column_mut(j).iter_mut()) {
                let d = center - xi;
                *yij += w * (-alp * d * d).exp();
            }
        }
    }

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn single_spike_becomes_a_normalized_gaussian() {
        let x0 = array![0.0];
        let y0 = array![[1.0]];
        let broadening = Broadening {
            spacing: 0.5,
            width: 1.0,
        };
        let (x, y) = gaussian_convolve(x0.view(), y0.view(), 1.0, &broadening);

        assert_eq!(x.len(), 2);
        assert!((x[1] - 0.5).abs() < 1e-14);

        let peak = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
        assert!((y[[0, 0]] - peak).abs() < 1e-12);
        assert!((y[[1, 0]] - peak * (-0.125_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn broadening_preserves_the_integral() {
        let n0 = 81;
        let dx0 = 0.25;
        let x0 = Array1::from_shape_fn(n0, |i| -10.0 + i as f64 * dx0);
        let mut y0 = Array2::zeros((n0, 1));
        y0[[40, 0]] = 3.0;
        y0[[41, 0]] = 1.0;

        let broadening = Broadening {
            spacing: 0.05,
            width: 0.3,
        };
        let (_, y) = gaussian_convolve(x0.view(), y0.view(), dx0, &broadening);

        let source = y0.column(0).sum() * dx0;
        let resampled = y.column(0).sum() * broadening.spacing;
        assert!((source - resampled).abs() < 1e-6);
    }

    #[test]
    fn grid_grows_by_the_spacing_ratio() {
        let x0 = array![0.0, 1.0, 2.0];
        let y0 = Array2::zeros((3, 2));
        let broadening = Broadening {
            spacing: 0.25,
            width: 0.5,
        };
        let (x, y) = gaussian_convolve(x0.view(), y0.view(), 1.0, &broadening);
        assert_eq!(x.len(), 12);
        assert_eq!(y.dim(), (12, 2));
    }
}
