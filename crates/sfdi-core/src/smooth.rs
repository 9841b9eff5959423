//! Separable Gaussian smoothing of reflectance maps.
//!
//! Matches the common array-processing convention: kernel radius
//! `int(4·sigma + 0.5)`, discrete samples of the Gaussian normalized to
//! unit sum, and reflected boundary handling (`a b c | c b a`). A
//! non-positive sigma is a passthrough.

use nalgebra::DMatrix;

/// Reflect an out-of-range index back into `0..len`.
fn reflect_index(i: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut j = i.rem_euclid(period);
    if j >= len {
        j = period - 1 - j;
    }
    j as usize
}

/// Discrete Gaussian kernel of radius `int(4·sigma + 0.5)`, unit sum.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);
    for k in -(radius as isize)..=(radius as isize) {
        let x = k as f64;
        kernel.push((-x * x * inv_two_sigma2).exp());
    }
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Convolve one axis with the kernel, reflecting at the borders.
fn convolve_rows(src: &DMatrix<f64>, kernel: &[f64]) -> DMatrix<f64> {
    let (rows, cols) = src.shape();
    let radius = kernel.len() as isize / 2;
    DMatrix::from_fn(rows, cols, |r, c| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let rr = reflect_index(r as isize + k as isize - radius, rows);
                w * src[(rr, c)]
            })
            .sum()
    })
}

fn convolve_cols(src: &DMatrix<f64>, kernel: &[f64]) -> DMatrix<f64> {
    let (rows, cols) = src.shape();
    let radius = kernel.len() as isize / 2;
    DMatrix::from_fn(rows, cols, |r, c| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let cc = reflect_index(c as isize + k as isize - radius, cols);
                w * src[(r, cc)]
            })
            .sum()
    })
}

/// Smooth `map` with an isotropic Gaussian of width `sigma`.
///
/// `sigma <= 0` returns the input unchanged.
pub fn gaussian_smooth(map: &DMatrix<f64>, sigma: f64) -> DMatrix<f64> {
    if sigma <= 0.0 {
        return map.clone_owned();
    }
    let kernel = gaussian_kernel(sigma);
    convolve_cols(&convolve_rows(map, &kernel), &kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn noise(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(rows, cols, |_, _| rng.gen::<f64>())
    }

    #[test]
    fn test_nonpositive_sigma_is_passthrough() {
        let m = noise(5, 7, 1);
        assert_eq!(gaussian_smooth(&m, 0.0), m);
        assert_eq!(gaussian_smooth(&m, -2.0), m);
    }

    #[test]
    fn test_constant_field_is_invariant() {
        // Unit kernel sum plus reflected borders keep a constant constant.
        let m = DMatrix::from_element(6, 9, 3.25);
        let s = gaussian_smooth(&m, 2.0);
        for &v in s.iter() {
            assert_relative_eq!(v, 3.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_shape_preserved() {
        let m = noise(4, 11, 2);
        assert_eq!(gaussian_smooth(&m, 1.5).shape(), (4, 11));
    }

    #[test]
    fn test_smoothing_reduces_variance() {
        let m = noise(16, 16, 3);
        let s = gaussian_smooth(&m, 1.0);

        let var = |x: &DMatrix<f64>| {
            let mean = x.mean();
            x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / x.len() as f64
        };
        assert!(var(&s) < var(&m));
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 0);
        assert_eq!(reflect_index(-2, 5), 1);
        assert_eq!(reflect_index(5, 5), 4);
        assert_eq!(reflect_index(6, 5), 3);
        assert_eq!(reflect_index(2, 5), 2);
    }
}
