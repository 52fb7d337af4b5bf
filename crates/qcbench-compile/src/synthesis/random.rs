//! Haar-random unitaries.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::PI;

use crate::matrix::Matrix;

/// Standard complex Gaussian sample via Box-Muller.
fn complex_gaussian<R: Rng + ?Sized>(rng: &mut R) -> Complex64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let radius = (-2.0 * u1.ln()).sqrt();
    Complex64::from_polar(radius, 2.0 * PI * u2)
}

/// Draw a `dim x dim` unitary from the Haar measure.
///
/// Columns of a complex Gaussian matrix are orthonormalised with modified
/// Gram-Schmidt, which is equivalent to a QR factorisation with a positive
/// real diagonal in `R`.
pub fn haar_unitary<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Matrix {
    let mut columns: Vec<Vec<Complex64>> = Vec::with_capacity(dim);
    while columns.len() < dim {
        let mut v: Vec<Complex64> = (0..dim).map(|_| complex_gaussian(rng)).collect();
        for q in &columns {
            let proj: Complex64 = q.iter().zip(v.iter()).map(|(a, b)| a.conj() * b).sum();
            for (vi, qi) in v.iter_mut().zip(q.iter()) {
                *vi -= proj * qi;
            }
        }
        let norm = v.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
        // Degenerate draws are astronomically unlikely; redraw if one happens.
        if norm < 1e-12 {
            continue;
        }
        for vi in &mut v {
            *vi /= norm;
        }
        columns.push(v);
    }
    Matrix::from_fn(dim, |r, c| columns[c][r])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_haar_unitary_is_unitary() {
        let mut rng = SmallRng::seed_from_u64(1);
        for dim in [2, 4, 8] {
            assert!(haar_unitary(dim, &mut rng).is_unitary(1e-10));
        }
    }

    #[test]
    fn test_haar_unitary_is_seeded() {
        let a = haar_unitary(4, &mut SmallRng::seed_from_u64(42));
        let b = haar_unitary(4, &mut SmallRng::seed_from_u64(42));
        let c = haar_unitary(4, &mut SmallRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
