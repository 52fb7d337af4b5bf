//! Unitary matrix utilities for single-qubit gates.
//!
//! Provides 2x2 unitary matrix operations for single-qubit gate merging and
//! synthesis: multiplication, adjoint, ZYZ decomposition and principal
//! square roots.

use num_complex::Complex64;
use std::f64::consts::PI;

use qcbench_ir::StandardGate;

/// Tolerance for floating point comparisons.
pub(crate) const EPSILON: f64 = 1e-10;

/// Euler angles of a single-qubit unitary: `U = e^{i phase} Rz(beta) Ry(gamma) Rz(delta)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZyzAngles {
    /// Global phase.
    pub phase: f64,
    /// Outer (last applied) Z rotation.
    pub beta: f64,
    /// Y rotation, in `[0, pi]`.
    pub gamma: f64,
    /// Inner (first applied) Z rotation.
    pub delta: f64,
}

impl ZyzAngles {
    /// The same rotation as a `U(theta, phi, lambda)` gate plus the global
    /// phase that gate is off by.
    pub fn to_u3(&self) -> (f64, f64, f64, f64) {
        (
            self.gamma,
            self.beta,
            self.delta,
            self.phase - (self.beta + self.delta) / 2.0,
        )
    }
}

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 unitary matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0))
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = 1.0 / 2.0_f64.sqrt();
        Self::new(c(s, 0.0), c(s, 0.0), c(s, 0.0), c(-s, 0.0))
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        Self::new(c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0))
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        Self::new(c(0.0, 0.0), c(0.0, -1.0), c(0.0, 1.0), c(0.0, 0.0))
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        Self::p(PI)
    }

    /// Create an SX gate (sqrt(X)).
    pub fn sx() -> Self {
        Self::new(c(0.5, 0.5), c(0.5, -0.5), c(0.5, -0.5), c(0.5, 0.5))
    }

    /// Create an RX rotation.
    pub fn rx(theta: f64) -> Self {
        let (s, co) = (theta / 2.0).sin_cos();
        Self::new(c(co, 0.0), c(0.0, -s), c(0.0, -s), c(co, 0.0))
    }

    /// Create an RY rotation.
    pub fn ry(theta: f64) -> Self {
        let (s, co) = (theta / 2.0).sin_cos();
        Self::new(c(co, 0.0), c(-s, 0.0), c(s, 0.0), c(co, 0.0))
    }

    /// Create an RZ rotation.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            c(0.0, 0.0),
            c(0.0, 0.0),
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Create a phase gate `diag(1, e^{i lambda})`.
    pub fn p(lambda: f64) -> Self {
        Self::new(
            c(1.0, 0.0),
            c(0.0, 0.0),
            c(0.0, 0.0),
            Complex64::from_polar(1.0, lambda),
        )
    }

    /// Create a generic `U(theta, phi, lambda)` gate.
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let (s, co) = (theta / 2.0).sin_cos();
        Self::new(
            c(co, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(co, phi + lambda),
        )
    }

    /// Matrix of a single-qubit standard gate, `None` for multi-qubit gates.
    pub fn from_standard(gate: &StandardGate) -> Option<Self> {
        let u = match *gate {
            StandardGate::I => Self::identity(),
            StandardGate::X => Self::x(),
            StandardGate::Y => Self::y(),
            StandardGate::Z => Self::z(),
            StandardGate::H => Self::h(),
            StandardGate::S => Self::p(PI / 2.0),
            StandardGate::Sdg => Self::p(-PI / 2.0),
            StandardGate::T => Self::p(PI / 4.0),
            StandardGate::Tdg => Self::p(-PI / 4.0),
            StandardGate::SX => Self::sx(),
            StandardGate::SXdg => Self::sx().dagger(),
            StandardGate::Rx(t) => Self::rx(t),
            StandardGate::Ry(t) => Self::ry(t),
            StandardGate::Rz(t) => Self::rz(t),
            StandardGate::P(l) => Self::p(l),
            StandardGate::U(t, p, l) => Self::u(t, p, l),
            _ => return None,
        };
        Some(u)
    }

    /// Matrix product `self * other` (apply `other` first).
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, cc, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, cc * e + d * g, cc * f + d * h)
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        let [a, b, cc, d] = self.data;
        Self::new(a.conj(), cc.conj(), b.conj(), d.conj())
    }

    /// Determinant.
    pub fn det(&self) -> Complex64 {
        self.data[0] * self.data[3] - self.data[1] * self.data[2]
    }

    /// Check if the matrix equals `other` up to a global phase.
    pub fn equiv(&self, other: &Self) -> bool {
        let overlap: Complex64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.conj() * b)
            .sum();
        (overlap.norm() - 2.0).abs() < 1e-9
    }

    /// Check if the matrix is the identity up to a global phase.
    pub fn is_identity(&self) -> bool {
        self.equiv(&Self::identity())
    }

    /// Check if the matrix is exactly Pauli-X (no phase).
    pub fn is_pauli_x(&self) -> bool {
        let x = Self::x();
        self.data
            .iter()
            .zip(x.data.iter())
            .all(|(a, b)| (a - b).norm() < EPSILON)
    }

    /// ZYZ decomposition: `U = e^{i phase} Rz(beta) Ry(gamma) Rz(delta)`.
    ///
    /// The Y angle is taken from `atan2` of the column magnitudes so that
    /// matrices with rounding noise never produce NaN.
    pub fn zyz(&self) -> ZyzAngles {
        let phase = self.det().arg() / 2.0;
        let correction = Complex64::from_polar(1.0, -phase);
        // V = e^{-i phase} U is in SU(2): [[x, -y*], [y, x*]]
        let x = self.data[0] * correction;
        let y = self.data[2] * correction;

        let gamma = 2.0 * y.norm().atan2(x.norm());
        let sum = if x.norm() > EPSILON { -2.0 * x.arg() } else { 0.0 };
        let diff = if y.norm() > EPSILON { 2.0 * y.arg() } else { 0.0 };

        ZyzAngles {
            phase,
            beta: (sum + diff) / 2.0,
            gamma,
            delta: (sum - diff) / 2.0,
        }
    }

    /// A square root `V` with `V * V == self`.
    ///
    /// Uses the axis-angle form `U = e^{i a} (cos h I - i sin h n.sigma)`
    /// and halves both the phase and the rotation angle.
    pub fn sqrt(&self) -> Self {
        let alpha = self.det().arg() / 2.0;
        let correction = Complex64::from_polar(1.0, -alpha);
        let x = self.data[0] * correction;
        let y = self.data[2] * correction;

        let s = (x.im * x.im + y.norm_sqr()).sqrt();
        let half = s.atan2(x.re);
        let (nx, ny, nz) = if s > EPSILON {
            (-y.im / s, y.re / s, -x.im / s)
        } else {
            (0.0, 0.0, 1.0)
        };

        let (sn, co) = (half / 2.0).sin_cos();
        let ph = Complex64::from_polar(1.0, alpha / 2.0);
        let i = c(0.0, 1.0);
        Self::new(
            ph * (c(co, 0.0) - i * sn * nz),
            ph * (-i * sn * c(nx, -ny)),
            ph * (-i * sn * c(nx, ny)),
            ph * (c(co, 0.0) + i * sn * nz),
        )
    }

    /// Normalize an angle to `(-pi, pi]`.
    pub fn normalize_angle(angle: f64) -> f64 {
        let mut a = angle % (2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        } else if a <= -PI {
            a += 2.0 * PI;
        }
        a
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

#[inline]
fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn rebuild(z: &ZyzAngles) -> Unitary2x2 {
        let scale = Complex64::from_polar(1.0, z.phase);
        let m = Unitary2x2::rz(z.beta) * Unitary2x2::ry(z.gamma) * Unitary2x2::rz(z.delta);
        Unitary2x2 {
            data: m.data.map(|v| v * scale),
        }
    }

    fn exact_eq(a: &Unitary2x2, b: &Unitary2x2) -> bool {
        a.data
            .iter()
            .zip(b.data.iter())
            .all(|(x, y)| (x - y).norm() < 1e-9)
    }

    #[test]
    fn test_identity() {
        let i = Unitary2x2::identity();
        assert!(i.is_identity());
        assert!(approx_eq(i.det().re, 1.0));
    }

    #[test]
    fn test_hadamard_squared() {
        let h = Unitary2x2::h();
        assert!((h * h).is_identity());
    }

    #[test]
    fn test_s_squared_is_z() {
        let s = Unitary2x2::from_standard(&StandardGate::S).unwrap();
        assert!(exact_eq(&(s * s), &Unitary2x2::z()));
    }

    #[test]
    fn test_sx_squared_is_x() {
        assert!(exact_eq(&(Unitary2x2::sx() * Unitary2x2::sx()), &Unitary2x2::x()));
    }

    #[test]
    fn test_zyz_reconstructs_exactly() {
        let cases = [
            Unitary2x2::h(),
            Unitary2x2::x(),
            Unitary2x2::y(),
            Unitary2x2::sx(),
            Unitary2x2::rz(0.3),
            Unitary2x2::u(1.1, -0.4, 2.7),
            Unitary2x2::p(0.9) * Unitary2x2::rx(-2.2),
            Unitary2x2::identity(),
        ];
        for u in cases {
            let z = u.zyz();
            assert!(z.gamma.is_finite());
            assert!(exact_eq(&rebuild(&z), &u), "{u:?}");
        }
    }

    #[test]
    fn test_zyz_hadamard_angles() {
        let z = Unitary2x2::h().zyz();
        assert!(approx_eq(z.gamma, PI / 2.0));
    }

    #[test]
    fn test_zyz_noisy_identity_is_not_nan() {
        let mut u = Unitary2x2::identity();
        u.data[0] = c(1.0 + 1e-16, 0.0);
        let z = u.zyz();
        assert!(z.gamma.is_finite());
        assert!(z.gamma.abs() < 1e-7);
    }

    #[test]
    fn test_to_u3_matches_up_to_phase() {
        let u = Unitary2x2::rx(0.7) * Unitary2x2::rz(-1.3);
        let (theta, phi, lambda, phase) = u.zyz().to_u3();
        let g = Unitary2x2::u(theta, phi, lambda);
        let scaled = Unitary2x2 {
            data: g.data.map(|v| v * Complex64::from_polar(1.0, phase)),
        };
        assert!(exact_eq(&scaled, &u));
    }

    #[test]
    fn test_sqrt() {
        let cases = [
            Unitary2x2::x(),
            Unitary2x2::h(),
            Unitary2x2::identity(),
            Unitary2x2::u(0.4, 1.9, -0.8),
            Unitary2x2::p(2.0),
        ];
        for u in cases {
            let v = u.sqrt();
            assert!(exact_eq(&(v * v), &u), "{u:?}");
        }
    }

    #[test]
    fn test_is_pauli_x() {
        assert!(Unitary2x2::x().is_pauli_x());
        assert!(!Unitary2x2::rx(PI).is_pauli_x());
    }

    #[test]
    fn test_normalize_angle() {
        assert!(approx_eq(Unitary2x2::normalize_angle(3.0 * PI), PI));
        assert!(approx_eq(Unitary2x2::normalize_angle(-PI), PI));
        assert!(approx_eq(Unitary2x2::normalize_angle(0.5), 0.5));
    }
}
