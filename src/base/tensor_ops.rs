use crate::StrError;
use russell_lab::{mat_inverse, mat_norm, Matrix, Norm};
use russell_tensor::{Tensor2, Tensor4, IDENTITY2};

/// Holds the relative determinant below which a fourth-order tensor is regarded as singular
///
/// The determinant is scaled by `max|aᵢⱼ|ⁿ` where `n` is the dimension of the Mandel matrix.
pub const SINGULAR_TOL: f64 = 1e-14;

/// Sets an isotropic second-order tensor
///
/// ```text
/// a := α I
/// ```
pub fn t2_isotropic(a: &mut Tensor2, alpha: f64) {
    let dim = a.dim();
    a.set_mandel_vector(alpha, &IDENTITY2[..dim]);
}

/// Copies Mandel components from a slice into a tensor
///
/// # Panics
///
/// A panic will occur if the slice is shorter than the Mandel vector.
pub fn t2_load(a: &mut Tensor2, data: &[f64]) {
    let dim = a.dim();
    a.set_mandel_vector(1.0, &data[..dim]);
}

/// Copies the Mandel components of a tensor into a slice
///
/// # Panics
///
/// A panic will occur if the slice is shorter than the Mandel vector.
pub fn t2_store(data: &mut [f64], a: &Tensor2) {
    let dim = a.dim();
    data[..dim].copy_from_slice(a.vector().as_data());
}

/// Returns the mean pressure p = -tr(σ)/3 (positive in compression)
pub fn t2_pressure(a: &Tensor2) -> f64 {
    -a.invariant_sigma_m()
}

/// Splits a tensor into pressure and deviator
///
/// Returns `p = -tr(a)/3` and writes `s = dev(a)`, such that `a = s - p I`.
pub fn t2_split(s: &mut Tensor2, a: &Tensor2) -> f64 {
    a.deviator(s);
    t2_pressure(a)
}

/// Computes the inverse of a square matrix with a scale-invariant singularity check
///
/// Returns the determinant.
///
/// # Errors
///
/// Returns `"singular tensor"` if `|det| / max|aᵢⱼ|ⁿ < SINGULAR_TOL`.
pub fn matrix_inverse(ai: &mut Matrix, a: &Matrix) -> Result<f64, StrError> {
    let (m, n) = a.dims();
    if m != n || m == 0 {
        return Err("matrix must be square and non-empty");
    }
    let max = mat_norm(a, Norm::Max);
    if max == 0.0 || !max.is_finite() {
        return Err("singular tensor");
    }
    let det = mat_inverse(ai, a).map_err(|_| "singular tensor")?;
    if !det.is_finite() || f64::abs(det) / f64::powi(max, n as i32) < SINGULAR_TOL {
        return Err("singular tensor");
    }
    Ok(det)
}

/// Computes the inverse of a fourth-order tensor (Mandel matrix)
///
/// ```text
/// Ai := A⁻¹
/// ```
///
/// Returns the determinant of the Mandel matrix.
///
/// # Errors
///
/// Returns `"singular tensor"` if the relative determinant is below [SINGULAR_TOL].
pub fn t4_inverse(ai: &mut Tensor4, a: &Tensor4) -> Result<f64, StrError> {
    matrix_inverse(ai.matrix_mut(), a.matrix())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
