use russell_tensor::{Mandel, Tensor2};

/// Holds samples of strain tensors along common laboratory paths
pub struct SampleStrains {}

impl SampleStrains {
    /// Returns a triaxial strain with the given axial (z) and lateral (x, y) components
    pub fn triaxial(mandel: Mandel, axial: f64, lateral: f64) -> Tensor2 {
        SampleStrains::triaxial_shear(mandel, axial, lateral, 0.0)
    }

    /// Returns a triaxial strain with an additional xy-shear (Mandel) component
    pub fn triaxial_shear(mandel: Mandel, axial: f64, lateral: f64, shear: f64) -> Tensor2 {
        let mut eps = Tensor2::new(mandel);
        eps.set_mandel_vector(1.0, &[lateral, lateral, axial, shear, 0.0, 0.0][..mandel.dim()]);
        eps
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
