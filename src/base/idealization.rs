use crate::StrError;
use russell_tensor::Mandel;
use serde::{Deserialize, Serialize};

/// Defines the geometry idealization of a material point (3D or plane-strain)
///
/// Plane-stress is not supported by the return-mapping algorithm because the
/// out-of-plane stress constraint is not part of the local residual.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Idealization {
    /// Indicates 2D (plane-strain) instead of 3D
    pub two_dim: bool,

    /// Indicates a plane-stress idealization in 2D
    pub plane_stress: bool,
}

impl Idealization {
    /// Allocates a new instance
    ///
    /// * `2D`: plane-strain
    /// * `3D`: no idealization
    pub fn new(ndim: usize) -> Self {
        Idealization {
            two_dim: ndim == 2,
            plane_stress: false,
        }
    }

    /// Returns the symmetric Mandel representation associated with the idealization
    ///
    /// # Results
    ///
    /// * `2D`: [Mandel::Symmetric2D]
    /// * `3D`: [Mandel::Symmetric]
    pub fn mandel(&self) -> Mandel {
        if self.two_dim {
            Mandel::Symmetric2D
        } else {
            Mandel::Symmetric
        }
    }

    /// Returns the number of Mandel components (4 in 2D, 6 in 3D)
    pub fn n_components(&self) -> usize {
        if self.two_dim {
            4
        } else {
            6
        }
    }

    /// Checks whether the idealization can be used with elastoplastic models
    pub fn validate(&self) -> Result<(), StrError> {
        if self.plane_stress {
            return Err("elastoplastic models do not work in plane-stress");
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Idealization;
    use russell_tensor::Mandel;

    #[test]
    fn derive_works() {
        let ideal = Idealization::new(2);
        let mut clone = ideal.clone();
        assert_eq!(format!("{:?}", ideal), "Idealization { two_dim: true, plane_stress: false }");
        clone.plane_stress = true;
        assert_eq!(format!("{:?}", clone), "Idealization { two_dim: true, plane_stress: true }");
        assert_ne!(ideal, clone);
    }

    #[test]
    fn mandel_works() {
        let ideal = Idealization::new(2);
        assert_eq!(ideal.mandel(), Mandel::Symmetric2D);
        assert_eq!(ideal.n_components(), 4);

        let ideal = Idealization::new(3);
        assert_eq!(ideal.mandel(), Mandel::Symmetric);
        assert_eq!(ideal.n_components(), 6);
    }

    #[test]
    fn validate_works() {
        let mut ideal = Idealization::new(2);
        assert_eq!(ideal.validate(), Ok(()));
        ideal.plane_stress = true;
        assert_eq!(ideal.validate().err(), Some("elastoplastic models do not work in plane-stress"));
    }
}
