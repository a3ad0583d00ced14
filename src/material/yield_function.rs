use super::{BackstressAndSize, InternalLayout};
use crate::base::{t2_load, t2_split, t2_store};
use crate::StrError;
use russell_lab::Vector;
use russell_tensor::{t2_add, t2_ddot_t2, Mandel, Tensor2, SQRT_2_BY_3};

/// Holds the tolerance to detect the apex (or axis) of the yield surface, relative to ‖σ‖
const APEX_TOL: f64 = 1e-12;

/// Specifies the essential functions for yield functions
///
/// The sign convention is: f ≤ 0 admissible and f > 0 inadmissible.
pub trait YieldFunctionTrait: Send + Sync {
    /// Validates the internal layout and records the position of the variables
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError>;

    /// Calculates the yield function f(σ, Z)
    fn value(&mut self, stress: &Tensor2, z: &Vector) -> Result<f64, StrError>;

    /// Calculates the derivative of the yield function w.r.t stress
    fn df_dsigma(&mut self, df_dsigma: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError>;

    /// Calculates the derivative of the yield function w.r.t the internal values (concatenated like Z)
    fn df_dz(&mut self, df_dz: &mut Vector, stress: &Tensor2, z: &Vector) -> Result<(), StrError>;

    /// Indicates whether the stress lies on the non-smooth apex of the yield surface
    fn at_apex(&mut self, _stress: &Tensor2, _z: &Vector) -> Result<bool, StrError> {
        Ok(false)
    }

    /// Returns the names of the parameters
    fn parameter_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Returns the value of a parameter
    fn get_parameter(&self, _index: usize) -> Result<f64, StrError> {
        Err("parameter index is out of range")
    }

    /// Sets the value of a parameter
    fn set_parameter(&mut self, _index: usize, _value: f64) -> Result<(), StrError> {
        Err("parameter index is out of range")
    }
}

/// Implements the Drucker-Prager yield function with (optional) backstress
///
/// ```text
/// p = -tr(σ)/3
/// s = dev(σ)
/// ξ = s - p α
/// f = ‖ξ‖ - √(2/3) k p
/// ```
///
/// The derivatives are:
///
/// ```text
/// n = ξ / ‖ξ‖
/// df/dσ = n + ⅓ (n:α + √(2/3) k) I
/// df/dα = -p n
/// df/dk = -√(2/3) p
/// ```
///
/// At the apex (‖ξ‖ → 0) the gradient falls back to the cone axis (n = 0).
pub struct DruckerPrager {
    offsets: Option<BackstressAndSize>,
    ii: Tensor2,
    s: Tensor2,
    alpha: Tensor2,
    xi: Tensor2,
    aux: Tensor2,
}

/// Implements the von Mises yield function with (optional) backstress
///
/// ```text
/// ξ = dev(σ) - α
/// f = ‖ξ‖ - √(2/3) k
/// ```
///
/// Here, k corresponds to the uniaxial yield stress.
pub struct VonMises {
    offsets: Option<BackstressAndSize>,
    s: Tensor2,
    alpha: Tensor2,
    xi: Tensor2,
    aux: Tensor2,
}

impl DruckerPrager {
    /// Allocates a new instance
    ///
    /// The instance must be bound to an internal layout before use.
    pub fn new() -> Self {
        DruckerPrager {
            offsets: None,
            ii: Tensor2::identity(Mandel::Symmetric),
            s: Tensor2::new(Mandel::Symmetric),
            alpha: Tensor2::new(Mandel::Symmetric),
            xi: Tensor2::new(Mandel::Symmetric),
            aux: Tensor2::new(Mandel::Symmetric),
        }
    }

    /// Computes ξ and returns (p, k, ‖ξ‖)
    fn relative_stress(&mut self, stress: &Tensor2, z: &Vector) -> Result<(f64, f64, f64), StrError> {
        let offsets = self.offsets.ok_or("yield function must be bound to the internal layout")?;
        let p = t2_split(&mut self.s, stress);
        let k = z[offsets.k];
        match offsets.alpha {
            Some(a) => {
                t2_load(&mut self.alpha, &z.as_data()[a..]);
                t2_add(&mut self.xi, 1.0, &self.s, -p, &self.alpha);
            }
            None => self.xi.set_tensor(1.0, &self.s),
        }
        Ok((p, k, self.xi.norm()))
    }
}

impl YieldFunctionTrait for DruckerPrager {
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError> {
        let offsets = layout.backstress_and_size()?;
        let mandel = layout.mandel();
        self.ii = Tensor2::identity(mandel);
        self.s = Tensor2::new(mandel);
        self.alpha = Tensor2::new(mandel);
        self.xi = Tensor2::new(mandel);
        self.aux = Tensor2::new(mandel);
        self.offsets = Some(offsets);
        Ok(())
    }

    fn value(&mut self, stress: &Tensor2, z: &Vector) -> Result<f64, StrError> {
        let (p, k, norm_xi) = self.relative_stress(stress, z)?;
        Ok(norm_xi - SQRT_2_BY_3 * k * p)
    }

    fn df_dsigma(&mut self, df_dsigma: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        let (_, k, norm_xi) = self.relative_stress(stress, z)?;
        let apex = norm_xi <= APEX_TOL * stress.norm();
        let n_alpha = if apex || self.offsets.map_or(true, |o| o.alpha.is_none()) {
            0.0
        } else {
            t2_ddot_t2(&self.xi, &self.alpha) / norm_xi
        };
        let c = (n_alpha + SQRT_2_BY_3 * k) / 3.0;
        let scale = if apex { 0.0 } else { 1.0 / norm_xi };
        t2_add(df_dsigma, scale, &self.xi, c, &self.ii);
        Ok(())
    }

    fn df_dz(&mut self, df_dz: &mut Vector, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        let (p, _, norm_xi) = self.relative_stress(stress, z)?;
        let apex = norm_xi <= APEX_TOL * stress.norm();
        let offsets = self.offsets.ok_or("yield function must be bound to the internal layout")?;
        df_dz.fill(0.0);
        if let Some(a) = offsets.alpha {
            let scale = if apex { 0.0 } else { -p / norm_xi };
            self.aux.set_tensor(scale, &self.xi);
            t2_store(&mut df_dz.as_mut_data()[a..], &self.aux);
        }
        df_dz[offsets.k] = -SQRT_2_BY_3 * p;
        Ok(())
    }

    fn at_apex(&mut self, stress: &Tensor2, z: &Vector) -> Result<bool, StrError> {
        let (_, _, norm_xi) = self.relative_stress(stress, z)?;
        Ok(norm_xi <= APEX_TOL * stress.norm())
    }
}

impl VonMises {
    /// Allocates a new instance
    ///
    /// The instance must be bound to an internal layout before use.
    pub fn new() -> Self {
        VonMises {
            offsets: None,
            s: Tensor2::new(Mandel::Symmetric),
            alpha: Tensor2::new(Mandel::Symmetric),
            xi: Tensor2::new(Mandel::Symmetric),
            aux: Tensor2::new(Mandel::Symmetric),
        }
    }

    /// Computes ξ and returns (k, ‖ξ‖)
    fn relative_stress(&mut self, stress: &Tensor2, z: &Vector) -> Result<(f64, f64), StrError> {
        let offsets = self.offsets.ok_or("yield function must be bound to the internal layout")?;
        stress.deviator(&mut self.s);
        let k = z[offsets.k];
        match offsets.alpha {
            Some(a) => {
                t2_load(&mut self.alpha, &z.as_data()[a..]);
                t2_add(&mut self.xi, 1.0, &self.s, -1.0, &self.alpha);
            }
            None => self.xi.set_tensor(1.0, &self.s),
        }
        Ok((k, self.xi.norm()))
    }
}

impl YieldFunctionTrait for VonMises {
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError> {
        let offsets = layout.backstress_and_size()?;
        let mandel = layout.mandel();
        self.s = Tensor2::new(mandel);
        self.alpha = Tensor2::new(mandel);
        self.xi = Tensor2::new(mandel);
        self.aux = Tensor2::new(mandel);
        self.offsets = Some(offsets);
        Ok(())
    }

    fn value(&mut self, stress: &Tensor2, z: &Vector) -> Result<f64, StrError> {
        let (k, norm_xi) = self.relative_stress(stress, z)?;
        Ok(norm_xi - SQRT_2_BY_3 * k)
    }

    fn df_dsigma(&mut self, df_dsigma: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        let (_, norm_xi) = self.relative_stress(stress, z)?;
        if norm_xi <= APEX_TOL * stress.norm() {
            df_dsigma.clear();
            return Ok(());
        }
        // df/dσ = Psd : n
        self.aux.set_tensor(1.0 / norm_xi, &self.xi);
        self.aux.deviator(df_dsigma);
        Ok(())
    }

    fn df_dz(&mut self, df_dz: &mut Vector, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        let (_, norm_xi) = self.relative_stress(stress, z)?;
        let offsets = self.offsets.ok_or("yield function must be bound to the internal layout")?;
        let axis = norm_xi <= APEX_TOL * stress.norm();
        df_dz.fill(0.0);
        if let Some(a) = offsets.alpha {
            let scale = if axis { 0.0 } else { -1.0 / norm_xi };
            self.aux.set_tensor(scale, &self.xi);
            t2_store(&mut df_dz.as_mut_data()[a..], &self.aux);
        }
        df_dz[offsets.k] = -SQRT_2_BY_3;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{DruckerPrager, VonMises, YieldFunctionTrait};
    use crate::base::t2_isotropic;
    use crate::material::{InternalLayout, VariableKind};
    use russell_lab::{approx_eq, Vector};
    use russell_tensor::{Mandel, Tensor2, SQRT_2_BY_3};

    const H: f64 = 1e-6;

    fn sample_stress(mandel: Mandel) -> Tensor2 {
        Tensor2::from_matrix(
            &[
                [-12.0, 1.5, 0.0], //
                [1.5, -8.0, 0.0],  //
                [0.0, 0.0, -10.0], //
            ],
            mandel,
        )
        .unwrap()
    }

    // checks df/dσ and df/dz against central differences of f
    fn check_derivatives(model: &mut dyn YieldFunctionTrait, stress: &Tensor2, z: &Vector, tol: f64) {
        let nc = stress.vector().dim();
        let nz = z.dim();
        let mut df_dsigma = Tensor2::new(stress.mandel());
        let mut df_dz = Vector::new(nz);
        model.df_dsigma(&mut df_dsigma, stress, z).unwrap();
        model.df_dz(&mut df_dz, stress, z).unwrap();
        let mut sp = stress.clone();
        for j in 0..nc {
            let orig = sp.vector()[j];
            sp.vector_mut()[j] = orig + H;
            let fp = model.value(&sp, z).unwrap();
            sp.vector_mut()[j] = orig - H;
            let fm = model.value(&sp, z).unwrap();
            sp.vector_mut()[j] = orig;
            approx_eq(df_dsigma.vector()[j], (fp - fm) / (2.0 * H), tol);
        }
        let mut zp = z.clone();
        for j in 0..nz {
            let orig = zp[j];
            zp[j] = orig + H;
            let fp = model.value(stress, &zp).unwrap();
            zp[j] = orig - H;
            let fm = model.value(stress, &zp).unwrap();
            zp[j] = orig;
            approx_eq(df_dz[j], (fp - fm) / (2.0 * H), tol);
        }
    }

    #[test]
    fn unbound_yield_function_fails() {
        let mut model = DruckerPrager::new();
        let stress = Tensor2::new(Mandel::Symmetric);
        let z = Vector::from(&[0.3]);
        assert_eq!(
            model.value(&stress, &z).err(),
            Some("yield function must be bound to the internal layout")
        );
        let mut model = VonMises::new();
        assert_eq!(
            model.value(&stress, &z).err(),
            Some("yield function must be bound to the internal layout")
        );
    }

    #[test]
    fn bind_captures_wrong_layout() {
        let layout = InternalLayout::new(Mandel::Symmetric, &[VariableKind::Scalar, VariableKind::Scalar]);
        let mut model = DruckerPrager::new();
        assert_eq!(
            model.bind(&layout).err(),
            Some("internal layout must be [tensor α, scalar k] or [scalar k]")
        );
    }

    #[test]
    fn drucker_prager_value_works() {
        let layout = InternalLayout::new(Mandel::Symmetric, &[VariableKind::Scalar]);
        let mut model = DruckerPrager::new();
        model.bind(&layout).unwrap();
        // isotropic compression: f = -√(2/3) k p
        let mut stress = Tensor2::new(Mandel::Symmetric);
        t2_isotropic(&mut stress, -10.0);
        let z = Vector::from(&[0.3]);
        approx_eq(model.value(&stress, &z).unwrap(), -SQRT_2_BY_3 * 0.3 * 10.0, 1e-14);
        assert!(model.at_apex(&stress, &z).unwrap());

        // the origin lies on the surface
        let zero = Tensor2::new(Mandel::Symmetric);
        assert_eq!(model.value(&zero, &z).unwrap(), 0.0);

        // apex gradient points along the axis
        let mut df_dsigma = Tensor2::new(Mandel::Symmetric);
        model.df_dsigma(&mut df_dsigma, &stress, &z).unwrap();
        approx_eq(df_dsigma.vector()[0], SQRT_2_BY_3 * 0.3 / 3.0, 1e-15);
        approx_eq(df_dsigma.vector()[3], 0.0, 1e-15);
    }

    #[test]
    fn drucker_prager_derivatives_work() {
        for mandel in [Mandel::Symmetric, Mandel::Symmetric2D] {
            let stress = sample_stress(mandel);

            let layout = InternalLayout::new(mandel, &[VariableKind::Scalar]);
            let mut model = DruckerPrager::new();
            model.bind(&layout).unwrap();
            let z = Vector::from(&[0.3]);
            assert!(!model.at_apex(&stress, &z).unwrap());
            check_derivatives(&mut model, &stress, &z, 1e-7);

            let layout = InternalLayout::new(mandel, &[VariableKind::Tensor, VariableKind::Scalar]);
            let mut model = DruckerPrager::new();
            model.bind(&layout).unwrap();
            let n = mandel.dim();
            let mut z = Vector::new(n + 1);
            z[0] = -0.05;
            z[1] = 0.02;
            z[2] = 0.03;
            z[3] = 0.01;
            z[n] = 0.4;
            check_derivatives(&mut model, &stress, &z, 1e-7);
        }
    }

    #[test]
    fn von_mises_value_works() {
        let layout = InternalLayout::new(Mandel::Symmetric, &[VariableKind::Scalar]);
        let mut model = VonMises::new();
        model.bind(&layout).unwrap();
        // uniaxial stress σ: ‖s‖ = √(2/3) |σ|
        let mut stress = Tensor2::new(Mandel::Symmetric);
        stress.vector_mut()[2] = -9.0;
        let z = Vector::from(&[9.0]);
        approx_eq(model.value(&stress, &z).unwrap(), 0.0, 1e-14);
        let z = Vector::from(&[10.0]);
        approx_eq(model.value(&stress, &z).unwrap(), -SQRT_2_BY_3, 1e-14);
    }

    #[test]
    fn von_mises_derivatives_work() {
        for mandel in [Mandel::Symmetric, Mandel::Symmetric2D] {
            let stress = sample_stress(mandel);
            let layout = InternalLayout::new(mandel, &[VariableKind::Tensor, VariableKind::Scalar]);
            let mut model = VonMises::new();
            model.bind(&layout).unwrap();
            let n = mandel.dim();
            let mut z = Vector::new(n + 1);
            z[0] = -0.5;
            z[1] = 0.2;
            z[2] = 0.3;
            z[n - 1] = 0.1;
            z[n] = 9.0;
            check_derivatives(&mut model, &stress, &z, 1e-7);
        }
    }
}
