use super::{MaterialPoint, Status};
use crate::base::{Idealization, IntegratorConfig, ParamMaterial};
use crate::StrError;
use rayon::prelude::*;
use russell_tensor::Tensor2;

/// Holds a collection of material points (e.g., all integration points of a mesh)
pub struct MaterialPoints {
    /// All points
    pub all: Vec<MaterialPoint>,
}

impl MaterialPoints {
    /// Allocates new instance with tags 0..npoint
    pub fn new(
        npoint: usize,
        param: &ParamMaterial,
        ideal: &Idealization,
        config: &IntegratorConfig,
    ) -> Result<Self, StrError> {
        let res: Result<Vec<_>, _> = (0..npoint)
            .map(|tag| MaterialPoint::new(tag, param, ideal, config))
            .collect();
        match res {
            Ok(all) => Ok(MaterialPoints { all }),
            Err(e) => Err(e),
        }
    }

    /// Returns the number of points
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Returns true if there are no points
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Sets the trial total strains (one per point)
    pub fn set_trial_strains(&mut self, strains: &[Tensor2]) -> Result<Vec<Status>, StrError> {
        if strains.len() != self.all.len() {
            return Err("the number of strains must equal the number of points");
        }
        self.all
            .iter_mut()
            .zip(strains)
            .map(|(point, strain)| point.set_trial_strain(strain))
            .collect()
    }

    /// Sets the trial total strains (one per point) in parallel
    ///
    /// All points are updated even if some of them fail; the first error is returned.
    pub fn set_trial_strains_parallel(&mut self, strains: &[Tensor2]) -> Result<Vec<Status>, StrError> {
        if strains.len() != self.all.len() {
            return Err("the number of strains must equal the number of points");
        }
        let results: Vec<Result<Status, StrError>> = self
            .all
            .par_iter_mut()
            .zip(strains.par_iter())
            .map(|(point, strain)| point.set_trial_strain(strain))
            .collect();
        results.into_iter().collect()
    }

    /// Commits the trial state of all points
    pub fn commit_all(&mut self) {
        self.all.par_iter_mut().for_each(|point| point.commit());
    }

    /// Discards the trial state of all points
    pub fn revert_all(&mut self) {
        self.all.par_iter_mut().for_each(|point| point.revert_to_last_commit());
    }

    /// Resets all points to the ground state
    pub fn revert_all_to_start(&mut self) {
        self.all.par_iter_mut().for_each(|point| point.revert_to_start());
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::MaterialPoints;
    use crate::base::{Idealization, IntegratorConfig, SampleParams, SampleStrains};
    use crate::material::Status;
    use russell_tensor::{Mandel, Tensor2};

    #[test]
    fn parallel_matches_sequential() {
        let ideal = Idealization::new(3);
        let config = IntegratorConfig::new();
        let param = SampleParams::von_mises();
        let mut seq = MaterialPoints::new(8, &param, &ideal, &config).unwrap();
        let mut par = MaterialPoints::new(8, &param, &ideal, &config).unwrap();
        assert_eq!(seq.len(), 8);
        assert!(!seq.is_empty());
        let strains: Vec<Tensor2> = (0..8)
            .map(|i| SampleStrains::triaxial(Mandel::Symmetric, -0.001 * (i as f64), 0.0003 * (i as f64)))
            .collect();
        let status_seq = seq.set_trial_strains(&strains).unwrap();
        let status_par = par.set_trial_strains_parallel(&strains).unwrap();
        assert_eq!(status_seq, status_par);
        assert_eq!(status_seq[0], Status::ElasticConverged);
        assert_eq!(status_seq[7], Status::PlasticConverged);
        for (a, b) in seq.all.iter().zip(par.all.iter()) {
            assert_eq!(a.get_stress().vector().as_data(), b.get_stress().vector().as_data());
        }

        par.commit_all();
        par.revert_all();
        for (a, b) in seq.all.iter().zip(par.all.iter()) {
            assert_eq!(a.get_stress().vector().as_data(), b.get_stress().vector().as_data());
        }
        par.revert_all_to_start();
        assert_eq!(par.all[7].get_strain().vector().as_data(), &[0.0; 6]);
    }

    #[test]
    fn set_trial_strains_captures_errors() {
        let ideal = Idealization::new(3);
        let config = IntegratorConfig::new();
        let mut points = MaterialPoints::new(2, &SampleParams::von_mises(), &ideal, &config).unwrap();
        let strains = vec![Tensor2::new(Mandel::Symmetric)];
        assert_eq!(
            points.set_trial_strains(&strains).err(),
            Some("the number of strains must equal the number of points")
        );
        assert_eq!(
            points.set_trial_strains_parallel(&strains).err(),
            Some("the number of strains must equal the number of points")
        );
    }
}
