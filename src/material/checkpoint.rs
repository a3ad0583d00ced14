use super::MaterialPoint;
use crate::base::{Idealization, IntegratorConfig, ParamMaterial};
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the committed data of a material point for restarting an analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identification number of the point
    pub tag: usize,

    /// Material parameters
    pub model: ParamMaterial,

    /// Committed state as given by [MaterialPoint::send_self]
    pub data: Vec<f64>,
}

impl Checkpoint {
    /// Captures the committed state of a material point
    pub fn new(point: &MaterialPoint) -> Self {
        Checkpoint {
            tag: point.tag(),
            model: *point.param(),
            data: point.send_self(),
        }
    }

    /// Allocates a material point and restores the committed state
    pub fn restore(&self, ideal: &Idealization, config: &IntegratorConfig) -> Result<MaterialPoint, StrError> {
        let mut point = MaterialPoint::new(self.tag, &self.model, ideal, config)?;
        point.receive_self(&self.data)?;
        Ok(point)
    }

    /// Reads a JSON file containing the checkpoint
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let checkpoint = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(checkpoint)
    }

    /// Writes a JSON file with the checkpoint
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Checkpoint;
    use crate::base::{Idealization, IntegratorConfig, SampleParams, SampleStrains};
    use crate::material::MaterialPoint;
    use russell_tensor::Mandel;

    #[test]
    fn read_json_captures_errors() {
        assert_eq!(
            Checkpoint::read_json("/tmp/elastoplast/__not_found__.json").err(),
            Some("cannot open file")
        );
    }

    #[test]
    fn write_and_read_json_work() {
        let ideal = Idealization::new(2);
        let config = IntegratorConfig::new();
        let param = SampleParams::von_mises_armstrong_frederick();
        let mut point = MaterialPoint::new(11, &param, &ideal, &config).unwrap();
        let mut strain = SampleStrains::triaxial(Mandel::Symmetric2D, 0.0, -0.004);
        strain.vector_mut()[3] = 0.01;
        point.set_trial_strain(&strain).unwrap();
        point.commit();

        let checkpoint = Checkpoint::new(&point);
        let path = "/tmp/elastoplast/test_checkpoint.json";
        checkpoint.write_json(path).unwrap();
        let read = Checkpoint::read_json(path).unwrap();
        assert_eq!(read, checkpoint);

        let restored = read.restore(&ideal, &config).unwrap();
        assert_eq!(restored.tag(), 11);
        assert_eq!(restored.send_self(), point.send_self());
        assert_eq!(
            restored.get_stress().vector().as_data(),
            point.get_stress().vector().as_data()
        );
    }

    #[test]
    fn restore_uses_updated_parameters() {
        let ideal = Idealization::new(3);
        let config = IntegratorConfig::new();
        let param = SampleParams::drucker_prager_armstrong_frederick();
        let mut point = MaterialPoint::new(5, &param, &ideal, &config).unwrap();
        let handle = point.set_parameter("young", 8000.0).unwrap();
        let strain = SampleStrains::triaxial(Mandel::Symmetric, -0.0005, -0.00045);
        point.set_trial_strain(&strain).unwrap();
        point.commit();

        let checkpoint = Checkpoint::new(&point);
        let mut restored = checkpoint.restore(&ideal, &config).unwrap();
        assert_eq!(restored.get_parameter(handle), Ok(8000.0));

        // identical response to further loading
        let strain = SampleStrains::triaxial(Mandel::Symmetric, -0.01, -0.00045);
        point.set_trial_strain(&strain).unwrap();
        restored.set_trial_strain(&strain).unwrap();
        assert_eq!(
            restored.get_stress().vector().as_data(),
            point.get_stress().vector().as_data()
        );
    }
}
