use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Holds the control parameters of the constitutive integrator
///
/// All tolerances are relative to characteristic magnitudes of the increment
/// (stress scale `max(‖σn‖, ‖σtr‖, ‖Dₑ:Δε‖)` and internal-value scale), so
/// the same configuration works across unit systems.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// Relative tolerance of the yield function `f ≤ tol σchar` for accepting elastic states
    pub yield_tolerance: f64,

    /// Relative tolerance of the stress and internal-value residuals in the return mapping
    pub residual_tolerance: f64,

    /// Absolute floor added to all residual tolerances
    pub absolute_tolerance: f64,

    /// Maximum number of Newton iterations per (sub-)step
    pub max_iterations: usize,

    /// Number of equal sub-steps to start the integration with
    pub initial_substeps: usize,

    /// Maximum number of sub-steps; the smallest pseudo-time fraction is 1/max_substeps
    pub max_substeps: usize,

    /// Maximum rotation (radians) of the flow direction within one accepted sub-step
    pub max_flow_rotation: f64,

    /// Relative perturbation for the finite-difference derivatives of flow and rates
    pub perturbation: f64,
}

impl IntegratorConfig {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        IntegratorConfig {
            yield_tolerance: 1e-8,
            residual_tolerance: 1e-10,
            absolute_tolerance: 1e-14,
            max_iterations: 50,
            initial_substeps: 1,
            max_substeps: 4096,
            max_flow_rotation: 0.5,
            perturbation: 1e-7,
        }
    }

    /// Sets the relative tolerance of the yield function
    pub fn set_yield_tolerance(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 || value >= 1.0 {
            return Err("yield_tolerance must be in (0.0, 1.0)");
        }
        self.yield_tolerance = value;
        Ok(self)
    }

    /// Sets the relative tolerance of the residuals
    pub fn set_residual_tolerance(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 || value >= 1.0 {
            return Err("residual_tolerance must be in (0.0, 1.0)");
        }
        self.residual_tolerance = value;
        Ok(self)
    }

    /// Sets the absolute floor of the tolerances
    pub fn set_absolute_tolerance(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 {
            return Err("absolute_tolerance must be ≥ 0.0");
        }
        self.absolute_tolerance = value;
        Ok(self)
    }

    /// Sets the maximum number of Newton iterations
    pub fn set_max_iterations(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("max_iterations must be ≥ 1");
        }
        self.max_iterations = value;
        Ok(self)
    }

    /// Sets the initial number of sub-steps
    pub fn set_initial_substeps(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("initial_substeps must be ≥ 1");
        }
        if value > self.max_substeps {
            return Err("initial_substeps must be ≤ max_substeps");
        }
        self.initial_substeps = value;
        Ok(self)
    }

    /// Sets the maximum number of sub-steps
    pub fn set_max_substeps(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("max_substeps must be ≥ 1");
        }
        if value < self.initial_substeps {
            return Err("max_substeps must be ≥ initial_substeps");
        }
        self.max_substeps = value;
        Ok(self)
    }

    /// Sets the maximum rotation of the flow direction within one sub-step
    pub fn set_max_flow_rotation(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 {
            return Err("max_flow_rotation must be > 0.0");
        }
        self.max_flow_rotation = value;
        Ok(self)
    }

    /// Sets the relative perturbation for finite differences
    pub fn set_perturbation(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 || value >= 1e-2 {
            return Err("perturbation must be in (0.0, 0.01)");
        }
        self.perturbation = value;
        Ok(self)
    }

    /// Checks all values (e.g., after deserialization)
    pub fn validate(&self) -> Result<(), StrError> {
        let mut copy = IntegratorConfig::new();
        copy.set_yield_tolerance(self.yield_tolerance)?
            .set_residual_tolerance(self.residual_tolerance)?
            .set_absolute_tolerance(self.absolute_tolerance)?
            .set_max_iterations(self.max_iterations)?
            .set_max_substeps(self.max_substeps)?
            .set_initial_substeps(self.initial_substeps)?
            .set_max_flow_rotation(self.max_flow_rotation)?
            .set_perturbation(self.perturbation)?;
        Ok(())
    }

    /// Reads a JSON file with the configuration
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let file = File::open(&path).map_err(|_| "file not found")?;
        let reader = BufReader::new(file);
        let config: IntegratorConfig = serde_json::from_reader(reader).map_err(|_| "deserialize failed")?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, StrError> {
        let config: IntegratorConfig = serde_json::from_str(json).map_err(|_| "deserialize failed")?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig::new()
    }
}

impl fmt::Display for IntegratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Integrator configuration\n")?;
        write!(f, "========================\n")?;
        write!(f, "yield_tolerance = {:?}\n", self.yield_tolerance)?;
        write!(f, "residual_tolerance = {:?}\n", self.residual_tolerance)?;
        write!(f, "absolute_tolerance = {:?}\n", self.absolute_tolerance)?;
        write!(f, "max_iterations = {:?}\n", self.max_iterations)?;
        write!(f, "initial_substeps = {:?}\n", self.initial_substeps)?;
        write!(f, "max_substeps = {:?}\n", self.max_substeps)?;
        write!(f, "max_flow_rotation = {:?}\n", self.max_flow_rotation)?;
        write!(f, "perturbation = {:?}\n", self.perturbation)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::IntegratorConfig;

    #[test]
    fn new_and_default_work() {
        let config = IntegratorConfig::new();
        assert_eq!(config, IntegratorConfig::default());
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.initial_substeps, 1);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn setters_capture_errors() {
        let mut config = IntegratorConfig::new();
        assert_eq!(
            config.set_yield_tolerance(0.0).err(),
            Some("yield_tolerance must be in (0.0, 1.0)")
        );
        assert_eq!(
            config.set_residual_tolerance(2.0).err(),
            Some("residual_tolerance must be in (0.0, 1.0)")
        );
        assert_eq!(
            config.set_absolute_tolerance(-1.0).err(),
            Some("absolute_tolerance must be ≥ 0.0")
        );
        assert_eq!(config.set_max_iterations(0).err(), Some("max_iterations must be ≥ 1"));
        assert_eq!(config.set_initial_substeps(0).err(), Some("initial_substeps must be ≥ 1"));
        assert_eq!(
            config.set_initial_substeps(5000).err(),
            Some("initial_substeps must be ≤ max_substeps")
        );
        config.set_initial_substeps(8).unwrap();
        assert_eq!(
            config.set_max_substeps(4).err(),
            Some("max_substeps must be ≥ initial_substeps")
        );
        assert_eq!(
            config.set_max_flow_rotation(0.0).err(),
            Some("max_flow_rotation must be > 0.0")
        );
        assert_eq!(
            config.set_perturbation(0.1).err(),
            Some("perturbation must be in (0.0, 0.01)")
        );
    }

    #[test]
    fn setters_work() {
        let mut config = IntegratorConfig::new();
        config
            .set_yield_tolerance(1e-9)
            .unwrap()
            .set_max_substeps(64)
            .unwrap()
            .set_initial_substeps(4)
            .unwrap();
        assert_eq!(config.yield_tolerance, 1e-9);
        assert_eq!(config.max_substeps, 64);
        assert_eq!(config.initial_substeps, 4);
    }

    #[test]
    fn json_works() {
        let mut config = IntegratorConfig::new();
        config.set_max_iterations(12).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let read = IntegratorConfig::from_json(&json).unwrap();
        assert_eq!(read, config);

        let bad = json.replace("\"max_iterations\":12", "\"max_iterations\":0");
        assert_eq!(IntegratorConfig::from_json(&bad).err(), Some("max_iterations must be ≥ 1"));
        assert_eq!(IntegratorConfig::from_json("{").err(), Some("deserialize failed"));
        assert_eq!(
            IntegratorConfig::read_json("/tmp/elastoplast/__not_a_file__.json").err(),
            Some("file not found")
        );
    }

    #[test]
    fn display_works() {
        let config = IntegratorConfig::new();
        let text = format!("{}", config);
        assert!(text.contains("max_substeps = 4096"));
    }
}
