//! Doctor registry.
//!
//! Doctors are loaded from a YAML list:
//!
//! ```yaml
//! - id: "C1234"
//!   surname: "Osman"
//!   firstname: "Arthur"
//!   prefix: "Dr"
//!   specialty: "Renal"
//! ```

use crate::config::parse_yaml;
use crate::{OrderError, OrderResult};
use hl7::Doctor;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Read-only lookup of doctors, shared by concurrent generation calls.
pub trait DoctorRegistry {
    /// Picks a doctor uniformly at random. `None` if the registry is empty.
    fn random(&self, rng: &mut dyn RngCore) -> Option<&Doctor>;

    fn lookup(&self, id: &str) -> Option<&Doctor>;
}

#[derive(Clone, Debug, Default)]
pub struct Doctors {
    doctors: Vec<Doctor>,
    by_id: HashMap<String, usize>,
}

impl Doctors {
    /// Parse a doctor list from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Config`] if the YAML does not match the schema, or if an ID is
    /// blank or repeated.
    pub fn from_yaml_str(yaml_text: &str) -> OrderResult<Self> {
        let wire: Vec<DoctorWire> = parse_yaml(yaml_text, "Doctors")?;

        let mut doctors = Self::default();
        for (index, doctor) in wire.into_iter().enumerate() {
            if doctor.id.trim().is_empty() {
                return Err(OrderError::Config(format!("doctor [{index}] has no id")));
            }
            if doctors.by_id.contains_key(&doctor.id) {
                return Err(OrderError::Config(format!(
                    "doctor id {:?} is listed more than once",
                    doctor.id
                )));
            }
            doctors.by_id.insert(doctor.id.clone(), doctors.doctors.len());
            doctors.doctors.push(Doctor {
                id: doctor.id,
                surname: doctor.surname,
                first_name: doctor.firstname,
                prefix: doctor.prefix,
                specialty: doctor.specialty,
            });
        }
        Ok(doctors)
    }

    /// Read and parse a doctors file.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::FileRead`] if the file cannot be read, otherwise as
    /// [`Doctors::from_yaml_str`].
    pub fn load(path: &Path) -> OrderResult<Self> {
        let text = std::fs::read_to_string(path).map_err(OrderError::FileRead)?;
        Self::from_yaml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.doctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty()
    }
}

impl DoctorRegistry for Doctors {
    fn random(&self, rng: &mut dyn RngCore) -> Option<&Doctor> {
        self.doctors.choose(rng)
    }

    fn lookup(&self, id: &str) -> Option<&Doctor> {
        self.by_id.get(id).and_then(|&index| self.doctors.get(index))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DoctorWire {
    id: String,
    #[serde(default)]
    surname: String,
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    specialty: String,
}
