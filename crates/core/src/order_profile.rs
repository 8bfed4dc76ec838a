//! Order profiles: named panels of tests with their reference data.
//!
//! Responsibilities:
//! - Define the profile and test-type reference data the lifecycle engine consumes
//! - Load profiles from YAML and stamp identities with the configured coding system
//!
//! Notes:
//! - Profile files are hand-edited, so scalar fields may be written as YAML numbers
//! - Profiles and tests are kept in name order so random selection is reproducible per seed
//!
//! File shape:
//!
//! ```yaml
//! UREA AND ELECTROLYTES:
//!   universal_service_id: lpdc-3969
//!   test_types:
//!     Creatinine:
//!       id: lpdc-2012
//!       value_type: NM
//!       unit: UMOLL
//!       ref_range: 49 - 92
//! ```

use crate::config::{parse_yaml, MessageConfig};
use crate::{OrderError, OrderResult};
use hl7::ValueType;
use labsim_types::CodedElement;
use rand::seq::IteratorRandom;
use rand::RngCore;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

/// One test within a profile.
#[derive(Clone, Debug, PartialEq)]
pub struct TestType {
    pub identity: CodedElement,
    pub value_type: Option<ValueType>,
    pub unit: String,
    pub reference_range: String,
    /// Value used when a random value is requested but the reference range is not numeric.
    pub default_value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderProfile {
    pub identity: CodedElement,
    pub test_types: BTreeMap<String, TestType>,
}

impl OrderProfile {
    pub fn test_type(&self, name: &str) -> Option<&TestType> {
        self.test_types.get(name)
    }
}

/// Read-only profile reference data, shared by concurrent generation calls.
pub trait OrderProfileLookup {
    /// Returns the profile called `name`, if known.
    fn resolve(&self, name: &str) -> Option<&OrderProfile>;

    /// Picks a profile uniformly at random. `None` if no profiles are loaded.
    fn random_profile(&self, rng: &mut dyn RngCore) -> Option<&OrderProfile>;
}

#[derive(Clone, Debug, Default)]
pub struct OrderProfiles {
    profiles: BTreeMap<String, OrderProfile>,
}

impl OrderProfiles {
    /// Parse order profiles from YAML text.
    ///
    /// # Arguments
    ///
    /// * `yaml_text` - YAML mapping of profile name to profile.
    /// * `config` - Supplies the coding system stamped on every identity.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Config`] if the YAML does not match the schema.
    pub fn from_yaml_str(yaml_text: &str, config: &MessageConfig) -> OrderResult<Self> {
        let wire: BTreeMap<String, OrderProfileWire> = parse_yaml(yaml_text, "Order profiles")?;
        let coding_system = config.coding_system();

        let profiles = wire
            .into_iter()
            .map(|(name, profile)| {
                let test_types = profile
                    .test_types
                    .into_iter()
                    .map(|(test_name, test)| {
                        let test_type = TestType {
                            identity: CodedElement::new(test.id, test_name.clone(), coding_system),
                            value_type: ValueType::parse(&test.value_type),
                            unit: test.unit,
                            reference_range: test.ref_range,
                            default_value: test.value,
                        };
                        (test_name, test_type)
                    })
                    .collect();
                let profile = OrderProfile {
                    identity: CodedElement::new(
                        profile.universal_service_id,
                        name.clone(),
                        coding_system,
                    ),
                    test_types,
                };
                (name, profile)
            })
            .collect();

        Ok(Self { profiles })
    }

    /// Read and parse an order profiles file.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::FileRead`] if the file cannot be read, otherwise as
    /// [`OrderProfiles::from_yaml_str`].
    pub fn load(path: &Path, config: &MessageConfig) -> OrderResult<Self> {
        let text = std::fs::read_to_string(path).map_err(OrderError::FileRead)?;
        Self::from_yaml_str(&text, config)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl OrderProfileLookup for OrderProfiles {
    fn resolve(&self, name: &str) -> Option<&OrderProfile> {
        self.profiles.get(name)
    }

    fn random_profile(&self, rng: &mut dyn RngCore) -> Option<&OrderProfile> {
        self.profiles.values().choose(rng)
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrderProfileWire {
    #[serde(deserialize_with = "scalar_string")]
    universal_service_id: String,
    #[serde(default)]
    test_types: BTreeMap<String, TestTypeWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestTypeWire {
    #[serde(deserialize_with = "scalar_string")]
    id: String,
    #[serde(default, deserialize_with = "scalar_string")]
    value_type: String,
    #[serde(default, deserialize_with = "scalar_string")]
    value: String,
    #[serde(default, deserialize_with = "scalar_string")]
    unit: String,
    #[serde(default, deserialize_with = "scalar_string")]
    ref_range: String,
}

/// Accepts a string, number, boolean or null and returns its text. Null becomes empty.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => String::new(),
        Some(Scalar::Text(s)) => s,
        Some(Scalar::Integer(i)) => i.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        Some(Scalar::Bool(b)) => b.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    const CONFIG_YAML: &str = r#"
order_control: { new: NW }
order_status: { in_process: IP, completed: CM }
result_status: { final: F, corrected: C, authenticated_verified: AUTHVRF }
abnormal_flags: { above_high_normal: H, below_low_normal: L }
coding_system: WinPath
"#;

    const PROFILES_YAML: &str = r#"
UREA AND ELECTROLYTES:
  universal_service_id: lpdc-3969
  test_types:
    Creatinine:
      id: lpdc-2012
      value_type: NM
      unit: UMOLL
      ref_range: 49 - 92
    Potassium:
      id: 2804
      value_type: NM
      unit: MMOLL
      ref_range: 3.5 - 5.3
17-OH Prog:
  universal_service_id: OHPROG-P
  test_types:
    17-Hydroxy Progesterone:
      id: OHPROG
      value_type: TX
      value: 9.5
      ref_range: "<=9.6^^<=9.6"
"#;

    fn config() -> MessageConfig {
        MessageConfig::from_yaml_str(CONFIG_YAML).expect("config should parse")
    }

    #[test]
    fn resolves_profiles_and_tests() {
        let profiles =
            OrderProfiles::from_yaml_str(PROFILES_YAML, &config()).expect("profiles should parse");
        assert_eq!(profiles.len(), 2);

        let urea = profiles
            .resolve("UREA AND ELECTROLYTES")
            .expect("profile should exist");
        assert_eq!(
            urea.identity,
            CodedElement::new("lpdc-3969", "UREA AND ELECTROLYTES", "WinPath")
        );

        let creatinine = urea.test_type("Creatinine").expect("test should exist");
        assert_eq!(
            creatinine,
            &TestType {
                identity: CodedElement::new("lpdc-2012", "Creatinine", "WinPath"),
                value_type: Some(ValueType::Numeric),
                unit: "UMOLL".into(),
                reference_range: "49 - 92".into(),
                default_value: String::new(),
            }
        );
        assert!(urea.test_type("Bar").is_none());
        assert!(profiles.resolve("ARBITRARY").is_none());
    }

    #[test]
    fn numeric_scalars_become_text() {
        let profiles =
            OrderProfiles::from_yaml_str(PROFILES_YAML, &config()).expect("profiles should parse");
        let potassium = profiles
            .resolve("UREA AND ELECTROLYTES")
            .and_then(|p| p.test_type("Potassium"))
            .expect("test should exist");
        assert_eq!(potassium.identity.id, "2804");
        assert_eq!(potassium.reference_range, "3.5 - 5.3");

        let hydroxy = profiles
            .resolve("17-OH Prog")
            .and_then(|p| p.test_type("17-Hydroxy Progesterone"))
            .expect("test should exist");
        assert_eq!(hydroxy.default_value, "9.5");
        assert_eq!(hydroxy.value_type, Some(ValueType::Text));
    }

    #[test]
    fn random_profile_is_a_loaded_profile() {
        let profiles =
            OrderProfiles::from_yaml_str(PROFILES_YAML, &config()).expect("profiles should parse");
        let names: Vec<&str> = profiles.names().collect();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let profile = profiles
                .random_profile(&mut rng)
                .expect("profiles are loaded");
            assert!(names.contains(&profile.identity.text.as_str()));
        }
        assert!(OrderProfiles::default()
            .random_profile(&mut rng)
            .is_none());
    }

    #[test]
    fn rejects_unknown_test_fields() {
        let yaml = PROFILES_YAML.replace("unit: UMOLL", "units: UMOLL");
        let err = OrderProfiles::from_yaml_str(&yaml, &config()).expect_err("should fail");
        match err {
            OrderError::Config(msg) => assert!(
                msg.contains("UREA AND ELECTROLYTES.test_types.Creatinine"),
                "{msg}"
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(PROFILES_YAML.as_bytes()).expect("write profiles");
        let profiles = OrderProfiles::load(file.path(), &config()).expect("profiles should load");
        assert_eq!(
            profiles.names().collect::<Vec<_>>(),
            vec!["17-OH Prog", "UREA AND ELECTROLYTES"]
        );
    }
}
