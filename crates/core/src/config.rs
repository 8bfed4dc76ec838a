//! Message vocabulary configuration.
//!
//! Responsibilities:
//! - Hold the status, control and flag strings the lifecycle engine stamps on orders and results
//! - Load them from YAML with path-aware schema errors
//! - Reject blank vocabulary at load time rather than emitting empty fields later
//!
//! Notes:
//! - The vocabulary differs between receiving systems, so none of it is hardcoded
//! - Resolve this once at startup and share it with every [`crate::OrderGenerator`]

use crate::{OrderError, OrderResult};
use serde::Deserialize;
use std::path::Path;

/// Order control codes (ORC-1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderControl {
    pub new: String,
}

/// Order status codes (ORC-5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderStatus {
    pub in_process: String,
    pub completed: String,
}

/// Result status codes (OBR-25 and OBX-11).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultStatus {
    pub final_status: String,
    pub corrected: String,
    pub authenticated_verified: String,
}

/// Abnormal flag codes (OBX-8).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbnormalFlags {
    pub above_high_normal: String,
    pub below_low_normal: String,
    /// Sent only when a pathway explicitly requests a normal flag. May be empty.
    pub normal: String,
}

/// The status vocabulary injected into the lifecycle engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageConfig {
    order_control: OrderControl,
    order_status: OrderStatus,
    result_status: ResultStatus,
    abnormal_flags: AbnormalFlags,
    coding_system: String,
}

impl MessageConfig {
    /// Create a new `MessageConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Config`] if any required code is blank. The normal abnormal flag
    /// and the coding system may be empty.
    pub fn new(
        order_control: OrderControl,
        order_status: OrderStatus,
        result_status: ResultStatus,
        abnormal_flags: AbnormalFlags,
        coding_system: String,
    ) -> OrderResult<Self> {
        let required = [
            ("order_control.new", &order_control.new),
            ("order_status.in_process", &order_status.in_process),
            ("order_status.completed", &order_status.completed),
            ("result_status.final", &result_status.final_status),
            ("result_status.corrected", &result_status.corrected),
            (
                "result_status.authenticated_verified",
                &result_status.authenticated_verified,
            ),
            (
                "abnormal_flags.above_high_normal",
                &abnormal_flags.above_high_normal,
            ),
            (
                "abnormal_flags.below_low_normal",
                &abnormal_flags.below_low_normal,
            ),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(OrderError::Config(format!("{name} cannot be empty")));
            }
        }

        Ok(Self {
            order_control,
            order_status,
            result_status,
            abnormal_flags,
            coding_system,
        })
    }

    /// Parse a message configuration from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `result_status.final`) of the
    /// failing field when the YAML does not match the schema.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Config`] if:
    /// - the YAML does not match the schema,
    /// - any unknown keys are present (due to `#[serde(deny_unknown_fields)]`),
    /// - any required code is blank.
    pub fn from_yaml_str(yaml_text: &str) -> OrderResult<Self> {
        let wire: MessageConfigWire = parse_yaml(yaml_text, "Message config")?;
        Self::new(
            OrderControl {
                new: wire.order_control.new,
            },
            OrderStatus {
                in_process: wire.order_status.in_process,
                completed: wire.order_status.completed,
            },
            ResultStatus {
                final_status: wire.result_status.final_status,
                corrected: wire.result_status.corrected,
                authenticated_verified: wire.result_status.authenticated_verified,
            },
            AbnormalFlags {
                above_high_normal: wire.abnormal_flags.above_high_normal,
                below_low_normal: wire.abnormal_flags.below_low_normal,
                normal: wire.abnormal_flags.normal,
            },
            wire.coding_system,
        )
    }

    /// Read and parse a message configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::FileRead`] if the file cannot be read, otherwise as
    /// [`MessageConfig::from_yaml_str`].
    pub fn load(path: &Path) -> OrderResult<Self> {
        let text = std::fs::read_to_string(path).map_err(OrderError::FileRead)?;
        Self::from_yaml_str(&text)
    }

    pub fn order_control(&self) -> &OrderControl {
        &self.order_control
    }

    pub fn order_status(&self) -> &OrderStatus {
        &self.order_status
    }

    pub fn result_status(&self) -> &ResultStatus {
        &self.result_status
    }

    pub fn abnormal_flags(&self) -> &AbnormalFlags {
        &self.abnormal_flags
    }

    /// Coding system stamped on order profile and test identities, for example `WinPath`.
    pub fn coding_system(&self) -> &str {
        &self.coding_system
    }
}

/// Deserialize YAML text, reporting the failing path on a schema mismatch.
pub(crate) fn parse_yaml<T>(yaml_text: &str, what: &str) -> OrderResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(OrderError::Config(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MessageConfigWire {
    order_control: OrderControlWire,
    order_status: OrderStatusWire,
    result_status: ResultStatusWire,
    abnormal_flags: AbnormalFlagsWire,
    #[serde(default)]
    coding_system: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrderControlWire {
    new: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrderStatusWire {
    in_process: String,
    completed: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResultStatusWire {
    #[serde(rename = "final")]
    final_status: String,
    corrected: String,
    authenticated_verified: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AbnormalFlagsWire {
    above_high_normal: String,
    below_low_normal: String,
    #[serde(default)]
    normal: String,
}
