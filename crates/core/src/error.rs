use crate::reference_range::RangeError;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown test {test_name:?} in order profile {order_profile:?}")]
    UnknownTest {
        order_profile: String,
        test_name: String,
    },
    #[error("invalid reference range for test {test_name:?}: {source}")]
    InvalidRange {
        test_name: String,
        #[source]
        source: RangeError,
    },

    #[error("{operation}: {source}")]
    NoteGenerator {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type OrderResult<T> = std::result::Result<T, OrderError>;
