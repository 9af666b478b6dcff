use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

impl EngineError {
    pub(crate) fn invalid(name: &'static str, reason: &'static str) -> Self {
        EngineError::InvalidParameter { name, reason }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
