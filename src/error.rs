use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngramError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<diesel::result::Error> for EngramError {
    fn from(err: diesel::result::Error) -> Self {
        EngramError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngramError {
    fn from(err: serde_json::Error) -> Self {
        EngramError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngramError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_variant_prefix() {
        let err = EngramError::Storage("db is gone".to_string());
        assert!(format!("{err}").contains("storage error"));
        let err: EngramError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, EngramError::Storage(_)));
    }
}
