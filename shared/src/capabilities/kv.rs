use crux_kv::error::KeyValueError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind};

pub const USER_DATA_PREFIX: &str = "userdata";
pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 5 * 1024 * 1024;

/// What `crux_kv` hands back to `update` for a get or a set.
pub type KvResult = Result<Option<Vec<u8>>, KeyValueError>;

/// A validated key in the shell's store, always `userdata:<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey(String);

impl KvKey {
    pub fn user_data(key: &str) -> Result<Self, KvError> {
        Self::validate_key(key)?;
        Ok(Self(format!("{USER_DATA_PREFIX}:{key}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        let invalid = |reason: &str| KvError::InvalidKey {
            key: key.chars().take(50).collect(),
            reason: reason.to_string(),
        };

        if key.trim().is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(invalid("key exceeds maximum length"));
        }
        if key.chars().any(char::is_control) {
            return Err(invalid("key contains control characters"));
        }
        if key.contains(':') {
            return Err(invalid("key cannot contain the namespace separator"));
        }

        Ok(())
    }
}

/// Rejects payloads the shell's store would refuse, before any request is made.
pub fn check_value_size(value: &[u8]) -> Result<(), KvError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {0}")]
    Storage(#[from] KeyValueError),
}

impl KvError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(KeyValueError::Timeout))
    }
}

impl From<KvError> for AppError {
    fn from(err: KvError) -> Self {
        let kind = match &err {
            KvError::InvalidKey { .. } => ErrorKind::Internal,
            KvError::Storage(KeyValueError::Timeout) => ErrorKind::Timeout,
            KvError::ValueTooLarge { .. } | KvError::Storage(_) => ErrorKind::Storage,
        };
        Self::new(kind, "Local storage failed").with_internal(err.to_string())
    }
}
