//! Postal-code address lookup against a ViaCEP-shaped service.
//!
//! The core never performs I/O: [`LookupConfig::build_request`] produces the
//! URL and request id, the app sends it through `crux_http`, and [`interpret`]
//! turns whatever came back into a [`LookupOutcome`]. [`LookupTracker`] hands
//! out sequence numbers so only the newest response is applied.

use crux_http::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{
    status_code, HttpResult, UrlError, ValidatedUrl, MAX_RESPONSE_BODY_SIZE,
};
use crate::{AppError, ErrorKind, DEFAULT_LOOKUP_BASE_URL, POSTAL_CODE_DIGITS};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("postal code must have {expected} digits, got {got}")]
    InvalidPostalCode { expected: usize, got: usize },

    #[error("invalid lookup config: {0}")]
    InvalidConfig(UrlError),

    #[error("lookup transport failed: {0}")]
    Transport(crux_http::Error),

    #[error("lookup service answered {status}")]
    Status { status: u16 },

    #[error("lookup response too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("lookup response could not be decoded: {0}")]
    Decode(crux_http::Error),
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Transport(e) => e.into(),
            LookupError::Status { status } => Self::from_http_status(status),
            LookupError::Decode(_) | LookupError::TooLarge { .. } => {
                Self::new(ErrorKind::Deserialization, "Address lookup failed")
                    .with_internal(err.to_string())
            }
            LookupError::InvalidPostalCode { .. } | LookupError::InvalidConfig(_) => {
                Self::new(ErrorKind::Validation, err.to_string())
            }
        }
    }
}

/// Keeps only the digits of whatever the user typed.
#[must_use]
pub fn normalize_postal_code(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[must_use]
pub fn is_complete_postal_code(digits: &str) -> bool {
    digits.len() == POSTAL_CODE_DIGITS && digits.chars().all(|c| c.is_ascii_digit())
}

/// Where lookups go. The request timeout belongs to the shell's HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    base_url: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOOKUP_BASE_URL.to_string(),
        }
    }
}

impl LookupConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LookupError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        ValidatedUrl::new(lookup_url(&base_url, &"0".repeat(POSTAL_CODE_DIGITS)))
            .map_err(LookupError::InvalidConfig)?;

        Ok(Self { base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base_url}/{cep}/json/`. `cep` must already be normalized.
    pub fn build_request(&self, cep: &str) -> Result<LookupRequest, LookupError> {
        if !is_complete_postal_code(cep) {
            return Err(LookupError::InvalidPostalCode {
                expected: POSTAL_CODE_DIGITS,
                got: cep.len(),
            });
        }

        let url = ValidatedUrl::new(lookup_url(&self.base_url, cep))
            .map_err(LookupError::InvalidConfig)?;

        Ok(LookupRequest {
            url,
            request_id: uuid::Uuid::new_v4().to_string(),
        })
    }
}

fn lookup_url(base_url: &str, cep: &str) -> String {
    format!("{base_url}/{cep}/json/")
}

/// A lookup ready to hand to `crux_http`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub url: ValidatedUrl,
    /// Sent as [`REQUEST_ID_HEADER`] and logged on both ends.
    pub request_id: String,
}

/// Address fields a successful lookup fills in. Missing ones are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub uf: String,
    pub city: String,
    pub neighborhood: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(AddressFields),
    NotFound,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViaCepBody {
    uf: Option<String>,
    localidade: Option<String>,
    bairro: Option<String>,
    logradouro: Option<String>,
    erro: Option<serde_json::Value>,
}

impl ViaCepBody {
    // The service has answered both `true` and `"true"` here.
    fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// `crux_http` reports 4xx/5xx as `Error::Http`; a 404 there means not found.
pub fn interpret(result: HttpResult) -> Result<LookupOutcome, LookupError> {
    let mut response = match result {
        Ok(response) => response,
        Err(crux_http::Error::Http(e)) if e.code == StatusCode::NotFound => {
            return Ok(LookupOutcome::NotFound);
        }
        Err(crux_http::Error::Http(e)) => {
            return Err(LookupError::Status {
                status: status_code(e.code),
            });
        }
        Err(e) => return Err(LookupError::Transport(e)),
    };

    let size = response.body().map_or(0, Vec::len);
    if size > MAX_RESPONSE_BODY_SIZE {
        return Err(LookupError::TooLarge {
            size,
            max: MAX_RESPONSE_BODY_SIZE,
        });
    }

    let body: ViaCepBody = response.body_json().map_err(LookupError::Decode)?;
    if body.is_not_found() {
        return Ok(LookupOutcome::NotFound);
    }

    Ok(LookupOutcome::Found(AddressFields {
        uf: body.uf.unwrap_or_default(),
        city: body.localidade.unwrap_or_default(),
        neighborhood: body.bairro.unwrap_or_default(),
        address: body.logradouro.unwrap_or_default(),
    }))
}

/// Last-write-wins bookkeeping for in-flight lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupTracker {
    latest: u64,
    outstanding: Option<u64>,
}

impl LookupTracker {
    /// Starts a new lookup; any earlier one becomes stale.
    pub fn begin(&mut self) -> u64 {
        self.latest = self.latest.wrapping_add(1);
        self.outstanding = Some(self.latest);
        self.latest
    }

    pub fn invalidate(&mut self) {
        self.outstanding = None;
    }

    /// True (and the lookup is settled) only for the outstanding sequence number.
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.outstanding == Some(seq) {
            self.outstanding = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    #[must_use]
    pub const fn outstanding(&self) -> Option<u64> {
        self.outstanding
    }
}
