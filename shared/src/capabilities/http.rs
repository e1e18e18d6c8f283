use crux_http::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{AppError, ErrorKind};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_RESPONSE_BODY_SIZE: usize = 1024 * 1024;

/// What `crux_http` hands back to `update` for a bytes request.
pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

/// An absolute http(s) URL that is safe to hand to [`crux_http::Http::get`],
/// which panics on anything it cannot parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, UrlError> {
        let url = url.into();
        let invalid = |reason: String| UrlError::Invalid {
            url: truncate(&url, 100),
            reason,
        };

        if url.trim().is_empty() {
            return Err(invalid("URL cannot be empty".to_string()));
        }
        if url.len() > MAX_URL_LENGTH {
            return Err(invalid(format!(
                "URL exceeds maximum length of {MAX_URL_LENGTH} bytes"
            )));
        }

        let parsed = Url::parse(&url).map_err(|e| invalid(e.to_string()))?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(invalid(format!(
                "invalid scheme '{scheme}', only 'http' and 'https' are allowed"
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("URL must have a host".to_string()))?
            .to_lowercase();

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials in URL are not allowed".to_string()));
        }

        if is_private_host(&host) {
            return Err(UrlError::PrivateNetworkBlocked {
                url: truncate(&url, 100),
                host,
            });
        }

        Ok(Self {
            url: parsed.to_string(),
            host,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

fn is_private_host(host: &str) -> bool {
    if matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]" | "0.0.0.0") {
        return true;
    }

    if host.ends_with(".local") || host.ends_with(".localhost") || host.ends_with(".internal") {
        return true;
    }

    if host.starts_with("10.") || host.starts_with("192.168.") || host.starts_with("169.254.") {
        return true;
    }

    // 172.16.0.0/12
    if let Some(rest) = host.strip_prefix("172.") {
        if let Some(octet) = rest.split('.').next().and_then(|o| o.parse::<u8>().ok()) {
            return (16..=31).contains(&octet);
        }
    }

    false
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("private network access blocked: {url} resolves to {host}")]
    PrivateNetworkBlocked { url: String, host: String },
}

/// Status failures keep their code; everything else maps by transport kind.
impl From<crux_http::Error> for AppError {
    fn from(err: crux_http::Error) -> Self {
        let base = match &err {
            crux_http::Error::Http(e) => Self::from_http_status(status_code(e.code)),
            crux_http::Error::Timeout => Self::new(ErrorKind::Timeout, "Address lookup failed"),
            crux_http::Error::Io(_) => Self::new(ErrorKind::Network, "Address lookup failed"),
            crux_http::Error::Json(_) => {
                Self::new(ErrorKind::Deserialization, "Address lookup failed")
            }
            crux_http::Error::Url(_) => Self::new(ErrorKind::Internal, "Address lookup failed"),
        };
        base.with_internal(err.to_string())
    }
}

#[must_use]
pub fn status_code(code: StatusCode) -> u16 {
    code.into()
}
