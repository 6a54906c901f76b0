use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("city not found: {0}")]
    CityNotFound(String),

    #[error("{0} provider is not configured")]
    NotConfigured(&'static str),

    /// Network failure, timeout, quota exhaustion or any non-success status.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CityNotFound(_) => "city_not_found",
            Self::NotConfigured(_) => "not_configured",
            Self::Unavailable(_) => "unavailable",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Unavailable(error.to_string())
        }
    }
}

pub(crate) async fn ensure_success(
    response: reqwest::Response,
    label: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Unavailable(format!(
        "{label} non-success status {}: {}",
        status.as_u16(),
        body.chars().take(240).collect::<String>()
    )))
}
