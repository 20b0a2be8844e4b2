use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarChartsError {
    #[error("No valid credential available: {0}")]
    CredentialExhausted(String),

    #[error("Credential is invalid: {0}")]
    InvalidCredential(String),

    #[error("Credential usage is too high: {0}")]
    CredentialTooHot(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Invalid repository name: {0}")]
    InvalidRepository(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("GitHub API unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Repository has too many stargazers: {0}")]
    TooManyStars(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Failed to render chart: {0}")]
    RenderFailure(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StarChartsError {
    /// Errors caused by the caller's input. Everything else is upstream or
    /// internal trouble and gets masked by a fallback chart.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StarChartsError::RepositoryNotFound(_)
                | StarChartsError::InvalidRepository(_)
                | StarChartsError::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StarChartsError>;
