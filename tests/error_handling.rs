use github_star_charts::error::{Result, StarChartsError};
use std::error::Error;

#[test]
fn test_error_display() {
    let error = StarChartsError::RateLimited("Rate limit hit".to_string());
    assert_eq!(format!("{}", error), "Rate limit exceeded: Rate limit hit");

    let error = StarChartsError::RepositoryNotFound("caarlos0/nope".to_string());
    assert_eq!(format!("{}", error), "Repository not found: caarlos0/nope");

    let error = StarChartsError::UpstreamUnavailable("API failed".to_string());
    assert_eq!(format!("{}", error), "GitHub API unavailable: API failed");

    let error = StarChartsError::InvalidRepository("Bad name".to_string());
    assert_eq!(format!("{}", error), "Invalid repository name: Bad name");
}

#[test]
fn test_error_source() {
    let error = StarChartsError::RateLimited("Rate limit hit".to_string());
    assert!(error.source().is_none());

    let error: StarChartsError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(error.source().is_some());
}

#[test]
fn test_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: StarChartsError = io_error.into();
    assert!(matches!(error, StarChartsError::IoError(_)));
}

#[test]
fn test_client_errors() {
    assert!(StarChartsError::RepositoryNotFound("o/r".to_string()).is_client_error());
    assert!(StarChartsError::InvalidRepository("o".to_string()).is_client_error());
    assert!(StarChartsError::InvalidRequest("variant".to_string()).is_client_error());

    assert!(!StarChartsError::RateLimited("o/r".to_string()).is_client_error());
    assert!(!StarChartsError::UpstreamUnavailable("o/r".to_string()).is_client_error());
    assert!(!StarChartsError::CredentialExhausted("none left".to_string()).is_client_error());
    assert!(!StarChartsError::TooManyStars("o/r".to_string()).is_client_error());
    assert!(!StarChartsError::RenderFailure("empty".to_string()).is_client_error());
}

#[test]
fn test_result_type() {
    fn returns_result() -> Result<String> {
        Ok("success".to_string())
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), "success");

    fn returns_error() -> Result<String> {
        Err(StarChartsError::RepositoryNotFound("Not found".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
