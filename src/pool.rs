//! Round-robin pool of GitHub access tokens.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, StarChartsError};
use crate::metrics::{MetricsSink, AVAILABLE_TOKENS, INVALIDATED_TOKENS};

/// A GitHub token plus its validity flag. Once invalidated it stays invalid.
pub struct Credential {
    token: SecretString,
    valid: AtomicBool,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            valid: AtomicBool::new(true),
        }
    }

    /// The raw token, for the `Authorization` header only.
    pub fn expose_secret(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Returns true if this call flipped the flag.
    fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::AcqRel)
    }
}

/// Shows only the last three characters of the token.
impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = self.token.expose_secret();
        let skip = secret.chars().count().saturating_sub(3);
        let suffix: String = secret.chars().skip(skip).collect();
        write!(f, "...{}", suffix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.to_string())
            .field("valid", &self.is_valid())
            .finish()
    }
}

pub struct CredentialPool {
    credentials: Vec<Credential>,
    next: AtomicUsize,
    metrics: Arc<dyn MetricsSink>,
}

impl CredentialPool {
    pub fn new<I, S>(tokens: I, metrics: Arc<dyn MetricsSink>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<Credential> = tokens
            .into_iter()
            .map(Into::<String>::into)
            .filter(|token| !token.trim().is_empty())
            .map(|token| Credential::new(token.trim()))
            .collect();

        debug!("creating credential pool with {} tokens", credentials.len());
        metrics.gauge(AVAILABLE_TOKENS, None, credentials.len() as f64);

        Self {
            credentials,
            next: AtomicUsize::new(0),
            metrics,
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.credentials.iter().filter(|c| c.is_valid()).count()
    }

    /// Next valid credential in rotation order.
    ///
    /// An empty pool yields `Ok(None)` and the caller goes unauthenticated. When
    /// every credential has been invalidated this gives up after `len + 1`
    /// rotations with [`StarChartsError::CredentialExhausted`].
    pub fn pick(&self) -> Result<Option<&Credential>> {
        if self.credentials.is_empty() {
            return Ok(None);
        }

        for _ in 0..=self.credentials.len() {
            let credential = &self.credentials[self.advance()];
            if credential.is_valid() {
                debug!(token = %credential, "picked credential");
                return Ok(Some(credential));
            }
        }

        Err(StarChartsError::CredentialExhausted(
            "no valid tokens left".to_string(),
        ))
    }

    /// Permanently removes a credential from rotation. Idempotent.
    pub fn invalidate(&self, credential: &Credential) {
        if credential.invalidate() {
            warn!(token = %credential, "invalidated credential");
            self.metrics.increment(INVALIDATED_TOKENS);
            self.metrics
                .gauge(AVAILABLE_TOKENS, None, self.valid_count() as f64);
        }
    }

    // Returns the current cursor and moves it one slot forward, wrapping at len.
    fn advance(&self) -> usize {
        let len = self.credentials.len();
        match self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idx| Some((idx + 1) % len))
        {
            Ok(idx) | Err(idx) => idx,
        }
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("credentials", &self.credentials)
            .field("next", &self.next.load(Ordering::Relaxed))
            .finish()
    }
}
