use std::sync::atomic::{AtomicU64, Ordering};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::GeneratorError;

/// Hostname used when the OS lookup fails or returns nothing.
pub const FALLBACK_HOSTNAME: &str = "localhost";

/// Length of the random token embedded in every prefix.
pub const TOKEN_LEN: usize = 10;

const TOKEN_RAW_BYTES: usize = 12;

/// Configuration for building a [`RequestIdGenerator`]
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Hostname override; `None` asks the OS (default: `None`)
    pub hostname: Option<String>,
    /// Upper bound on random token draws before giving up (default: 16)
    pub max_token_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            max_token_attempts: 16,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed hostname instead of the OS lookup
    pub fn hostname<S: Into<String>>(mut self, hostname: S) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the maximum number of random token draws
    pub fn max_token_attempts(mut self, attempts: usize) -> Self {
        self.max_token_attempts = attempts;
        self
    }
}

/// Process-wide request identifier source.
///
/// Identifiers look like `web-1/aZ3kQ9bQ1x-000042`: a per-process prefix
/// (hostname plus a random token) followed by a zero-padded counter. Build one
/// instance at startup and share it (`Arc`) with every interceptor so the
/// process has a single counter.
#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Build a generator from the local hostname and a fresh random token.
    pub fn new() -> Result<Self, GeneratorError> {
        Self::with_config(GeneratorConfig::default())
    }

    pub fn with_config(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let hostname = match config.hostname {
            Some(h) if !h.is_empty() => h,
            Some(_) => FALLBACK_HOSTNAME.to_string(),
            None => local_hostname(),
        };
        let token = random_token(&mut OsRng, config.max_token_attempts)?;
        let generator = Self::with_prefix(format!("{}/{}", hostname, token));
        tracing::info!(prefix = %generator.prefix, "request id generator ready");
        Ok(generator)
    }

    /// Build a generator around a caller-chosen prefix.
    pub fn with_prefix<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of identifiers handed out so far
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Produce the next identifier. Never fails, safe to call concurrently.
    pub fn generate(&self) -> String {
        // fetch_add is a single atomic RMW, so every caller sees a distinct value
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        format!("{}-{:06}", self.prefix, n)
    }
}

fn local_hostname() -> String {
    let name = gethostname::gethostname();
    let name = name.to_string_lossy();
    if name.trim().is_empty() {
        FALLBACK_HOSTNAME.to_string()
    } else {
        name.into_owned()
    }
}

/// Draw random bytes, base64 them and drop `+` and `/` until at least
/// [`TOKEN_LEN`] characters remain.
pub(crate) fn random_token<R: TryRngCore>(
    rng: &mut R,
    max_attempts: usize,
) -> Result<String, GeneratorError> {
    let mut buf = [0u8; TOKEN_RAW_BYTES];
    for attempt in 1..=max_attempts {
        if let Err(e) = rng.try_fill_bytes(&mut buf) {
            tracing::warn!(attempt, error = %e, "random source failed while drawing prefix token");
            continue;
        }
        let mut token: String = STANDARD
            .encode(buf)
            .chars()
            .filter(|c| *c != '+' && *c != '/')
            .collect();
        if token.len() >= TOKEN_LEN {
            token.truncate(TOKEN_LEN);
            return Ok(token);
        }
    }
    Err(GeneratorError::TokenExhausted {
        len: TOKEN_LEN,
        attempts: max_attempts,
    })
}
