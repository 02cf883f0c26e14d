//! RS256 verification against the tenant's JSON Web Key Set.
//!
//! Keys come from `https://{domain}/.well-known/jwks.json` and are cached for
//! `auth.jwks_cache_seconds`. A token whose `kid` is missing from a cached
//! set triggers a refetch, so signing-key rotation does not need a restart.
//! Fetches, successful or not, are at least `auth.jwks_min_refresh_seconds`
//! apart; inside that window the current set (or the last failure) stands.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use tracing::{debug, warn};

use crate::config::{Auth0Config, AuthConfig};
use crate::error::AppError;

use super::{AuthError, Claims, TokenVerifier, VerifyFuture};

enum KeySource {
    Remote {
        url: String,
        client: reqwest::Client,
        cache: Cache<String, Arc<JwkSet>>,
        min_refresh: Duration,
        last_fetch: Mutex<Option<Instant>>,
    },
    Static(Arc<JwkSet>),
}

pub struct Auth0Verifier {
    issuer: String,
    audience: String,
    leeway_seconds: u64,
    keys: KeySource,
}

impl Auth0Verifier {
    /// Verifier that fetches keys from the configured tenant.
    pub fn new(auth0: &Auth0Config, auth: &AuthConfig) -> Result<Self, AppError> {
        Self::with_jwks_url(auth0.issuer(), auth0.audience.clone(), auth0.jwks_url(), auth)
    }

    /// Verifier that fetches keys from an explicit JWKS endpoint.
    pub fn with_jwks_url(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks_url: impl Into<String>,
        auth: &AuthConfig,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Server(format!("failed to build JWKS client: {e}")))?;
        let ttl = auth.jwks_cache_seconds.max(1);
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl))
            .max_capacity(4)
            .build();

        Ok(Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds: auth.leeway_seconds,
            keys: KeySource::Remote {
                url: jwks_url.into(),
                client,
                cache,
                // Never longer than the TTL, or an expired set could not be replaced.
                min_refresh: Duration::from_secs(auth.jwks_min_refresh_seconds.min(ttl)),
                last_fetch: Mutex::new(None),
            },
        })
    }

    /// Verifier over a fixed key set, for offline use and tests.
    pub fn with_jwks(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks: JwkSet,
        leeway_seconds: u64,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds,
            keys: KeySource::Static(Arc::new(jwks)),
        }
    }

    /// Current key set and whether it came straight from the cache.
    ///
    /// With `refresh` the cached set is bypassed, but only if the last fetch
    /// is older than the minimum interval. The cached set is overwritten on
    /// success and kept on failure.
    async fn key_set(&self, refresh: bool) -> Result<(Arc<JwkSet>, bool), AuthError> {
        match &self.keys {
            KeySource::Static(set) => Ok((set.clone(), false)),
            KeySource::Remote {
                url,
                client,
                cache,
                min_refresh,
                last_fetch,
            } => {
                let cached = cache.get(url).await;
                if !refresh {
                    if let Some(set) = &cached {
                        return Ok((set.clone(), true));
                    }
                }
                if !claim_fetch_slot(last_fetch, *min_refresh) {
                    debug!(%url, "JWKS fetch throttled");
                    return cached.map(|set| (set, false)).ok_or_else(|| {
                        AuthError::invalid_header("Unable to find the appropriate key.")
                    });
                }
                match fetch_jwks(client, url).await {
                    Ok(set) => {
                        let set = Arc::new(set);
                        cache.insert(url.clone(), set.clone()).await;
                        Ok((set, false))
                    }
                    Err(e) => {
                        warn!(%url, "JWKS fetch failed: {e}");
                        cached.map(|set| (set, false)).ok_or_else(|| {
                            AuthError::invalid_header("Unable to find the appropriate key.")
                        })
                    }
                }
            }
        }
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)
            .map_err(|_| AuthError::invalid_header("Unable to parse authentication token."))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::invalid_header("Token must be signed with RS256."));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::invalid_header("Authorization malformed."))?;

        let (mut keys, cached) = self.key_set(false).await?;
        if keys.find(&kid).is_none() && cached {
            debug!(%kid, "kid not in cached key set, refetching");
            keys = self.key_set(true).await?.0;
        }
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| AuthError::invalid_header("Unable to find the appropriate key."))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|_| AuthError::invalid_header("Unable to find the appropriate key."))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = self.leeway_seconds;

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::token_expired(),
                ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => AuthError::invalid_claims(
                    "Incorrect claims. Please, check the audience and issuer.",
                ),
                _ => AuthError::invalid_header("Unable to parse authentication token."),
            })
    }
}

impl TokenVerifier for Auth0Verifier {
    fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a> {
        Box::pin(self.verify_token(token))
    }
}

/// Record a fetch attempt now unless one happened within `min_interval`.
fn claim_fetch_slot(last_fetch: &Mutex<Option<Instant>>, min_interval: Duration) -> bool {
    let mut last = last_fetch.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if last.is_some_and(|at| at.elapsed() < min_interval) {
        return false;
    }
    *last = Some(Instant::now());
    true
}

async fn fetch_jwks(client: &reqwest::Client, url: &str) -> Result<JwkSet, reqwest::Error> {
    debug!(%url, "fetching JWKS");
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<JwkSet>()
        .await
}
