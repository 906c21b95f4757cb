//! Memoizing wrapper around a [`PriceSource`], scoped to a credential epoch.
//!
//! Entries stay valid while the same credential is in use. The first lookup
//! under a different credential discards every entry before doing anything
//! else. Failed lookups are cached as well, so a code that failed once is not
//! retried within the same epoch. Empty product codes are never cached.

use super::{LookupError, PriceSource};
use crate::domain::{Credential, LookupResult, ProductCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub size: usize,
}

#[derive(Debug)]
pub struct PriceCache {
    source: Arc<dyn PriceSource>,
    entries: HashMap<ProductCode, LookupResult>,
    /// SHA-256 of the credential the entries belong to.
    epoch: Option<String>,
    timeout: Option<Duration>,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

impl PriceCache {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            epoch: None,
            timeout: None,
            hits: 0,
            misses: 0,
            invalidations: 0,
        }
    }

    /// Give up on a lookup after `timeout`. A timed-out lookup yields an
    /// error result that is not cached.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Look up the competitor price for `code` under `credential`.
    ///
    /// Taking `&mut self` guarantees a single lookup in flight per cache.
    pub async fn lookup(&mut self, code: &ProductCode, credential: &Credential) -> LookupResult {
        self.enter_epoch(credential);

        if !code.is_empty() {
            if let Some(hit) = self.entries.get(code) {
                self.hits += 1;
                debug!("[CACHE HIT] code={}", code);
                return hit.clone();
            }
        }

        self.misses += 1;
        debug!(
            "[CACHE MISS] code={} key={}",
            code,
            credential.prefix()
        );

        let outcome = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.source.lowest_price(code, credential)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!("Lookup for code={} timed out after {:?}", code, limit);
                        return LookupResult::failed(LookupError::Timeout.to_string());
                    }
                }
            }
            None => self.source.lowest_price(code, credential).await,
        };

        let result = match outcome {
            Ok(price) => LookupResult::ok(price),
            Err(e) => LookupResult::failed(e.to_string()),
        };

        if !code.is_empty() {
            self.entries.insert(code.clone(), result.clone());
        }
        result
    }

    /// Drop all entries if `credential` starts a new epoch.
    fn enter_epoch(&mut self, credential: &Credential) {
        let epoch = credential.epoch_id();
        if self.epoch.as_deref() == Some(epoch.as_str()) {
            return;
        }
        if self.epoch.is_some() {
            info!(
                "API key changed to {}. Clearing {} cached prices.",
                credential.prefix(),
                self.entries.len()
            );
            self.invalidations += 1;
        }
        self.entries.clear();
        self.epoch = Some(epoch);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            invalidations: self.invalidations,
            size: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
