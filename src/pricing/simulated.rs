//! Simulated price service used when no real lookup backend is configured.
//!
//! Answers after `min_delay + uniform(0, jitter)`, fails with probability
//! `failure_rate` (always for an empty code), and otherwise quotes a price
//! between 20.00 and 100.00.

use super::{LookupError, PriceSource};
use crate::domain::{Credential, Decimal, ProductCode};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const MIN_PRICE_CENTS: i64 = 2_000;
const MAX_PRICE_CENTS: i64 = 10_000;

#[derive(Debug)]
pub struct SimulatedPriceSource {
    rng: Mutex<StdRng>,
    failure_rate: f64,
    min_delay: Duration,
    jitter: Duration,
}

impl SimulatedPriceSource {
    pub fn new(failure_rate: f64, min_delay: Duration, jitter: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            min_delay,
            jitter,
        }
    }

    /// Reproducible sequence of outcomes for a given seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Draw delay, failure and price up front so no RNG guard lives across
    /// the sleep.
    fn draw(&self) -> (Duration, bool, i64) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..=jitter_ms)
        };
        let fails = rng.gen::<f64>() < self.failure_rate;
        let cents = rng.gen_range(MIN_PRICE_CENTS..=MAX_PRICE_CENTS);
        (self.min_delay + Duration::from_millis(extra), fails, cents)
    }
}

impl Default for SimulatedPriceSource {
    fn default() -> Self {
        Self::new(0.1, Duration::from_millis(500), Duration::from_millis(1000))
    }
}

#[async_trait]
impl PriceSource for SimulatedPriceSource {
    async fn lowest_price(
        &self,
        code: &ProductCode,
        _credential: &Credential,
    ) -> Result<Decimal, LookupError> {
        let (delay, fails, cents) = self.draw();
        debug!("Simulating lookup for code={} delay={:?}", code, delay);
        tokio::time::sleep(delay).await;

        if code.is_empty() {
            return Err(LookupError::MissingProductCode);
        }
        if fails {
            return Err(LookupError::NotFound);
        }
        Ok(Decimal::from_cents(cents))
    }
}
