use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::error::MatchError;
use crate::remote::{RawCandidate, RemoteSource};

/// Decides, call by call, whether a remote request is forced to fail.
#[derive(Debug)]
pub struct FaultInjector {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl FaultInjector {
    pub fn new(rate: f64, seed: Option<u64>) -> Result<Self, MatchError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(MatchError::InvalidArgument(format!(
                "fault injection rate must be within [0, 1], got {rate}"
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rate,
            rng: Mutex::new(rng),
        })
    }

    pub fn always() -> Self {
        Self {
            rate: 1.0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn should_fail(&self) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        if self.rate >= 1.0 {
            return true;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(self.rate),
            Err(_) => false,
        }
    }
}

/// Wraps a source and fails requests with a simulated network error at the
/// injector's rate.
pub struct FaultySource<S> {
    inner: S,
    injector: FaultInjector,
}

impl<S: RemoteSource> FaultySource<S> {
    pub fn new(inner: S, injector: FaultInjector) -> Self {
        Self { inner, injector }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, operation: &str) -> Result<(), MatchError> {
        if self.injector.should_fail() {
            warn!(operation, rate = self.injector.rate(), "injected remote failure");
            return Err(MatchError::NetworkFailure(
                "simulated network failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl<S: RemoteSource> RemoteSource for FaultySource<S> {
    fn fetch_batch(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError> {
        self.check("fetch_batch")?;
        self.inner.fetch_batch(count)
    }

    fn fetch_identity(&self) -> Result<Option<RawCandidate>, MatchError> {
        self.check("fetch_identity")?;
        self.inner.fetch_identity()
    }
}
