use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::decisions::StatusTransitions;
use crate::domain::{LoadState, Profile, ProfileKey, Status};
use crate::error::MatchError;
use crate::fault::{FaultInjector, FaultySource};
use crate::feed::{FeedSettings, FeedSynchronizer};
use crate::remote::{ProfileFactory, RandomUserHttpClient, RemoteAdapter, RemoteSource};
use crate::score::match_score;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredProfile {
    pub score: u8,
    pub profile: Profile,
}

/// What presentation code talks to: sign-in, the candidate feed, decisions
/// and the accepted/declined listings.
///
/// Page requests go through a mutex, so concurrent callers queue behind the
/// one in flight instead of racing on the cursor.
pub struct MatchMate<S> {
    store: Arc<Store>,
    remote: Arc<RemoteAdapter<S>>,
    feed: Mutex<FeedSynchronizer<S>>,
    transitions: StatusTransitions,
}

impl<S: RemoteSource> MatchMate<S> {
    pub fn new(store: Arc<Store>, remote: RemoteAdapter<S>, settings: FeedSettings) -> Self {
        let remote = Arc::new(remote);
        let feed = FeedSynchronizer::new(store.clone(), remote.clone(), settings);
        Self {
            transitions: StatusTransitions::new(store.clone()),
            store,
            remote,
            feed: Mutex::new(feed),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Stored signed-in profile, or a fresh identity fetch persisted as `self`.
    pub fn sign_in(&self) -> Result<Profile, MatchError> {
        if let Some(profile) = self.store.get_self()? {
            info!(key = %profile.key, "signed in from local store");
            return Ok(profile);
        }

        let profile = self
            .remote
            .fetch_identity()
            .inspect_err(|err| warn!(error = %err, "identity fetch failed"))?
            .ok_or(MatchError::SelfProfileMissing)?;
        self.store.upsert_many(vec![profile.clone()])?;
        info!(key = %profile.key, "signed in with fetched identity");
        Ok(profile)
    }

    pub fn current_profile(&self) -> Result<Option<Profile>, MatchError> {
        self.store.get_self()
    }

    pub fn load_next_page(&self) -> Result<Vec<Profile>, MatchError> {
        self.lock_feed()?.request_next_page()
    }

    pub fn scored_page(&self) -> Result<Vec<ScoredProfile>, MatchError> {
        let me = self
            .store
            .get_self()?
            .ok_or(MatchError::SelfProfileMissing)?;
        Ok(self
            .load_next_page()?
            .into_iter()
            .map(|profile| ScoredProfile {
                score: match_score(&me, &profile),
                profile,
            })
            .collect())
    }

    pub fn decide(&self, key: &ProfileKey, outcome: Status) -> Result<(), MatchError> {
        self.transitions.decide(key, outcome)
    }

    pub fn accept(&self, key: &ProfileKey) -> Result<(), MatchError> {
        self.transitions.accept(key)
    }

    pub fn decline(&self, key: &ProfileKey) -> Result<(), MatchError> {
        self.transitions.decline(key)
    }

    pub fn accepted(&self) -> Result<Vec<Profile>, MatchError> {
        self.store.get_by_status(Status::Accepted)
    }

    pub fn declined(&self) -> Result<Vec<Profile>, MatchError> {
        self.store.get_by_status(Status::Declined)
    }

    /// Wipes every stored profile and starts the feed over.
    pub fn clear_all(&self) -> Result<(), MatchError> {
        let mut feed = self.lock_feed()?;
        self.store.clear_all()?;
        feed.reset();
        Ok(())
    }

    pub fn feed_position(&self) -> Result<(usize, bool), MatchError> {
        let feed = self.lock_feed()?;
        Ok((feed.cursor(), feed.is_exhausted()))
    }

    fn lock_feed(&self) -> Result<MutexGuard<'_, FeedSynchronizer<S>>, MatchError> {
        self.feed
            .lock()
            .map_err(|_| MatchError::StorageFailure("feed lock poisoned".to_string()))
    }
}

/// Wires the HTTP client (and fault injection, when configured) from config.
pub fn build_source(config: &ResolvedConfig) -> Result<Box<dyn RemoteSource>, MatchError> {
    let client = RandomUserHttpClient::new(&config.base_url, config.timeout)?;
    match &config.fault_injection {
        Some(fault) => {
            warn!(rate = fault.rate, "remote fault injection enabled");
            let injector = FaultInjector::new(fault.rate, fault.seed)?;
            Ok(Box::new(FaultySource::new(client, injector)))
        }
        None => Ok(Box::new(client)),
    }
}

pub fn open_app(config: &ResolvedConfig) -> Result<MatchMate<Box<dyn RemoteSource>>, MatchError> {
    let store = Arc::new(Store::open(&config.data_dir)?);
    let remote = RemoteAdapter::new(build_source(config)?, ProfileFactory::new(config.seed));
    Ok(MatchMate::new(store, remote, config.feed))
}

/// Presentation-side feed: the profiles on screen plus the state of the last
/// load. A failed load never drops what is already displayed.
#[derive(Debug)]
pub struct FeedView {
    displayed: Vec<Profile>,
    state: LoadState<usize>,
}

impl Default for FeedView {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedView {
    pub fn new() -> Self {
        Self {
            displayed: Vec::new(),
            state: LoadState::Success(0),
        }
    }

    pub fn displayed(&self) -> &[Profile] {
        &self.displayed
    }

    /// Size of the last page appended, the pending load, or its error.
    pub fn state(&self) -> &LoadState<usize> {
        &self.state
    }

    pub fn begin_load(&mut self) {
        self.state = LoadState::Loading;
    }

    pub fn apply_page(&mut self, result: Result<Vec<Profile>, MatchError>) {
        self.state = LoadState::from(result).map(|page| {
            let added = page.len();
            self.displayed.extend(page);
            added
        });
    }

    pub fn remove(&mut self, key: &ProfileKey) -> Option<Profile> {
        let position = self
            .displayed
            .iter()
            .position(|profile| profile.key == *key)?;
        Some(self.displayed.remove(position))
    }
}
