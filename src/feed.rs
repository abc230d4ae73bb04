use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Profile, Status};
use crate::error::MatchError;
use crate::remote::{RemoteAdapter, RemoteSource};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedSettings {
    pub page_size: usize,
    pub batch_size: usize,
    pub max_refill_attempts: usize,
}

impl FeedSettings {
    pub fn new(
        page_size: usize,
        batch_size: usize,
        max_refill_attempts: usize,
    ) -> Result<Self, MatchError> {
        if page_size == 0 || batch_size == 0 || max_refill_attempts == 0 {
            return Err(MatchError::InvalidArgument(format!(
                "page size ({page_size}), batch size ({batch_size}) and refill attempts ({max_refill_attempts}) must be positive"
            )));
        }
        Ok(Self {
            page_size,
            batch_size,
            max_refill_attempts,
        })
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            batch_size: 10,
            max_refill_attempts: 3,
        }
    }
}

/// Serves candidate pages from the store and refills it from the remote
/// source when the current page cannot be satisfied locally.
///
/// `cursor` is the 1-based page index; `served_in_page` counts candidates of
/// that page already handed out by an earlier short read, so a page finished
/// after a refill never repeats or skips those. Both, and `exhausted`, only
/// change once a call succeeds.
pub struct FeedSynchronizer<S> {
    store: Arc<Store>,
    remote: Arc<RemoteAdapter<S>>,
    settings: FeedSettings,
    cursor: usize,
    served_in_page: usize,
    exhausted: bool,
}

impl<S: RemoteSource> FeedSynchronizer<S> {
    pub fn new(store: Arc<Store>, remote: Arc<RemoteAdapter<S>>, settings: FeedSettings) -> Self {
        Self {
            store,
            remote,
            settings,
            cursor: 1,
            served_in_page: 0,
            exhausted: false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn page_size(&self) -> usize {
        self.settings.page_size
    }

    pub fn settings(&self) -> FeedSettings {
        self.settings
    }

    pub fn reset(&mut self) {
        self.cursor = 1;
        self.served_in_page = 0;
        self.exhausted = false;
    }

    /// Next slice of candidates. An empty page means the remote source had
    /// nothing more to offer; it is not an error.
    pub fn request_next_page(&mut self) -> Result<Vec<Profile>, MatchError> {
        let wanted = self.settings.page_size - self.served_in_page;

        let mut page = if self.exhausted {
            Vec::new()
        } else {
            self.read_page(wanted)?
        };
        if page.len() == wanted {
            debug!(cursor = self.cursor, served = page.len(), "page served locally");
            self.advance(page.len());
            return Ok(page);
        }

        debug!(
            cursor = self.cursor,
            found = page.len(),
            wanted,
            "local store exhausted; refilling from remote source"
        );
        let mut refilled = false;
        for attempt in 1..=self.settings.max_refill_attempts {
            let batch = match self.remote.fetch_batch(self.settings.batch_size) {
                Ok(batch) => batch,
                Err(err) if !refilled => {
                    warn!(cursor = self.cursor, attempt, error = %err, "refill failed");
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        cursor = self.cursor,
                        attempt,
                        error = %err,
                        "refill failed after earlier progress; serving stored candidates"
                    );
                    break;
                }
            };
            if batch.is_empty() {
                info!(cursor = self.cursor, attempt, "remote source returned no candidates");
                break;
            }

            let outcome = self.store.upsert_many(batch).inspect_err(|err| {
                warn!(cursor = self.cursor, attempt, error = %err, "failed to persist refill");
            })?;
            refilled = true;
            info!(
                cursor = self.cursor,
                attempt,
                inserted = outcome.inserted,
                updated = outcome.updated,
                "refill persisted"
            );

            page = self.read_page(wanted)?;
            if page.len() == wanted {
                break;
            }
        }

        self.exhausted = page.len() < wanted;
        self.advance(page.len());
        debug!(
            cursor = self.cursor,
            served = page.len(),
            exhausted = self.exhausted,
            "page served"
        );
        Ok(page)
    }

    fn read_page(&self, limit: usize) -> Result<Vec<Profile>, MatchError> {
        let offset = (self.cursor - 1) * self.settings.page_size + self.served_in_page;
        self.store
            .get_page(&Status::NON_CANDIDATE, limit, offset)
            .inspect_err(|err| {
                warn!(cursor = self.cursor, offset, error = %err, "page read failed");
            })
    }

    fn advance(&mut self, served: usize) {
        self.served_in_page += served;
        if self.served_in_page >= self.settings.page_size {
            self.cursor += 1;
            self.served_in_page = 0;
        }
    }
}
