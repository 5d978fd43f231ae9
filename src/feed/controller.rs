//! Orchestration of planner, fetcher, deduplicator and bucket store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::feed::buckets::BucketStore;
use crate::feed::dedup::Deduplicator;
use crate::feed::fallback::bundled_items;
use crate::feed::fetcher::BatchFetcher;
use crate::feed::planner::TopicPlanner;
use crate::feed::types::{Batch, FeedItem};
use crate::util::MAX_SEARCH_TERM_LENGTH;

const DEFAULT_STAGGER: Duration = Duration::from_millis(100);
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Loading state visible to the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    /// Batch 0 is in flight.
    LoadingPrimary,
    /// Secondary batches are submitted but none has settled yet.
    LoadingSecondary,
    /// Some background work (secondary batches or a load-more) is outstanding.
    Streaming,
}

impl FeedStatus {
    pub fn is_streaming(self) -> bool {
        self != FeedStatus::Idle
    }
}

/// Progress notifications for observers that want more than [`FeedStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    BatchWritten { index: usize, admitted: usize },
    BatchEmpty { index: usize },
    FallbackUsed,
    Idle,
}

/// Result of [`FeedController::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOutcome {
    /// Items admitted into the first bucket of this cycle.
    pub primary_admitted: usize,
    pub fallback_used: bool,
    /// Batches handed to the background fan-out.
    pub background_batches: usize,
    /// True when a concurrent refresh made this cycle obsolete.
    pub superseded: bool,
}

/// Result of [`FeedController::load_more`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreOutcome {
    /// Another load-more was in flight, or a refresh discarded the result.
    Skipped,
    Loaded { index: usize, admitted: usize },
}

/// Tuning for the background fan-out.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    /// Delay between successive secondary submissions.
    pub stagger: Duration,
    pub max_concurrent: usize,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            stagger: DEFAULT_STAGGER,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl FeedOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stagger: config.stagger(),
            max_concurrent: config.max_concurrent_batches,
        }
    }
}

/// Mutable state of one feed session. Everything here is cleared by a reset.
#[derive(Default)]
struct Session {
    dedup: Deduplicator,
    buckets: BucketStore,
    /// Next unused bucket index.
    next_index: usize,
    /// Bumped on every reset; results tagged with an older value are dropped.
    generation: u64,
    cycle_cursor: usize,
    primary_pending: usize,
    secondary_pending: usize,
    secondary_settled: usize,
    load_more_in_flight: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    fn reset(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.dedup.reset();
        self.buckets.reset();
        self.next_index = 0;
        self.cycle_cursor = 0;
        self.generation += 1;
        self.primary_pending = 0;
        self.secondary_pending = 0;
        self.secondary_settled = 0;
        self.load_more_in_flight = false;
    }

    fn status(&self) -> FeedStatus {
        if self.primary_pending > 0 {
            FeedStatus::LoadingPrimary
        } else if self.secondary_pending > 0 && self.secondary_settled == 0 {
            FeedStatus::LoadingSecondary
        } else if self.secondary_pending > 0 || self.load_more_in_flight {
            FeedStatus::Streaming
        } else {
            FeedStatus::Idle
        }
    }

    /// Admit `items` and store them under `index`. Empty results leave the
    /// slot unwritten.
    fn commit(&mut self, index: usize, items: Vec<FeedItem>) -> FeedEvent {
        let admitted = self.dedup.admit(items);
        if admitted.is_empty() {
            return FeedEvent::BatchEmpty { index };
        }
        let count = admitted.len();
        self.buckets.write(index, admitted);
        FeedEvent::BatchWritten {
            index,
            admitted: count,
        }
    }
}

struct Inner {
    fetcher: BatchFetcher,
    planner: TopicPlanner,
    options: FeedOptions,
    topics: RwLock<Vec<String>>,
    session: Mutex<Session>,
    status_tx: watch::Sender<FeedStatus>,
    events: Option<mpsc::Sender<FeedEvent>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the status derived from `session`, plus an `Idle` event on
    /// the transition back to idle.
    fn publish(&self, session: &Session) {
        let status = session.status();
        let previous = self.status_tx.send_replace(status);
        if status == FeedStatus::Idle && previous != FeedStatus::Idle {
            tracing::debug!("Feed idle");
            self.emit(FeedEvent::Idle);
        }
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(tx) = &self.events {
            if let Err(e) = tx.try_send(event) {
                tracing::debug!(error = %e, "Feed event dropped");
            }
        }
    }
}

/// Drives one feed session: plan, fetch batch 0 in the foreground, fan the
/// rest out in the background, and keep the flattened feed ordered by batch
/// index throughout.
///
/// Cloning is cheap; clones share the same session. No method returns an
/// error: failed batches simply contribute nothing.
#[derive(Clone)]
pub struct FeedController {
    inner: Arc<Inner>,
}

impl FeedController {
    pub fn new(fetcher: BatchFetcher, planner: TopicPlanner, options: FeedOptions) -> Self {
        Self::build(fetcher, planner, options, None)
    }

    /// Like [`new`](Self::new), also reporting [`FeedEvent`]s on `events`.
    ///
    /// Events are sent with `try_send`; a full channel drops them.
    pub fn with_events(
        fetcher: BatchFetcher,
        planner: TopicPlanner,
        options: FeedOptions,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        Self::build(fetcher, planner, options, Some(events))
    }

    fn build(
        fetcher: BatchFetcher,
        planner: TopicPlanner,
        options: FeedOptions,
        events: Option<mpsc::Sender<FeedEvent>>,
    ) -> Self {
        let (status_tx, _) = watch::channel(FeedStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                planner,
                options: FeedOptions {
                    stagger: options.stagger,
                    max_concurrent: options.max_concurrent.max(1),
                },
                topics: RwLock::new(Vec::new()),
                session: Mutex::new(Session::default()),
                status_tx,
                events,
            }),
        }
    }

    // ========================================================================
    // Topics
    // ========================================================================

    /// Replace the topic selection used by the next plan and by load-more.
    pub fn set_topics(&self, topics: Vec<String>) {
        let mut guard = self.inner.topics.write().unwrap_or_else(PoisonError::into_inner);
        *guard = topics;
    }

    pub fn topics(&self) -> Vec<String> {
        self.inner
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Run one load cycle.
    ///
    /// With `refresh`, the session is reset first (buckets, fingerprints,
    /// index counter, background tasks). Batch 0 is awaited and written
    /// before this returns; remaining batches are spawned with a stagger and
    /// write as they resolve. If the feed would otherwise be empty after
    /// batch 0, bundled content is written instead.
    pub async fn start(&self, refresh: bool) -> StartOutcome {
        let topics = self.topics();
        let plan = self.inner.planner.plan(&topics);
        let available = self.inner.fetcher.source_available();

        let (generation, first_index) = {
            let mut session = self.inner.lock();
            if refresh {
                session.reset();
            }
            session.primary_pending += 1;
            let first_index = session.next_index;
            session.next_index += plan.len().max(1);
            self.inner.publish(&session);
            (session.generation, first_index)
        };

        let mut primary_guard = PrimaryGuard {
            inner: &self.inner,
            generation,
            settled: false,
        };

        tracing::info!(
            refresh = refresh,
            batches = plan.len(),
            first_index = first_index,
            source = self.inner.fetcher.source_name(),
            "Feed load started"
        );

        let mut plan = plan.into_iter();
        let primary = plan.next();
        let items = match (&primary, available) {
            (Some(batch), true) => self.inner.fetcher.fetch(batch).await,
            _ => {
                if !available {
                    tracing::warn!(
                        source = self.inner.fetcher.source_name(),
                        "Content source unavailable, skipping network fetch"
                    );
                }
                Vec::new()
            }
        };

        let secondary: Vec<(usize, Batch)> = if available {
            plan.enumerate()
                .map(|(offset, batch)| (first_index + 1 + offset, batch))
                .collect()
        } else {
            Vec::new()
        };

        let mut session = self.inner.lock();
        primary_guard.settled = true;
        if session.generation != generation {
            tracing::debug!(batch = first_index, "Discarding primary batch from a superseded load");
            return StartOutcome {
                superseded: true,
                ..StartOutcome::default()
            };
        }

        let mut outcome = StartOutcome::default();
        let event = session.commit(first_index, items);
        match event {
            FeedEvent::BatchWritten { admitted, .. } => outcome.primary_admitted = admitted,
            _ if session.buckets.is_empty() => {
                tracing::warn!("No content for first paint, using bundled items");
                let fallback = session.commit(first_index, bundled_items(Utc::now()));
                if let FeedEvent::BatchWritten { admitted, .. } = fallback {
                    outcome.primary_admitted = admitted;
                }
                outcome.fallback_used = true;
            }
            _ => tracing::warn!(batch = first_index, "Primary batch yielded no new items"),
        }
        if outcome.fallback_used {
            self.inner.emit(FeedEvent::FallbackUsed);
        } else {
            self.inner.emit(event);
        }

        session.primary_pending = session.primary_pending.saturating_sub(1);
        outcome.background_batches = secondary.len();
        if !secondary.is_empty() {
            session.secondary_pending += secondary.len();
            session.tasks.retain(|task| !task.is_finished());
            let controller = self.clone();
            session.tasks.push(tokio::spawn(async move {
                controller.run_secondary(generation, secondary).await;
            }));
        }
        self.inner.publish(&session);

        tracing::info!(
            primary_admitted = outcome.primary_admitted,
            fallback = outcome.fallback_used,
            background = outcome.background_batches,
            "First paint ready"
        );
        outcome
    }

    /// Fetch secondary batches concurrently, submission `n` delayed by
    /// `n * stagger` from the start of the fan-out.
    async fn run_secondary(self, generation: u64, batches: Vec<(usize, Batch)>) {
        let started = Instant::now();
        let stagger = self.inner.options.stagger;
        let max_concurrent = self.inner.options.max_concurrent;

        stream::iter(batches.into_iter().enumerate())
            .map(|(offset, (index, batch))| {
                let controller = self.clone();
                let delay = stagger.saturating_mul(u32::try_from(offset).unwrap_or(u32::MAX));
                async move {
                    tokio::time::sleep_until(started + delay).await;
                    let items = controller.inner.fetcher.fetch(&batch).await;
                    controller.commit_secondary(generation, index, items);
                }
            })
            .buffer_unordered(max_concurrent)
            .for_each(|()| async {})
            .await;
    }

    fn commit_secondary(&self, generation: u64, index: usize, items: Vec<FeedItem>) {
        let mut session = self.inner.lock();
        if session.generation != generation {
            tracing::debug!(batch = index, "Discarding batch from a superseded load");
            return;
        }

        let event = session.commit(index, items);
        if let FeedEvent::BatchEmpty { .. } = event {
            tracing::warn!(batch = index, "Batch yielded no new items");
        }
        session.secondary_pending = session.secondary_pending.saturating_sub(1);
        session.secondary_settled += 1;
        if session.secondary_pending == 0 {
            session.secondary_settled = 0;
        }
        self.inner.emit(event);
        self.inner.publish(&session);
    }

    /// Fetch one more batch into the next unused index.
    ///
    /// Topics are cycled one at a time from the current selection. Only one
    /// load-more runs at a time; calls made while one is in flight return
    /// [`LoadMoreOutcome::Skipped`] immediately.
    pub async fn load_more(&self) -> LoadMoreOutcome {
        let topics = self.topics();

        let (generation, index, batch) = {
            let mut session = self.inner.lock();
            if session.load_more_in_flight {
                tracing::debug!("Load-more already in flight, ignoring trigger");
                return LoadMoreOutcome::Skipped;
            }
            session.load_more_in_flight = true;
            let index = session.next_index;
            session.next_index += 1;
            let batch = self.inner.planner.cycle_batch(&topics, session.cycle_cursor);
            session.cycle_cursor += 1;
            self.inner.publish(&session);
            (session.generation, index, batch)
        };
        let _guard = LoadMoreGuard {
            inner: &self.inner,
            generation,
        };

        tracing::debug!(batch = index, topics = %batch.describe(), "Loading more");
        let items = if self.inner.fetcher.source_available() {
            self.inner.fetcher.fetch(&batch).await
        } else {
            Vec::new()
        };

        let mut session = self.inner.lock();
        if session.generation != generation {
            tracing::debug!(batch = index, "Discarding load-more from a superseded load");
            return LoadMoreOutcome::Skipped;
        }
        let event = session.commit(index, items);
        drop(session);
        self.inner.emit(event.clone());

        match event {
            FeedEvent::BatchWritten { index, admitted } => {
                LoadMoreOutcome::Loaded { index, admitted }
            }
            _ => LoadMoreOutcome::Loaded { index, admitted: 0 },
        }
    }

    /// Clear the session without starting a new load.
    pub fn reset(&self) {
        let mut session = self.inner.lock();
        session.reset();
        self.inner.publish(&session);
        tracing::info!(generation = session.generation, "Feed reset");
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Toggle `liked` on the item with `id`. Returns false if no such item.
    pub fn like(&self, id: &str) -> bool {
        self.inner.lock().buckets.update_item(id, FeedItem::toggle_like)
    }

    /// Toggle `saved` on the item with `id`. Returns false if no such item.
    pub fn save(&self, id: &str) -> bool {
        self.inner.lock().buckets.update_item(id, FeedItem::toggle_save)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// The feed in render order.
    pub fn feed(&self) -> Vec<FeedItem> {
        self.inner.lock().buckets.flatten()
    }

    /// Case-insensitive substring filter over title, body and publisher.
    /// A blank term returns the whole feed.
    pub fn search(&self, term: &str) -> Vec<FeedItem> {
        let term = term.trim();
        if term.is_empty() {
            return self.feed();
        }
        let needle: String = term
            .chars()
            .take(MAX_SEARCH_TERM_LENGTH)
            .collect::<String>()
            .to_lowercase();
        self.feed()
            .into_iter()
            .filter(|item| item.matches_lowercase(&needle))
            .collect()
    }

    pub fn item(&self, id: &str) -> Option<FeedItem> {
        self.inner.lock().buckets.get(id).cloned()
    }

    pub fn status(&self) -> FeedStatus {
        *self.inner.status_tx.borrow()
    }

    pub fn is_streaming(&self) -> bool {
        self.status().is_streaming()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Resolve once no batch or load-more is outstanding.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `inner`, so this only ends on Idle.
        let _ = rx.wait_for(|status| *status == FeedStatus::Idle).await;
    }
}

/// Releases the primary slot if `start` is dropped before batch 0 settles.
struct PrimaryGuard<'a> {
    inner: &'a Inner,
    generation: u64,
    settled: bool,
}

impl Drop for PrimaryGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut session = self.inner.lock();
        if session.generation == self.generation {
            session.primary_pending = session.primary_pending.saturating_sub(1);
        }
        tracing::debug!("Primary load dropped before completion");
        self.inner.publish(&session);
    }
}

/// Clears the load-more flag even if the caller drops the future mid-fetch.
struct LoadMoreGuard<'a> {
    inner: &'a Inner,
    generation: u64,
}

impl Drop for LoadMoreGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.inner.lock();
        if session.generation == self.generation {
            session.load_more_in_flight = false;
        }
        self.inner.publish(&session);
    }
}
