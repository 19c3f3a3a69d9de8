//! Photo sync orchestration for one session.
//!
//! ## `run_sync`: per remote contact
//!
//! 1. Stop silently if the progress channel has gone away.
//! 2. Skip contacts that already have a photo unless overwriting.
//! 3. Link to a local contact by phone number (first match wins).
//! 4. Download the local photo; if there is one, wait for an upload token and
//!    push it to the directory.
//! 5. Emit a progress event (`image: null` when nothing was fetched).
//!
//! After the last contact a terminal `progress: 100` event is sent and the
//! channel is closed. A collaborator failure that survives the retry policy
//! ends the session with a `syncError` event and a close.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use facesync_core::{
    Config, Contact, FailureKind, PhotoPayload, ServerEvent, SessionId, SyncFailure, SyncOptions,
    SyncProgress,
};

use crate::clients::{DirectoryClient, MessagingClient, ProgressChannel};
use crate::error::SyncError;
use crate::limiter::RateLimiter;
use crate::matching::PhoneIndex;
use crate::retry::with_retry;
use crate::session::{SessionHandles, SessionRegistry};

/// Counters for one finished (or abandoned) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub total_contacts: usize,
    /// Contacts that produced a progress event.
    pub processed: usize,
    /// Contacts skipped because they already had a photo.
    pub skipped: usize,
    pub updated: u64,
    pub unmatched: usize,
    /// Linked to a local contact that had no photo to offer.
    pub missing_photo: usize,
    /// The listener went away before the run finished.
    pub cancelled: bool,
    pub duration_ms: u128,
}

impl SyncReport {
    fn new(session_id: &SessionId) -> Self {
        Self {
            session_id: session_id.0.clone(),
            started_at: Utc::now(),
            total_contacts: 0,
            processed: 0,
            skipped: 0,
            updated: 0,
            unmatched: 0,
            missing_photo: 0,
            cancelled: false,
            duration_ms: 0,
        }
    }
}

enum Outcome {
    Completed,
    Cancelled,
}

/// Run a photo sync for `session_id` using the handles in `registry`.
///
/// Returns the run's counters, or the error that ended it. The channel is
/// closed on completion and on terminal errors, never after the listener has
/// disconnected.
pub async fn run_sync(
    registry: &SessionRegistry,
    session_id: &SessionId,
    options: &SyncOptions,
    config: &Config,
) -> Result<SyncReport, SyncError> {
    let handles = registry.handles(session_id).await?;
    run_with_handles(session_id, handles, options, config).await
}

/// Same as [`run_sync`] for callers that hold the handles directly.
pub async fn run_with_handles(
    session_id: &SessionId,
    handles: SessionHandles,
    options: &SyncOptions,
    config: &Config,
) -> Result<SyncReport, SyncError> {
    let started = Instant::now();
    let mut run = ContactSync {
        session_id,
        channel: handles.channel,
        messaging: handles.messaging,
        directory: handles.directory,
        overwrite: options.overwrite_photos(),
        config,
        report: SyncReport::new(session_id),
    };

    let outcome = run.walk().await;
    run.report.duration_ms = started.elapsed().as_millis();

    match outcome {
        Ok(Outcome::Completed) => {
            if run.emit(SyncProgress::finished(run.report.updated)).await {
                run.channel.close().await;
            }
            tracing::info!(
                session = %session_id,
                total = run.report.total_contacts,
                updated = run.report.updated,
                skipped = run.report.skipped,
                unmatched = run.report.unmatched,
                missing_photo = run.report.missing_photo,
                duration_ms = run.report.duration_ms as u64,
                "photo sync completed",
            );
            Ok(run.report)
        }
        Ok(Outcome::Cancelled) => {
            run.report.cancelled = true;
            tracing::info!(
                session = %session_id,
                processed = run.report.processed,
                updated = run.report.updated,
                "listener disconnected, photo sync stopped",
            );
            Ok(run.report)
        }
        Err(err) => {
            tracing::error!(session = %session_id, error = %err, "photo sync failed");
            run.fail(&err).await;
            Err(err)
        }
    }
}

struct ContactSync<'a> {
    session_id: &'a SessionId,
    channel: Arc<dyn ProgressChannel>,
    messaging: Arc<dyn MessagingClient>,
    directory: Arc<dyn DirectoryClient>,
    overwrite: bool,
    config: &'a Config,
    report: SyncReport,
}

impl ContactSync<'_> {
    async fn walk(&mut self) -> Result<Outcome, SyncError> {
        let config = self.config;
        let mut limiter = RateLimiter::per_interval(config.upload_interval());
        let retry = &config.retry;
        let directory = self.directory.as_ref();
        let messaging = self.messaging.as_ref();

        let remote = with_retry(retry, "list directory contacts", move || {
            directory.list_contacts()
        })
        .await
        .map_err(SyncError::client("list directory contacts"))?;
        let local = with_retry(retry, "load messaging contacts", move || {
            messaging.load_contacts()
        })
        .await
        .map_err(SyncError::client("load messaging contacts"))?;

        let index = PhoneIndex::new(&local);
        let total = remote.len();
        self.report.total_contacts = total;
        tracing::info!(
            session = %self.session_id,
            remote = total,
            local = local.len(),
            indexed_numbers = index.len(),
            overwrite = self.overwrite,
            "starting photo sync",
        );

        for (position, contact) in remote.iter().enumerate() {
            if !self.channel.is_open() {
                return Ok(Outcome::Cancelled);
            }

            if !self.overwrite && contact.has_photo {
                tracing::debug!(contact = %contact.id, "already has a photo, skipping");
                self.report.skipped += 1;
                continue;
            }

            let photo = self.sync_contact(contact, &index, &mut limiter).await?;

            self.report.processed += 1;
            let step = SyncProgress::step(position, total, self.report.updated, photo);
            if !self.emit(step).await {
                return Ok(Outcome::Cancelled);
            }
        }

        Ok(Outcome::Completed)
    }

    /// Handle one remote contact; returns the photo that was pushed, if any.
    async fn sync_contact(
        &mut self,
        contact: &Contact,
        index: &PhoneIndex<'_>,
        limiter: &mut RateLimiter,
    ) -> Result<Option<PhotoPayload>, SyncError> {
        let retry = &self.config.retry;
        let directory = self.directory.clone();
        let messaging = self.messaging.clone();

        let Some(linked) = index.find(contact) else {
            tracing::debug!(contact = %contact.id, "no local contact shares a number");
            self.report.unmatched += 1;
            return Ok(None);
        };

        let local_id = &linked.id;
        let photo = with_retry(retry, "download photo", || messaging.download_photo(local_id))
            .await
            .map_err(SyncError::client("download photo"))?;

        let Some(photo) = photo else {
            tracing::debug!(contact = %contact.id, local = %linked.id, "local contact has no photo");
            self.report.missing_photo += 1;
            return Ok(None);
        };

        limiter.acquire().await;
        let remote_id = &contact.id;
        let payload = &photo;
        with_retry(retry, "update contact photo", || {
            directory.update_contact_photo(remote_id, payload)
        })
        .await
        .map_err(SyncError::client("update contact photo"))?;

        self.report.updated += 1;
        tracing::debug!(contact = %contact.id, local = %linked.id, "photo updated");
        Ok(Some(photo))
    }

    /// Send one progress event. `false` means the listener is gone.
    async fn emit(&self, progress: SyncProgress) -> bool {
        match self.channel.send_event(ServerEvent::from(progress)).await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(session = %self.session_id, error = %err, "progress event not delivered");
                false
            }
        }
    }

    /// Report a terminal failure and close, unless the listener is gone.
    async fn fail(&self, err: &SyncError) {
        if !self.channel.is_open() {
            return;
        }
        let failure = match err {
            SyncError::Client { source, .. } => {
                SyncFailure::new(source.failure_kind(), err.to_string())
            }
            other => SyncFailure::new(FailureKind::Fatal, other.to_string()),
        };
        if let Err(send_err) = self.channel.close_with_error(failure).await {
            tracing::debug!(session = %self.session_id, error = %send_err, "failure event not delivered");
        }
    }
}
