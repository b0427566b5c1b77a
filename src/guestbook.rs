//! The guestbook store: validation, submission and the newest-first list
//! shown on the invitation.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::collection::RemoteCollection;
use crate::config::{GuestbookConfig, ListingStrategy};
use crate::error::{CollectionError, GuestbookError, ValidationError};
use crate::models::{Attendance, AttendanceSummary, GuestEntry, GuestForm, NewEntry};
use crate::notify::Notifier;

/// Text of the unselected option in the attendance dropdown.
pub const ATTENDANCE_PLACEHOLDER: &str = "Konfirmasi Kehadiran";

/// Checks the raw form and returns the trimmed entry to write.
pub fn validate(form: &GuestForm, settings: &GuestbookConfig) -> Result<NewEntry, ValidationError> {
    let name = form.name.trim();
    let message = form.message.trim();
    let attendance = form.attendance.trim();

    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if message.is_empty() {
        return Err(ValidationError::MissingMessage);
    }
    if attendance.is_empty() || attendance == ATTENDANCE_PLACEHOLDER {
        return Err(ValidationError::MissingAttendance);
    }
    let attendance: Attendance = attendance
        .parse()
        .map_err(ValidationError::UnknownAttendance)?;

    check_len("Name", name, settings.name_limit())?;
    check_len("Message", message, settings.max_message_len)?;

    Ok(NewEntry {
        name: name.to_string(),
        message: message.to_string(),
        attendance,
    })
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, len, max });
    }
    Ok(())
}

/// Owned guestbook state, shared with request handlers through Rocket's
/// managed state. Cloning is cheap and every clone sees the same list.
#[derive(Clone)]
pub struct Guestbook {
    collection: Arc<dyn RemoteCollection>,
    settings: Arc<GuestbookConfig>,
    entries: Arc<watch::Sender<Vec<GuestEntry>>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    notifier: Option<Notifier>,
}

/// Marks a client as having a submission on the wire until dropped.
struct InFlight<'a> {
    clients: &'a Mutex<HashSet<String>>,
    client: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.clients.lock().remove(&self.client);
    }
}

impl Guestbook {
    pub fn new(collection: Arc<dyn RemoteCollection>, settings: GuestbookConfig) -> Self {
        let (entries, _) = watch::channel(Vec::new());
        Guestbook {
            collection,
            settings: Arc::new(settings),
            entries: Arc::new(entries),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn settings(&self) -> &GuestbookConfig {
        &self.settings
    }

    fn begin(&self, client: &str) -> Option<InFlight<'_>> {
        if !self.in_flight.lock().insert(client.to_string()) {
            return None;
        }
        Some(InFlight {
            clients: &self.in_flight,
            client: client.to_string(),
        })
    }

    /// Validates and appends a new entry, then puts it at the head of the
    /// local list. Nothing changes locally when the remote write fails.
    #[instrument(name = "guestbook.submit", skip(self, form))]
    pub async fn submit(&self, client: &str, form: &GuestForm) -> Result<GuestEntry, GuestbookError> {
        let draft = validate(form, &self.settings).inspect_err(|e| {
            debug!(reason = %e, "guestbook submission rejected");
        })?;
        let _in_flight = self.begin(client).ok_or(GuestbookError::InFlight)?;

        let entry = self.collection.append(draft).await.inspect_err(|e| {
            warn!(error = %e, "guestbook write failed");
        })?;

        let cap = self.settings.cap();
        self.entries.send_modify(|list| {
            // the listener may have fetched it already
            if !list.iter().any(|e| e.id == entry.id) {
                list.insert(0, entry.clone());
            }
            if let Some(cap) = cap {
                list.truncate(cap);
            }
        });

        if let Some(notifier) = &self.notifier {
            notifier.entry_submitted(&entry);
        }
        info!(id = %entry.id, attendance = %entry.attendance, "guestbook entry added");
        Ok(entry)
    }

    /// Current local list, newest first.
    pub fn entries(&self) -> Vec<GuestEntry> {
        self.entries.borrow().clone()
    }

    /// Receiver that observes every change to the local list.
    pub fn watch(&self) -> watch::Receiver<Vec<GuestEntry>> {
        self.entries.subscribe()
    }

    /// Replaces the local list with a fresh fetch. On failure the last good
    /// list stays in place.
    pub async fn refresh(&self) -> Result<usize, CollectionError> {
        let fetched = self.collection.list(self.settings.cap()).await?;
        let count = fetched.len();
        self.entries.send_if_modified(|list| {
            if *list == fetched {
                return false;
            }
            *list = fetched;
            true
        });
        Ok(count)
    }

    /// Entries for display, newest first, honouring the listing strategy.
    pub async fn listing(&self, limit: Option<usize>) -> Vec<GuestEntry> {
        if self.settings.listing == ListingStrategy::OneShot {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "guestbook fetch failed, showing last known entries");
            }
        }
        let list = self.entries.borrow();
        let n = limit.unwrap_or(list.len());
        list.iter().take(n).cloned().collect()
    }

    /// Attendance counts over the whole collection.
    pub async fn summary(&self) -> AttendanceSummary {
        match self.collection.list(None).await {
            Ok(all) => AttendanceSummary::tally(&all),
            Err(e) => {
                warn!(error = %e, "guestbook fetch failed, counting last known entries");
                AttendanceSummary::tally(self.entries.borrow().iter())
            }
        }
    }

    /// Keeps the local list in sync with the collection until `shutdown`
    /// resolves. Besides change signals, the list is re-fetched every
    /// `poll_secs` so writes from other processes show up too.
    pub async fn run_listener<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut changes = self.collection.changes();
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "initial guestbook load failed");
        }

        let mut poll = self.settings.poll_interval().map(|period| {
            let mut ticks = time::interval_at(time::Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks
        });

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = next_poll(&mut poll) => {
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "guestbook poll failed");
                    }
                }
                change = changes.recv() => match change {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        if let Err(e) = self.refresh().await {
                            warn!(error = %e, "guestbook resync failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        info!("guestbook listener stopped");
    }
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(ticks) => {
            ticks.tick().await;
        }
        None => std::future::pending().await,
    }
}
