use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use room_draw::config::DrawConfig;
use room_draw::draw::{
    BumpNotification, NotificationDispatcher, NotificationError, OccupancyChange, OccupancyLedger,
    OccupancyStore, RoomDrawService, RosterPreferences, RosterProvider, RosterSnapshot,
    StoreError,
};
use room_draw::error::AppError;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub(crate) type ApiService = RoomDrawService<JournalingStore, RosterPreferences, OutboxDispatcher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Committed ledger change with its position in the journal.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct JournalEntry {
    pub(crate) sequence: u64,
    pub(crate) committed_at: DateTime<Utc>,
    pub(crate) change: OccupancyChange,
}

/// Append-only in-memory journal of every committed change.
#[derive(Default)]
pub(crate) struct JournalingStore {
    entries: Mutex<Vec<JournalEntry>>,
}

impl JournalingStore {
    pub(crate) fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().expect("journal mutex poisoned").clone()
    }
}

impl OccupancyStore for JournalingStore {
    fn commit(&self, change: &OccupancyChange) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().expect("journal mutex poisoned");
        let sequence = guard.len() as u64 + 1;
        debug!(sequence, rooms = change.rooms.len(), "journaling occupancy change");
        guard.push(JournalEntry {
            sequence,
            committed_at: Utc::now(),
            change: change.clone(),
        });
        Ok(())
    }
}

/// Rendered email waiting for a mail relay.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OutboundMessage {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) body: String,
    pub(crate) queued_at: DateTime<Utc>,
}

pub(crate) struct OutboxDispatcher {
    sender: String,
    messages: Mutex<Vec<OutboundMessage>>,
}

impl OutboxDispatcher {
    pub(crate) fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().expect("outbox mutex poisoned").clone()
    }
}

impl NotificationDispatcher for OutboxDispatcher {
    fn dispatch(&self, notification: BumpNotification) -> Result<(), NotificationError> {
        let message = OutboundMessage {
            from: self.sender.clone(),
            to: notification.recipient.clone(),
            subject: notification.subject(),
            body: notification.body(),
            queued_at: notification.queued_at,
        };
        info!(to = %message.to, subject = %message.subject, "bump notification queued");
        self.messages
            .lock()
            .expect("outbox mutex poisoned")
            .push(message);
        Ok(())
    }
}

/// Collaborators behind one running service, kept for inspection.
pub(crate) struct DrawRuntime {
    pub(crate) service: Arc<ApiService>,
    pub(crate) journal: Arc<JournalingStore>,
    pub(crate) outbox: Arc<OutboxDispatcher>,
}

pub(crate) fn build_runtime(
    snapshot: RosterSnapshot,
    sender: &str,
) -> Result<DrawRuntime, AppError> {
    let preferences = Arc::new(RosterPreferences::from_students(&snapshot.students));
    let journal = Arc::new(JournalingStore::default());
    let outbox = Arc::new(OutboxDispatcher::new(sender));
    let ledger = OccupancyLedger::from_snapshot(snapshot, journal.clone())?;
    let service = Arc::new(RoomDrawService::new(
        Arc::new(ledger),
        preferences,
        outbox.clone(),
    ));

    Ok(DrawRuntime {
        service,
        journal,
        outbox,
    })
}

/// Configured roster files, or the built-in demo campus when none are set.
pub(crate) fn load_roster(config: &DrawConfig) -> Result<RosterSnapshot, AppError> {
    match config.roster_files() {
        Some(files) => {
            let snapshot = files.snapshot()?;
            info!(
                layout = %files.layout.display(),
                students = snapshot.students.len(),
                rooms = snapshot.rooms.len(),
                "roster loaded"
            );
            Ok(snapshot)
        }
        None => {
            info!("no roster configured; serving the demo campus");
            Ok(crate::demo::demo_campus())
        }
    }
}
