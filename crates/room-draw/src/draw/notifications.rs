use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{DormId, RoomId, Student, StudentId};

/// An involuntary eviction produced by a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bump {
    pub student_id: StudentId,
    pub room_id: RoomId,
    pub room_label: String,
    pub dorm: DormId,
}

/// Contact settings for a student, as held by the preference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub enabled: bool,
    pub address: String,
    #[serde(default)]
    pub display_name: String,
}

/// Notification intent handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BumpNotification {
    pub student_id: StudentId,
    pub recipient: String,
    pub recipient_name: String,
    pub room_label: String,
    pub dorm_name: String,
    pub queued_at: DateTime<Utc>,
}

impl BumpNotification {
    pub fn subject(&self) -> String {
        format!(
            "(no-reply) Digital Draw Notification - Bumped from {}, {}",
            self.dorm_name, self.room_label
        )
    }

    pub fn body(&self) -> String {
        let greeting = if self.recipient_name.trim().is_empty() {
            "student"
        } else {
            self.recipient_name.as_str()
        };

        format!(
            "Dear {greeting},\n\n\
             This email is to notify you that you have been bumped from room {} in {} Dorm.\n\
             Please log in to the room draw system to view more details.\n",
            self.room_label, self.dorm_name
        )
    }
}

pub trait NotificationPreferences: Send + Sync {
    fn lookup(&self, student: StudentId) -> Result<NotificationPreference, NotificationError>;
}

/// Out-of-band delivery (mail relay, queue, ...).
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: BumpNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification preferences unavailable for student {0}")]
    PreferencesUnavailable(StudentId),
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// What happened to a single bump report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum BumpDisposition {
    Queued,
    OptedOut,
    MissingAddress,
    Failed(String),
}

/// Turns bump reports into notification intents for students who opted in.
pub struct BumpNotificationTrigger<P, D> {
    preferences: Arc<P>,
    dispatcher: Arc<D>,
}

impl<P, D> Clone for BumpNotificationTrigger<P, D> {
    fn clone(&self) -> Self {
        Self {
            preferences: Arc::clone(&self.preferences),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<P, D> BumpNotificationTrigger<P, D>
where
    P: NotificationPreferences,
    D: NotificationDispatcher,
{
    pub fn new(preferences: Arc<P>, dispatcher: Arc<D>) -> Self {
        Self {
            preferences,
            dispatcher,
        }
    }

    /// Never fails: lookup and delivery problems are logged and reported as `Failed`.
    pub fn record_bump(&self, bump: &Bump) -> BumpDisposition {
        let preference = match self.preferences.lookup(bump.student_id) {
            Ok(preference) => preference,
            Err(err) => {
                warn!(student = %bump.student_id, error = %err, "bump notification skipped");
                return BumpDisposition::Failed(err.to_string());
            }
        };

        if !preference.enabled {
            debug!(student = %bump.student_id, "student has not opted into bump notifications");
            return BumpDisposition::OptedOut;
        }

        let address = preference.address.trim();
        if address.is_empty() {
            debug!(student = %bump.student_id, "student has no contact address");
            return BumpDisposition::MissingAddress;
        }

        let notification = BumpNotification {
            student_id: bump.student_id,
            recipient: address.to_string(),
            recipient_name: preference.display_name,
            room_label: bump.room_label.clone(),
            dorm_name: bump.dorm.name(),
            queued_at: Utc::now(),
        };

        match self.dispatcher.dispatch(notification) {
            Ok(()) => BumpDisposition::Queued,
            Err(err) => {
                warn!(
                    student = %bump.student_id,
                    room = %bump.room_id,
                    error = %err,
                    "bump notification delivery failed"
                );
                BumpDisposition::Failed(err.to_string())
            }
        }
    }
}

/// Preference table captured from the roster at startup.
#[derive(Debug, Default)]
pub struct RosterPreferences {
    entries: HashMap<StudentId, NotificationPreference>,
}

impl RosterPreferences {
    pub fn from_students(students: &[Student]) -> Self {
        let entries = students
            .iter()
            .map(|student| {
                let display_name = format!("{} {}", student.first_name, student.last_name)
                    .trim()
                    .to_string();
                (
                    student.id,
                    NotificationPreference {
                        enabled: student.notifications_enabled,
                        address: student.email.clone().unwrap_or_default(),
                        display_name,
                    },
                )
            })
            .collect();

        Self { entries }
    }
}

impl NotificationPreferences for RosterPreferences {
    fn lookup(&self, student: StudentId) -> Result<NotificationPreference, NotificationError> {
        self.entries
            .get(&student)
            .cloned()
            .ok_or(NotificationError::PreferencesUnavailable(student))
    }
}

/// Dispatcher that only records intents in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

impl NotificationDispatcher for LoggingDispatcher {
    fn dispatch(&self, notification: BumpNotification) -> Result<(), NotificationError> {
        tracing::info!(
            student = %notification.student_id,
            recipient = %notification.recipient,
            subject = %notification.subject(),
            "bump notification queued"
        );
        Ok(())
    }
}
