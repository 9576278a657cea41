use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::domain::{ClassYear, DormId, Room, RoomId, Student, StudentId, SuiteGroupId, SuiteId};
use super::ledger::{FroshOutcome, LedgerEntity, LedgerError, OccupancyLedger, StudentMove};
use super::notifications::{
    BumpDisposition, BumpNotificationTrigger, NotificationDispatcher, NotificationPreferences,
};
use super::priority::PullPriority;
use super::ranker::rank;
use super::repository::OccupancyStore;

/// Facade composing the ledger, the ranker, and the bump notification trigger.
pub struct RoomDrawService<S, P, D> {
    ledger: Arc<OccupancyLedger<S>>,
    trigger: BumpNotificationTrigger<P, D>,
}

impl<S, P, D> RoomDrawService<S, P, D>
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    pub fn new(ledger: Arc<OccupancyLedger<S>>, preferences: Arc<P>, dispatcher: Arc<D>) -> Self {
        Self {
            ledger,
            trigger: BumpNotificationTrigger::new(preferences, dispatcher),
        }
    }

    pub fn ledger(&self) -> &OccupancyLedger<S> {
        &self.ledger
    }

    /// Ranks the roster for a dorm, optionally only students without a room.
    pub fn ranking(&self, dorm: DormId, unplaced_only: bool) -> RankingView {
        let students: Vec<_> = self
            .ledger
            .students()
            .into_iter()
            .filter(|student| !unplaced_only || student.room.is_none())
            .collect();

        let by_id: HashMap<StudentId, &Student> =
            students.iter().map(|student| (student.id, student)).collect();

        let entries = rank(&students, dorm)
            .into_iter()
            .zip(1..)
            .filter_map(|(ranked, position)| {
                by_id
                    .get(&ranked.student_id)
                    .map(|student| RankingEntry {
                        position,
                        student_id: student.id,
                        name: format!("{} {}", student.first_name, student.last_name)
                            .trim()
                            .to_string(),
                        class_year: student.class_year,
                        draw_number: student.draw_number,
                        room: student.room.clone(),
                        priority: ranked.priority,
                    })
            })
            .collect();

        RankingView {
            dorm,
            dorm_name: dorm.name(),
            entries,
        }
    }

    pub fn room(&self, room: &RoomId) -> Result<RoomView, LedgerError> {
        self.ledger
            .room(room)
            .map(RoomView::from)
            .ok_or_else(|| LedgerError::NotFound(LedgerEntity::Room(room.clone())))
    }

    /// Replaces a room's occupants and notifies every bumped student once the change is committed.
    pub fn assign(
        &self,
        room: &RoomId,
        occupants: &[StudentId],
        requested_by: Option<StudentId>,
    ) -> Result<AssignmentReceipt, LedgerError> {
        let outcome = self.ledger.assign_as(room, occupants, requested_by)?;

        let notifications = outcome
            .bumped
            .iter()
            .map(|bump| BumpReceipt {
                student_id: bump.student_id,
                room_id: bump.room_id.clone(),
                disposition: self.trigger.record_bump(bump),
            })
            .collect::<Vec<_>>();

        if !notifications.is_empty() {
            info!(
                room = %room,
                bumped = notifications.len(),
                queued = notifications
                    .iter()
                    .filter(|receipt| receipt.disposition == BumpDisposition::Queued)
                    .count(),
                "bump notifications processed"
            );
        }

        Ok(AssignmentReceipt {
            room: RoomView::from(outcome.room),
            moved: outcome.moved,
            disbanded_groups: outcome.disbanded_groups,
            notifications,
        })
    }

    pub fn clear(
        &self,
        room: &RoomId,
        requested_by: Option<StudentId>,
    ) -> Result<AssignmentReceipt, LedgerError> {
        self.assign(room, &[], requested_by)
    }

    pub fn set_frosh(&self, room: &RoomId, present: bool) -> Result<FroshOutcome, LedgerError> {
        self.ledger.set_frosh(room, present)
    }

    pub fn relocate_frosh(&self, from: &RoomId, to: &RoomId) -> Result<FroshOutcome, LedgerError> {
        self.ledger.relocate_frosh(from, to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingView {
    pub dorm: DormId,
    pub dorm_name: String,
    pub entries: Vec<RankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    pub position: usize,
    pub student_id: StudentId,
    pub name: String,
    pub class_year: ClassYear,
    pub draw_number: u32,
    pub room: Option<RoomId>,
    pub priority: PullPriority,
}

/// Room state as exposed to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomView {
    pub room_id: RoomId,
    pub label: String,
    pub dorm: DormId,
    pub dorm_name: String,
    pub suite: SuiteId,
    pub max_occupancy: usize,
    pub occupants: Vec<StudentId>,
    pub has_frosh: bool,
    pub priority: Option<PullPriority>,
    pub suite_group: Option<SuiteGroupId>,
}

impl From<Room> for RoomView {
    fn from(room: Room) -> Self {
        Self {
            dorm_name: room.dorm.name(),
            room_id: room.id,
            label: room.label,
            dorm: room.dorm,
            suite: room.suite,
            max_occupancy: room.max_occupancy,
            occupants: room.occupants,
            has_frosh: room.has_frosh,
            priority: room.priority,
            suite_group: room.suite_group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BumpReceipt {
    pub student_id: StudentId,
    pub room_id: RoomId,
    pub disposition: BumpDisposition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentReceipt {
    pub room: RoomView,
    pub moved: Vec<StudentMove>,
    pub disbanded_groups: Vec<SuiteGroupId>,
    pub notifications: Vec<BumpReceipt>,
}
