//! Frosh occupancy flags.
//!
//! Only empty rooms with a frosh room type can take the flag. Inner dorms treat
//! it as a property of the whole suite: it can only be raised while every room
//! of the suite is empty, and raising or clearing it touches every room at
//! once. Elsewhere the flag belongs to a single room. Clearing never requires
//! empty rooms.

use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{FroshPolicy, Room, RoomId, Suite, SuiteId};
use super::ledger::{LedgerEntity, LedgerError};

/// Read access the rule needs from the ledger.
pub trait SuiteView {
    fn room(&self, id: &RoomId) -> Option<&Room>;
    fn suite(&self, id: &SuiteId) -> Option<&Suite>;

    fn suite_rooms(&self, id: &SuiteId) -> Vec<&Room> {
        self.suite(id)
            .map(|suite| suite.rooms.iter().filter_map(|room| self.room(room)).collect())
            .unwrap_or_default()
    }
}

/// Flag changes designated by the rule, applied by the ledger in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FroshPlan {
    pub changes: Vec<FroshChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FroshChange {
    pub room: RoomId,
    pub has_frosh: bool,
}

impl FroshPlan {
    fn push_all<'a>(&mut self, rooms: impl IntoIterator<Item = &'a Room>, has_frosh: bool) {
        for room in rooms {
            self.changes.push(FroshChange {
                room: room.id.clone(),
                has_frosh,
            });
        }
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.changes.iter().map(|change| &change.room)
    }

    /// Suites whose rooms the plan reads or writes.
    pub fn suites(&self, view: &impl SuiteView) -> BTreeSet<SuiteId> {
        self.rooms()
            .filter_map(|room| view.room(room))
            .map(|room| room.suite.clone())
            .collect()
    }
}

pub struct FroshConsistencyRule;

impl FroshConsistencyRule {
    pub fn enable(view: &impl SuiteView, room_id: &RoomId) -> Result<FroshPlan, LedgerError> {
        let room = lookup_room(view, room_id)?;
        let mut plan = FroshPlan::default();

        if !matches!(room.frosh_room_type, Some(kind) if kind != 0) {
            return Err(LedgerError::NotFroshRoom(room.id.clone()));
        }
        if !room.is_empty() {
            return Err(LedgerError::RoomNotEmpty(room.id.clone()));
        }

        if !room.dorm.is_inner() {
            plan.push_all([room], true);
            return Ok(plan);
        }

        let suite_rooms = view.suite_rooms(&room.suite);
        if suite_rooms
            .iter()
            .any(|sibling| sibling.id != room.id && !sibling.is_empty())
        {
            return Err(LedgerError::SuiteNotEmpty(room.suite.clone()));
        }

        plan.push_all(suite_rooms, true);
        Ok(plan)
    }

    pub fn disable(view: &impl SuiteView, room_id: &RoomId) -> Result<FroshPlan, LedgerError> {
        let room = lookup_room(view, room_id)?;
        let mut plan = FroshPlan::default();

        if room.dorm.is_inner() {
            plan.push_all(view.suite_rooms(&room.suite), false);
        } else {
            plan.push_all([room], false);
        }

        Ok(plan)
    }

    /// Moves frosh occupancy from `from` to `to` within one dorm.
    pub fn relocate(
        view: &impl SuiteView,
        from: &RoomId,
        to: &RoomId,
    ) -> Result<FroshPlan, LedgerError> {
        let origin = lookup_room(view, from)?;
        let target = lookup_room(view, to)?;

        if !origin.has_frosh {
            return Err(LedgerError::NoFroshToRelocate(origin.id.clone()));
        }
        if origin.dorm != target.dorm {
            return Err(LedgerError::DormMismatch {
                from: origin.id.clone(),
                to: target.id.clone(),
            });
        }

        let origin_suite = view
            .suite(&origin.suite)
            .ok_or_else(|| LedgerError::NotFound(LedgerEntity::Suite(origin.suite.clone())))?;
        if origin_suite.reslife_room.is_some() {
            return Err(LedgerError::ResidentLifeSuite(origin_suite.id.clone()));
        }

        if target.has_frosh {
            return Err(LedgerError::TargetHasFrosh(target.id.clone()));
        }
        if target.frosh_room_type != origin.frosh_room_type {
            return Err(LedgerError::FroshRoomTypeMismatch {
                from: origin.id.clone(),
                to: target.id.clone(),
            });
        }
        if !target.is_empty() {
            return Err(LedgerError::RoomNotEmpty(target.id.clone()));
        }

        let mut plan = FroshPlan::default();
        match origin.dorm.frosh_policy() {
            FroshPolicy::SuiteWide => {
                let target_rooms = view.suite_rooms(&target.suite);
                if target_rooms.iter().any(|room| !room.is_empty()) {
                    return Err(LedgerError::SuiteNotEmpty(target.suite.clone()));
                }
                plan.push_all(view.suite_rooms(&origin.suite), false);
                plan.push_all(target_rooms, true);
            }
            FroshPolicy::SuiteExclusive => {
                if view
                    .suite_rooms(&target.suite)
                    .iter()
                    .any(|room| room.has_frosh)
                {
                    return Err(LedgerError::SuiteAlreadyHasFrosh(target.suite.clone()));
                }
                plan.push_all([origin], false);
                plan.push_all([target], true);
            }
            FroshPolicy::PerRoom => {
                plan.push_all([origin], false);
                plan.push_all([target], true);
            }
        }

        Ok(plan)
    }
}

fn lookup_room<'a>(view: &'a impl SuiteView, id: &RoomId) -> Result<&'a Room, LedgerError> {
    view.room(id)
        .ok_or_else(|| LedgerError::NotFound(LedgerEntity::Room(id.clone())))
}
