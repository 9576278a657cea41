//! In-memory occupancy ledger.
//!
//! Every mutation runs in three phases while holding the locks of every suite
//! and student it touches: plan against the current state, commit the planned
//! after-image through the [`OccupancyStore`], then apply it to memory. Locks
//! are taken in ascending [`LockKey`] order, so two operations never wait on
//! each other in opposite orders. Operations on disjoint suites run in
//! parallel, including their store commits.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use super::domain::{
    DormId, Room, RoomId, Student, StudentId, Suite, SuiteGroup, SuiteGroupId, SuiteId,
};
use super::frosh::{FroshChange, FroshConsistencyRule, FroshPlan, SuiteView};
use super::notifications::Bump;
use super::priority::{compare_priority, compute_priority, PriorityOrdering, PullPriority, PullType};
use super::repository::{
    ChangeKind, OccupancyChange, OccupancyStore, StoreError, StudentPlacement,
};
use super::roster::{RosterError, RosterSnapshot};

/// Record kinds a [`LedgerError::NotFound`] can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntity {
    Room(RoomId),
    Student(StudentId),
    Suite(SuiteId),
}

impl fmt::Display for LedgerEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEntity::Room(id) => write!(f, "room {id}"),
            LedgerEntity::Student(id) => write!(f, "student {id}"),
            LedgerEntity::Suite(id) => write!(f, "suite {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("room {room} holds at most {max} occupants but {requested} were requested")]
    CapacityExceeded {
        room: RoomId,
        max: usize,
        requested: usize,
    },
    #[error("room {0} is not empty")]
    RoomNotEmpty(RoomId),
    #[error("other rooms in suite {0} are not empty")]
    SuiteNotEmpty(SuiteId),
    #[error("concurrent update conflict: {0}")]
    PersistenceConflict(String),
    #[error("{0} not found")]
    NotFound(LedgerEntity),
    #[error("student {0} was listed more than once")]
    DuplicateOccupant(StudentId),
    #[error("room {0} does not have frosh")]
    NoFroshToRelocate(RoomId),
    #[error("rooms {from} and {to} are in different dorms")]
    DormMismatch { from: RoomId, to: RoomId },
    #[error("suite {0} hosts a resident-life room; its frosh cannot be moved")]
    ResidentLifeSuite(SuiteId),
    #[error("room {0} already has frosh")]
    TargetHasFrosh(RoomId),
    #[error("rooms {from} and {to} are different frosh room types")]
    FroshRoomTypeMismatch { from: RoomId, to: RoomId },
    #[error("suite {0} already has frosh")]
    SuiteAlreadyHasFrosh(SuiteId),
    #[error("room {0} is held for frosh")]
    RoomHasFrosh(RoomId),
    #[error("room {0} is not a frosh room")]
    NotFroshRoom(RoomId),
    #[error("occupancy store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::CapacityExceeded { .. } => "capacity_exceeded",
            LedgerError::RoomNotEmpty(_) => "room_not_empty",
            LedgerError::SuiteNotEmpty(_) => "suite_not_empty",
            LedgerError::PersistenceConflict(_) => "persistence_conflict",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::DuplicateOccupant(_) => "duplicate_occupant",
            LedgerError::NoFroshToRelocate(_) => "no_frosh_to_relocate",
            LedgerError::DormMismatch { .. } => "dorm_mismatch",
            LedgerError::ResidentLifeSuite(_) => "resident_life_suite",
            LedgerError::TargetHasFrosh(_) => "target_has_frosh",
            LedgerError::FroshRoomTypeMismatch { .. } => "frosh_room_type_mismatch",
            LedgerError::SuiteAlreadyHasFrosh(_) => "suite_already_has_frosh",
            LedgerError::RoomHasFrosh(_) => "room_has_frosh",
            LedgerError::NotFroshRoom(_) => "not_frosh_room",
            LedgerError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            conflict => Self::PersistenceConflict(conflict.to_string()),
        }
    }
}

/// A student who changed rooms as part of an assignment. Moves are not bumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentMove {
    pub student_id: StudentId,
    pub from: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentOutcome {
    pub room: Room,
    pub bumped: Vec<Bump>,
    pub moved: Vec<StudentMove>,
    pub disbanded_groups: Vec<SuiteGroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FroshOutcome {
    pub changes: Vec<FroshChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum LockKey {
    Suite(SuiteId),
    Student(StudentId),
}

/// One exclusive section per suite and per student, fixed at construction.
struct LockTable {
    entries: HashMap<LockKey, Mutex<()>>,
}

impl LockTable {
    fn for_state(state: &LedgerState) -> Self {
        let entries = state
            .suites
            .keys()
            .map(|suite| LockKey::Suite(suite.clone()))
            .chain(state.students.iter().map(|student| LockKey::Student(student.id)))
            .map(|key| (key, Mutex::new(())))
            .collect();
        Self { entries }
    }

    fn acquire(&self, keys: &BTreeSet<LockKey>) -> Vec<MutexGuard<'_, ()>> {
        keys.iter()
            .filter_map(|key| self.entries.get(key))
            .map(|section| section.lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }
}

struct LedgerState {
    students: Vec<Student>,
    student_index: HashMap<StudentId, usize>,
    rooms: BTreeMap<RoomId, Room>,
    suites: BTreeMap<SuiteId, Suite>,
    suite_groups: BTreeMap<SuiteGroupId, SuiteGroup>,
}

impl SuiteView for LedgerState {
    fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    fn suite(&self, id: &SuiteId) -> Option<&Suite> {
        self.suites.get(id)
    }
}

impl LedgerState {
    fn from_snapshot(snapshot: RosterSnapshot) -> Self {
        let student_index = snapshot
            .students
            .iter()
            .enumerate()
            .map(|(index, student)| (student.id, index))
            .collect();

        Self {
            students: snapshot.students,
            student_index,
            rooms: snapshot
                .rooms
                .into_iter()
                .map(|room| (room.id.clone(), room))
                .collect(),
            suites: snapshot
                .suites
                .into_iter()
                .map(|suite| (suite.id.clone(), suite))
                .collect(),
            suite_groups: snapshot
                .suite_groups
                .into_iter()
                .map(|group| (group.id.clone(), group))
                .collect(),
        }
    }

    fn student(&self, id: StudentId) -> Option<&Student> {
        self.student_index
            .get(&id)
            .and_then(|index| self.students.get(*index))
    }

    fn require_room(&self, id: &RoomId) -> Result<&Room, LedgerError> {
        self.rooms
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(LedgerEntity::Room(id.clone())))
    }

    fn require_student(&self, id: StudentId) -> Result<&Student, LedgerError> {
        self.student(id)
            .ok_or(LedgerError::NotFound(LedgerEntity::Student(id)))
    }

    /// Suites of every room a group spans, including the room itself.
    fn group_suites(&self, room: &Room) -> BTreeSet<SuiteId> {
        let mut suites = BTreeSet::from([room.suite.clone()]);
        if let Some(group) = room
            .suite_group
            .as_ref()
            .and_then(|id| self.suite_groups.get(id))
        {
            suites.extend(
                group
                    .rooms
                    .iter()
                    .filter_map(|id| self.rooms.get(id))
                    .map(|member| member.suite.clone()),
            );
        }
        suites
    }

    fn assignment_keys(
        &self,
        room_id: &RoomId,
        students: &[StudentId],
    ) -> Result<BTreeSet<LockKey>, LedgerError> {
        let room = self.require_room(room_id)?;
        let mut keys: BTreeSet<LockKey> = self
            .group_suites(room)
            .into_iter()
            .map(LockKey::Suite)
            .collect();
        keys.extend(room.occupants.iter().map(|id| LockKey::Student(*id)));

        for id in students {
            let student = self.require_student(*id)?;
            keys.insert(LockKey::Student(*id));
            if let Some(prior) = student.room.as_ref().and_then(|prior| self.rooms.get(prior)) {
                keys.extend(self.group_suites(prior).into_iter().map(LockKey::Suite));
            }
        }

        Ok(keys)
    }

    fn plan_assignment(
        &self,
        room_id: &RoomId,
        students: &[StudentId],
        requested_by: Option<StudentId>,
    ) -> Result<(OccupancyChange, AssignmentOutcome), LedgerError> {
        let room = self.require_room(room_id)?;

        if room.has_frosh && !students.is_empty() {
            return Err(LedgerError::RoomHasFrosh(room.id.clone()));
        }

        if students.len() > room.max_occupancy {
            return Err(LedgerError::CapacityExceeded {
                room: room.id.clone(),
                max: room.max_occupancy,
                requested: students.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for id in students {
            if !seen.insert(*id) {
                return Err(LedgerError::DuplicateOccupant(*id));
            }
            self.require_student(*id)?;
        }

        let mut rooms_after: BTreeMap<RoomId, Room> = BTreeMap::new();
        let mut placements = Vec::new();
        let mut bumped = Vec::new();
        let mut moved = Vec::new();
        let mut disbanded = BTreeSet::new();

        for occupant in &room.occupants {
            if students.contains(occupant) {
                continue;
            }
            placements.push(StudentPlacement {
                student: *occupant,
                room: None,
            });
            if requested_by == Some(*occupant) {
                debug!(room = %room.id, student = %occupant, "requester vacated their own room");
                continue;
            }
            bumped.push(Bump {
                student_id: *occupant,
                room_id: room.id.clone(),
                room_label: room.label.clone(),
                dorm: room.dorm,
            });
        }

        for id in students {
            let student = self.require_student(*id)?;
            let prior_room = student
                .room
                .as_ref()
                .filter(|prior| *prior != room_id)
                .and_then(|prior| self.rooms.get(prior));
            if let Some(original) = prior_room {
                let prior_id = &original.id;
                let prior = rooms_after
                    .entry(prior_id.clone())
                    .or_insert_with(|| original.clone());
                prior.occupants.retain(|occupant| occupant != id);
                if prior.occupants.is_empty() {
                    prior.priority = None;
                    if let Some(group) = prior.suite_group.clone() {
                        disbanded.insert(group);
                    }
                }
                moved.push(StudentMove {
                    student_id: *id,
                    from: prior_id.clone(),
                });
            }
            placements.push(StudentPlacement {
                student: *id,
                room: Some(room.id.clone()),
            });
        }

        let mut target = room.clone();
        target.occupants = students.to_vec();
        target.priority = self.claim_priority(students, room.dorm);
        let evicted_any = room
            .occupants
            .iter()
            .any(|occupant| !students.contains(occupant));
        if evicted_any || target.occupants.is_empty() {
            if let Some(group) = target.suite_group.clone() {
                disbanded.insert(group);
            }
        }
        rooms_after.insert(target.id.clone(), target);

        for group_id in &disbanded {
            if let Some(group) = self.suite_groups.get(group_id) {
                for member_room in &group.rooms {
                    if let Some(original) = self.rooms.get(member_room) {
                        rooms_after
                            .entry(member_room.clone())
                            .or_insert_with(|| original.clone())
                            .suite_group = None;
                    }
                }
            }
            for candidate in rooms_after.values_mut() {
                if candidate.suite_group.as_ref() == Some(group_id) {
                    candidate.suite_group = None;
                }
            }
        }

        let rooms: Vec<Room> = rooms_after.into_values().collect();
        let room_after = rooms
            .iter()
            .find(|candidate| &candidate.id == room_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(LedgerEntity::Room(room_id.clone())))?;
        let disbanded_groups: Vec<SuiteGroupId> = disbanded.into_iter().collect();

        let change = OccupancyChange {
            kind: ChangeKind::Assign {
                room: room_id.clone(),
            },
            rooms,
            students: placements,
            disbanded_groups: disbanded_groups.clone(),
        };
        let outcome = AssignmentOutcome {
            room: room_after,
            bumped,
            moved,
            disbanded_groups,
        };

        Ok((change, outcome))
    }

    /// Best freshly computed priority among the incoming occupants.
    fn claim_priority(&self, students: &[StudentId], dorm: DormId) -> Option<PullPriority> {
        students
            .iter()
            .filter_map(|id| self.student(*id))
            .map(|student| compute_priority(student, dorm).with_pull_type(PullType::SelfPull))
            .fold(None, |best: Option<PullPriority>, candidate| match best {
                Some(current)
                    if compare_priority(&candidate, &current) != PriorityOrdering::Higher =>
                {
                    Some(current)
                }
                _ => Some(candidate),
            })
    }

    fn plan_frosh(&self, kind: ChangeKind, plan: &FroshPlan) -> OccupancyChange {
        let rooms = plan
            .changes
            .iter()
            .filter_map(|change| {
                self.rooms.get(&change.room).map(|room| {
                    let mut updated = room.clone();
                    updated.has_frosh = change.has_frosh;
                    updated
                })
            })
            .collect();

        OccupancyChange {
            kind,
            rooms,
            students: Vec::new(),
            disbanded_groups: Vec::new(),
        }
    }

    fn apply(&mut self, change: &OccupancyChange) {
        for room in &change.rooms {
            self.rooms.insert(room.id.clone(), room.clone());
        }

        for placement in &change.students {
            if let Some(index) = self.student_index.get(&placement.student) {
                if let Some(student) = self.students.get_mut(*index) {
                    student.room = placement.room.clone();
                }
            }
        }

        for group_id in &change.disbanded_groups {
            if let Some(group) = self.suite_groups.get_mut(group_id) {
                group.disbanded = true;
            }
            for student in &mut self.students {
                if student.suite_group.as_ref() == Some(group_id) {
                    student.suite_group = None;
                }
            }
        }
    }

    fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            students: self.students.clone(),
            rooms: self.rooms.values().cloned().collect(),
            suites: self.suites.values().cloned().collect(),
            suite_groups: self.suite_groups.values().cloned().collect(),
        }
    }
}

/// Central mutation surface for rooms, students, and frosh flags.
pub struct OccupancyLedger<S> {
    state: Mutex<LedgerState>,
    locks: LockTable,
    store: Arc<S>,
}

impl<S> OccupancyLedger<S>
where
    S: OccupancyStore,
{
    pub fn from_snapshot(snapshot: RosterSnapshot, store: Arc<S>) -> Result<Self, RosterError> {
        snapshot.validate()?;
        let state = LedgerState::from_snapshot(snapshot);
        let locks = LockTable::for_state(&state);

        Ok(Self {
            state: Mutex::new(state),
            locks,
            store,
        })
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn assign(
        &self,
        room: &RoomId,
        students: &[StudentId],
    ) -> Result<AssignmentOutcome, LedgerError> {
        self.assign_as(room, students, None)
    }

    /// Like [`assign`](Self::assign), but an eviction of `requested_by` is voluntary
    /// and produces no bump.
    pub fn assign_as(
        &self,
        room: &RoomId,
        students: &[StudentId],
        requested_by: Option<StudentId>,
    ) -> Result<AssignmentOutcome, LedgerError> {
        let keys = self.state().assignment_keys(room, students)?;
        let _sections = self.locks.acquire(&keys);

        let (change, outcome) = {
            let state = self.state();
            let current = state.assignment_keys(room, students)?;
            if !current.is_subset(&keys) {
                return Err(LedgerError::PersistenceConflict(format!(
                    "occupancy around room {room} changed while waiting for it"
                )));
            }
            state.plan_assignment(room, students, requested_by)?
        };

        self.commit(change)?;

        info!(
            room = %room,
            occupants = outcome.room.occupants.len(),
            bumped = outcome.bumped.len(),
            moved = outcome.moved.len(),
            "room occupants updated"
        );
        Ok(outcome)
    }

    pub fn clear(&self, room: &RoomId) -> Result<AssignmentOutcome, LedgerError> {
        self.assign(room, &[])
    }

    pub fn clear_as(
        &self,
        room: &RoomId,
        requested_by: Option<StudentId>,
    ) -> Result<AssignmentOutcome, LedgerError> {
        self.assign_as(room, &[], requested_by)
    }

    pub fn set_frosh(&self, room: &RoomId, present: bool) -> Result<FroshOutcome, LedgerError> {
        let suite = self.state().require_room(room)?.suite.clone();
        let keys = BTreeSet::from([LockKey::Suite(suite)]);
        let _sections = self.locks.acquire(&keys);

        let change = {
            let state = self.state();
            let plan = if present {
                FroshConsistencyRule::enable(&*state, room)?
            } else {
                FroshConsistencyRule::disable(&*state, room)?
            };
            ensure_locked(&keys, &plan, &state)?;
            state.plan_frosh(
                ChangeKind::SetFrosh {
                    room: room.clone(),
                    present,
                },
                &plan,
            )
        };

        let changes = frosh_changes(&change);
        self.commit(change)?;

        info!(room = %room, present, rooms = changes.len(), "frosh occupancy updated");
        Ok(FroshOutcome { changes })
    }

    pub fn relocate_frosh(&self, from: &RoomId, to: &RoomId) -> Result<FroshOutcome, LedgerError> {
        let keys = {
            let state = self.state();
            BTreeSet::from([
                LockKey::Suite(state.require_room(from)?.suite.clone()),
                LockKey::Suite(state.require_room(to)?.suite.clone()),
            ])
        };
        let _sections = self.locks.acquire(&keys);

        let change = {
            let state = self.state();
            let plan = FroshConsistencyRule::relocate(&*state, from, to)?;
            ensure_locked(&keys, &plan, &state)?;
            state.plan_frosh(
                ChangeKind::RelocateFrosh {
                    from: from.clone(),
                    to: to.clone(),
                },
                &plan,
            )
        };

        let changes = frosh_changes(&change);
        self.commit(change)?;

        info!(from = %from, to = %to, "frosh relocated");
        Ok(FroshOutcome { changes })
    }

    /// Persists the change, then makes it visible. Callers hold the relevant sections.
    fn commit(&self, change: OccupancyChange) -> Result<(), LedgerError> {
        self.store.commit(&change)?;
        self.state().apply(&change);
        Ok(())
    }

    pub fn room(&self, id: &RoomId) -> Option<Room> {
        self.state().rooms.get(id).cloned()
    }

    pub fn student(&self, id: StudentId) -> Option<Student> {
        self.state().student(id).cloned()
    }

    pub fn suite(&self, id: &SuiteId) -> Option<Suite> {
        self.state().suites.get(id).cloned()
    }

    pub fn suite_group(&self, id: &SuiteGroupId) -> Option<SuiteGroup> {
        self.state().suite_groups.get(id).cloned()
    }

    /// Students in roster order.
    pub fn students(&self) -> Vec<Student> {
        self.state().students.clone()
    }

    pub fn rooms_in_dorm(&self, dorm: DormId) -> Vec<Room> {
        self.state()
            .rooms
            .values()
            .filter(|room| room.dorm == dorm)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.state().snapshot()
    }
}

fn ensure_locked(
    keys: &BTreeSet<LockKey>,
    plan: &FroshPlan,
    state: &LedgerState,
) -> Result<(), LedgerError> {
    match plan
        .suites(state)
        .into_iter()
        .find(|suite| !keys.contains(&LockKey::Suite(suite.clone())))
    {
        Some(suite) => Err(LedgerError::PersistenceConflict(format!(
            "suite {suite} was not held for this frosh update"
        ))),
        None => Ok(()),
    }
}

fn frosh_changes(change: &OccupancyChange) -> Vec<FroshChange> {
    change
        .rooms
        .iter()
        .map(|room| FroshChange {
            room: room.id.clone(),
            has_frosh: room.has_frosh,
        })
        .collect()
}
