use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::draw::domain::{
    ClassYear, DormId, Room, RoomId, Student, StudentId, Suite, SuiteGroup, SuiteGroupId,
};
use crate::draw::ledger::OccupancyLedger;
use crate::draw::notifications::{BumpNotification, NotificationDispatcher, NotificationError};
use crate::draw::notifications::RosterPreferences;
use crate::draw::repository::{OccupancyChange, OccupancyStore, StoreError};
use crate::draw::roster::RosterSnapshot;
use crate::draw::service::RoomDrawService;

pub(super) const NORTH: DormId = DormId(2);
pub(super) const ATWOOD: DormId = DormId(5);
pub(super) const LINDE: DormId = DormId(9);

pub(super) fn room_id(id: &str) -> RoomId {
    RoomId::new(id)
}

pub(super) fn ids(raw: &[u32]) -> Vec<StudentId> {
    raw.iter().copied().map(StudentId).collect()
}

pub(super) fn student(id: u32, class_year: ClassYear, draw_number: u32) -> Student {
    let mut student = Student::new(id, class_year, draw_number);
    student.first_name = format!("First{id}");
    student.last_name = format!("Last{id}");
    student
}

pub(super) fn opted_in(mut student: Student) -> Student {
    student.notifications_enabled = true;
    student.email = Some(format!("student{}@example.edu", student.id));
    student
}

fn room(id: &str, dorm: DormId, suite: &str, max_occupancy: usize) -> Room {
    let mut room = Room::new(id, dorm, suite, max_occupancy);
    room.frosh_room_type = Some(1);
    room
}

/// Two North suites, a North suite with a resident-life room, an Atwood suite,
/// and two Linde suites. Every room is a type 1 frosh room. Nobody is placed.
pub(super) fn campus() -> RosterSnapshot {
    let mut reslife_suite = Suite::new("N-103", NORTH, &["N103A", "N103B"]);
    reslife_suite.reslife_room = Some(room_id("N103A"));

    let mut home_senior = opted_in(student(1, ClassYear::Senior, 40));
    home_senior.home_dorm = Some(NORTH);

    let mut preplaced = student(6, ClassYear::Sophomore, 30);
    preplaced.preplaced = true;

    let mut no_address = student(7, ClassYear::Senior, 55);
    no_address.notifications_enabled = true;

    RosterSnapshot {
        students: vec![
            home_senior,
            student(2, ClassYear::Senior, 10),
            opted_in(student(3, ClassYear::Junior, 5)),
            student(4, ClassYear::Sophomore, 1),
            student(5, ClassYear::Junior, 22),
            preplaced,
            no_address,
            student(8, ClassYear::Freshman, 2),
        ],
        rooms: vec![
            room("N101A", NORTH, "N-101", 2),
            room("N101B", NORTH, "N-101", 2),
            room("N102A", NORTH, "N-102", 2),
            room("N102B", NORTH, "N-102", 1),
            room("N103A", NORTH, "N-103", 1),
            room("N103B", NORTH, "N-103", 2),
            room("A101", ATWOOD, "A-1", 2),
            room("A102", ATWOOD, "A-1", 2),
            room("L101", LINDE, "L-1", 1),
            room("L102", LINDE, "L-1", 1),
            room("L201", LINDE, "L-2", 1),
            room("L202", LINDE, "L-2", 1),
        ],
        suites: vec![
            Suite::new("N-101", NORTH, &["N101A", "N101B"]),
            Suite::new("N-102", NORTH, &["N102A", "N102B"]),
            reslife_suite,
            Suite::new("A-1", ATWOOD, &["A101", "A102"]),
            Suite::new("L-1", LINDE, &["L101", "L102"]),
            Suite::new("L-2", LINDE, &["L201", "L202"]),
        ],
        suite_groups: Vec::new(),
    }
}

/// Puts students into a room on both sides of the relation.
pub(super) fn place(snapshot: &mut RosterSnapshot, room: &str, students: &[u32]) {
    let target = room_id(room);
    for entry in snapshot.rooms.iter_mut().filter(|entry| entry.id == target) {
        entry.occupants = ids(students);
    }
    for entry in snapshot
        .students
        .iter_mut()
        .filter(|entry| students.contains(&entry.id.0))
    {
        entry.room = Some(target.clone());
    }
}

/// `campus()` with students 1 and 2 in N101A as suite group `G1` spanning suite N-101.
pub(super) fn campus_with_group() -> RosterSnapshot {
    let mut snapshot = campus();
    place(&mut snapshot, "N101A", &[1, 2]);

    let group = SuiteGroupId("G1".to_string());
    snapshot.suite_groups.push(SuiteGroup {
        id: group.clone(),
        size: 2,
        priority_tier: "senior".to_string(),
        suite: Some(crate::draw::domain::SuiteId::new("N-101")),
        rooms: vec![room_id("N101A"), room_id("N101B")],
        disbanded: false,
    });
    for entry in snapshot
        .rooms
        .iter_mut()
        .filter(|entry| entry.suite.0 == "N-101")
    {
        entry.suite_group = Some(group.clone());
    }
    for entry in snapshot
        .students
        .iter_mut()
        .filter(|entry| entry.id.0 <= 2)
    {
        entry.suite_group = Some(group.clone());
    }
    snapshot
}

#[derive(Default)]
pub(super) struct RecordingStore {
    changes: Mutex<Vec<OccupancyChange>>,
}

impl RecordingStore {
    pub(super) fn changes(&self) -> Vec<OccupancyChange> {
        self.changes.lock().expect("store mutex poisoned").clone()
    }
}

impl OccupancyStore for RecordingStore {
    fn commit(&self, change: &OccupancyChange) -> Result<(), StoreError> {
        self.changes
            .lock()
            .expect("store mutex poisoned")
            .push(change.clone());
        Ok(())
    }
}

pub(super) struct ConflictingStore;

impl OccupancyStore for ConflictingStore {
    fn commit(&self, _change: &OccupancyChange) -> Result<(), StoreError> {
        Err(StoreError::Conflict)
    }
}

pub(super) struct OfflineStore;

impl OccupancyStore for OfflineStore {
    fn commit(&self, _change: &OccupancyChange) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    sent: Mutex<Vec<BumpNotification>>,
}

impl RecordingDispatcher {
    pub(super) fn sent(&self) -> Vec<BumpNotification> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, notification: BumpNotification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn dispatch(&self, _notification: BumpNotification) -> Result<(), NotificationError> {
        Err(NotificationError::DeliveryFailed("smtp relay offline".to_string()))
    }
}

pub(super) fn build_ledger(
    snapshot: RosterSnapshot,
) -> (Arc<OccupancyLedger<RecordingStore>>, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::default());
    let ledger = OccupancyLedger::from_snapshot(snapshot, store.clone()).expect("valid roster");
    (Arc::new(ledger), store)
}

pub(super) type TestService = RoomDrawService<RecordingStore, RosterPreferences, RecordingDispatcher>;

pub(super) fn build_service(
    snapshot: RosterSnapshot,
) -> (TestService, Arc<RecordingStore>, Arc<RecordingDispatcher>) {
    let preferences = Arc::new(RosterPreferences::from_students(&snapshot.students));
    let (ledger, store) = build_ledger(snapshot);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = RoomDrawService::new(ledger, preferences, dispatcher.clone());
    (service, store, dispatcher)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("valid json")
}
