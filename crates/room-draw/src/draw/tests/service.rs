use super::common::*;

use crate::draw::domain::StudentId;
use crate::draw::ledger::{LedgerEntity, LedgerError};
use crate::draw::notifications::BumpDisposition;

#[test]
fn replacing_two_occupants_notifies_each_bumped_student() {
    let (service, _, dispatcher) = build_service(campus());
    service
        .assign(&room_id("N101A"), &ids(&[1, 4]), None)
        .expect("initial assignment");

    let receipt = service
        .assign(&room_id("N101A"), &ids(&[5]), None)
        .expect("replacement succeeds");

    assert_eq!(receipt.room.occupants, ids(&[5]));
    assert_eq!(receipt.room.dorm_name, "North");
    let dispositions: Vec<_> = receipt
        .notifications
        .iter()
        .map(|entry| (entry.student_id, entry.disposition.clone()))
        .collect();
    assert_eq!(
        dispositions,
        vec![
            (StudentId(1), BumpDisposition::Queued),
            (StudentId(4), BumpDisposition::OptedOut),
        ]
    );

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].student_id, StudentId(1));
    assert_eq!(sent[0].dorm_name, "North");
}

#[test]
fn failed_assignment_sends_nothing() {
    let (service, store, dispatcher) = build_service(campus());
    service
        .assign(&room_id("N102B"), &ids(&[3]), None)
        .expect("initial assignment");

    let err = service
        .assign(&room_id("N102B"), &ids(&[1, 2]), None)
        .expect_err("capacity exceeded");

    assert_eq!(err.code(), "capacity_exceeded");
    assert!(dispatcher.sent().is_empty());
    assert_eq!(store.changes().len(), 1);
}

#[test]
fn clearing_own_room_only_notifies_roommates() {
    let (service, _, dispatcher) = build_service(campus());
    service
        .assign(&room_id("A101"), &ids(&[1, 3]), None)
        .expect("initial assignment");

    let receipt = service
        .clear(&room_id("A101"), Some(StudentId(1)))
        .expect("clear succeeds");

    assert_eq!(receipt.notifications.len(), 1);
    assert_eq!(receipt.notifications[0].student_id, StudentId(3));
    assert_eq!(dispatcher.sent().len(), 1);
    assert!(receipt.room.occupants.is_empty());
    assert!(receipt.room.priority.is_none());
}

#[test]
fn ranking_can_skip_placed_students() {
    let (service, _, _) = build_service(campus());
    service
        .assign(&room_id("N101A"), &ids(&[6, 1]), None)
        .expect("assignment succeeds");

    let everyone = service.ranking(NORTH, false);
    assert_eq!(everyone.dorm_name, "North");
    assert_eq!(everyone.entries.len(), 8);
    assert_eq!(everyone.entries[0].student_id, StudentId(6));
    assert_eq!(everyone.entries[0].position, 1);
    assert_eq!(everyone.entries[1].room, Some(room_id("N101A")));

    let unplaced = service.ranking(NORTH, true);
    let order: Vec<u32> = unplaced.entries.iter().map(|e| e.student_id.0).collect();
    assert_eq!(order, vec![2, 7, 3, 5, 4, 8]);
    assert_eq!(unplaced.entries[0].position, 1);
    assert_eq!(unplaced.entries[0].name, "First2 Last2");
}

#[test]
fn room_view_reports_missing_rooms() {
    let (service, _, _) = build_service(campus());

    assert_eq!(
        service.room(&room_id("Z1")),
        Err(LedgerError::NotFound(LedgerEntity::Room(room_id("Z1"))))
    );
    let view = service.room(&room_id("L101")).expect("room exists");
    assert_eq!(view.dorm_name, "Linde");
    assert_eq!(view.max_occupancy, 1);
}

#[test]
fn frosh_operations_pass_through() {
    let (service, _, _) = build_service(campus());

    let outcome = service
        .set_frosh(&room_id("N102A"), true)
        .expect("suite empty");
    assert_eq!(outcome.changes.len(), 2);

    let outcome = service
        .relocate_frosh(&room_id("N102A"), &room_id("N101B"))
        .expect("relocation succeeds");
    assert_eq!(outcome.changes.len(), 4);
    assert!(service.room(&room_id("N101A")).expect("room").has_frosh);
    assert!(!service.room(&room_id("N102B")).expect("room").has_frosh);
    assert!(service.ledger().snapshot().validate().is_ok());
}
