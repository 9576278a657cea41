use std::io::Cursor;

use super::common::*;

use crate::draw::domain::{ClassYear, StudentId};
use crate::draw::roster::{RosterError, RosterProvider, RosterSnapshot, StudentCsvImporter};

#[test]
fn campus_fixture_is_consistent() {
    campus().validate().expect("fixture validates");
    campus_with_group().validate().expect("grouped fixture validates");
}

#[test]
fn rejects_room_missing_from_its_suite() {
    let mut snapshot = campus();
    snapshot.suites[0].rooms.retain(|room| room.0 != "N101B");

    let err = snapshot.validate().expect_err("suite must list room");
    assert!(err.to_string().contains("does not list room N101B"));
}

#[test]
fn rejects_suite_listing_another_suites_room() {
    let mut snapshot = campus();
    snapshot.suites[1].rooms.push(room_id("N101A"));

    let err = snapshot.validate().expect_err("room belongs to N-101");
    assert!(matches!(err, RosterError::Inconsistent(_)));
    assert!(err
        .to_string()
        .contains("suite N-102 lists room N101A, which belongs to suite N-101"));
    assert!(crate::draw::ledger::OccupancyLedger::from_snapshot(
        snapshot,
        std::sync::Arc::new(crate::draw::repository::NullStore)
    )
    .is_err());
}

#[test]
fn rejects_one_sided_placements() {
    let mut snapshot = campus();
    snapshot.students[2].room = Some(room_id("A101"));
    assert!(matches!(snapshot.validate(), Err(RosterError::Inconsistent(_))));

    let mut snapshot = campus();
    place(&mut snapshot, "A101", &[3]);
    place(&mut snapshot, "A102", &[3]);
    assert!(
        snapshot.validate().is_err(),
        "a student cannot occupy two rooms"
    );
}

#[test]
fn rejects_overfull_rooms() {
    let mut snapshot = campus();
    place(&mut snapshot, "N102B", &[4, 5]);
    let err = snapshot.validate().expect_err("over capacity");
    assert!(err.to_string().contains("over capacity"));
}

#[test]
fn json_roster_treats_zero_home_dorm_as_none() {
    let raw = r#"{
        "students": [
            {"id": 1, "class_year": "senior", "draw_number": 12, "home_dorm": 0},
            {"id": 2, "class_year": "junior", "draw_number": 3, "home_dorm": 9, "preplaced": true}
        ],
        "rooms": [],
        "suites": []
    }"#;

    let snapshot = RosterSnapshot::from_json_reader(Cursor::new(raw)).expect("parses");
    assert_eq!(snapshot.students[0].home_dorm, None);
    assert_eq!(snapshot.students[1].home_dorm, Some(LINDE));
    assert!(snapshot.students[1].preplaced);
    assert!(snapshot.suite_groups.is_empty());
    assert_eq!(snapshot.snapshot().expect("static provider"), snapshot);
}

#[test]
fn csv_import_reads_registrar_export() {
    let csv = "\
First Name,Last Name,Year,In Dorm,Number,Email,Preplaced
Ada,Lovelace,Senior,North,14,ada@example.edu,
Grace,Hopper,junior,,3,,yes
Alan,Turing,sophomore,linde,27, ,
";

    let students = StudentCsvImporter::from_reader(Cursor::new(csv)).expect("imports");

    assert_eq!(students.len(), 3);
    assert_eq!(students[0].id, StudentId(1));
    assert_eq!(students[0].class_year, ClassYear::Senior);
    assert_eq!(students[0].home_dorm, Some(NORTH));
    assert_eq!(students[0].email.as_deref(), Some("ada@example.edu"));
    assert!(!students[0].notifications_enabled);
    assert_eq!(students[1].home_dorm, None);
    assert!(students[1].preplaced);
    assert_eq!(students[1].email, None);
    assert_eq!(students[2].home_dorm, Some(LINDE));
    assert_eq!(students[2].draw_number, 27);
    assert_eq!(students[2].email, None);
}

#[test]
fn csv_import_honours_explicit_ids() {
    let csv = "Id,First Name,Last Name,Year,In Dorm,Number,Email\n4021,Ada,Lovelace,Senior,,14,\n";
    let students = StudentCsvImporter::from_reader(Cursor::new(csv)).expect("imports");
    assert_eq!(students[0].id, StudentId(4021));
}

#[test]
fn csv_import_rejects_unknown_dorms() {
    let csv = "First Name,Last Name,Year,In Dorm,Number,Email\nAda,Lovelace,Senior,Olin,14,\n";
    let err = StudentCsvImporter::from_reader(Cursor::new(csv)).expect_err("unknown dorm");
    assert!(err.to_string().contains("unknown dorm 'Olin'"));
}

#[test]
fn csv_import_surfaces_bad_numbers() {
    let csv = "First Name,Last Name,Year,In Dorm,Number,Email\nAda,Lovelace,Senior,,first,\n";
    assert!(matches!(
        StudentCsvImporter::from_reader(Cursor::new(csv)),
        Err(RosterError::Csv(_))
    ));
}
