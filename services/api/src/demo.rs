use crate::infra::build_runtime;
use clap::Args;
use room_draw::config::DEFAULT_NOTIFY_SENDER;
use room_draw::draw::{
    rank, ClassYear, DormId, Room, RoomId, RosterFiles, RosterProvider, RosterSnapshot, Student,
    StudentId, Suite,
};
use room_draw::error::AppError;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// JSON roster with rooms, suites, and optionally students
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Registrar CSV export replacing the roster's students
    #[arg(long)]
    pub(crate) students: Option<PathBuf>,
    /// Dorm id to rank for (1-4 East/North/South/West, 5 Atwood, 6 Sontag, 7 Case, 8 Drinkward, 9 Linde)
    #[arg(long)]
    pub(crate) dorm: u8,
    /// Only print the first N students
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Skip students who already hold a room
    #[arg(long)]
    pub(crate) unplaced: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Dorm to rank in the first step (defaults to East).
    #[arg(long)]
    pub(crate) dorm: Option<u8>,
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        roster,
        students,
        dorm,
        limit,
        unplaced,
    } = args;

    let snapshot = RosterFiles {
        layout: roster,
        students_csv: students,
    }
    .snapshot()?;

    let dorm = DormId(dorm);
    let candidates: Vec<Student> = snapshot
        .students
        .into_iter()
        .filter(|student| !unplaced || student.room.is_none())
        .collect();

    println!("Draw order for {} ({} students)", dorm.name(), candidates.len());
    print_ranking(&candidates, dorm, limit.unwrap_or(usize::MAX));
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let dorm = DormId(args.dorm.unwrap_or(1));
    let runtime = build_runtime(demo_campus(), DEFAULT_NOTIFY_SENDER)?;
    let service = &runtime.service;

    println!("Room draw demo");
    println!("\n1. Draw order for {}", dorm.name());
    let students = service.ledger().students();
    print_ranking(&students, dorm, usize::MAX);

    let east_double = RoomId::new("E101");
    println!("\n2. Jordan and Priya pull {east_double}");
    let receipt = service.assign(&east_double, &[StudentId(3), StudentId(4)], None)?;
    println!("   occupants now {:?}", ids(&receipt.room.occupants));

    println!("\n3. Avery (returning East senior) pulls {east_double} with Sam");
    let receipt = service.assign(&east_double, &[StudentId(1), StudentId(2)], Some(StudentId(1)))?;
    println!("   occupants now {:?}", ids(&receipt.room.occupants));
    for entry in &receipt.notifications {
        println!(
            "   bumped student {} -> notification {:?}",
            entry.student_id, entry.disposition
        );
    }

    let frosh_room = RoomId::new("E102");
    println!("\n4. Housing marks {frosh_room} for frosh");
    match service.set_frosh(&frosh_room, true) {
        Ok(outcome) => println!("   {} room flag(s) set", outcome.changes.len()),
        Err(err) => println!("   rejected: {err} ({})", err.code()),
    }

    let empty_suite_room = RoomId::new("E201");
    println!("\n5. Housing marks {empty_suite_room} for frosh");
    let outcome = service.set_frosh(&empty_suite_room, true)?;
    for change in &outcome.changes {
        println!("   {} has_frosh={}", change.room, change.has_frosh);
    }

    println!("\nJournal: {} committed change(s)", runtime.journal.entries().len());
    for message in runtime.outbox.messages() {
        println!("Outbox: to {} | {}", message.to, message.subject);
    }

    Ok(())
}

fn ids(students: &[StudentId]) -> Vec<u32> {
    students.iter().map(|id| id.0).collect()
}

fn print_ranking(students: &[Student], dorm: DormId, limit: usize) {
    for (position, entry) in rank(students, dorm).iter().take(limit).enumerate() {
        let Some(student) = students.iter().find(|s| s.id == entry.student_id) else {
            continue;
        };
        let marker = if entry.priority.is_preplaced {
            "preplaced".to_string()
        } else {
            format!(
                "tier {} #{}",
                entry.priority.year_tier, entry.priority.draw_number
            )
        };
        println!(
            "  {:>3}. {:<20} {:<10} {}",
            position + 1,
            format!("{} {}", student.first_name, student.last_name),
            student.class_year.label(),
            marker
        );
    }
}

/// Sample campus: two East suites, a Case suite, and a Linde suite.
pub(crate) fn demo_campus() -> RosterSnapshot {
    const EAST: DormId = DormId(1);
    const CASE: DormId = DormId(7);
    const LINDE: DormId = DormId(9);

    let person = |id: u32, first: &str, last: &str, year: ClassYear, number: u32| {
        let mut student = Student::new(id, year, number);
        student.first_name = first.to_string();
        student.last_name = last.to_string();
        student.email = Some(format!("{}@students.example.edu", first.to_ascii_lowercase()));
        student.notifications_enabled = true;
        student
    };

    let mut avery = person(1, "Avery", "Cole", ClassYear::Senior, 48);
    avery.home_dorm = Some(EAST);
    let sam = person(2, "Sam", "Ortiz", ClassYear::Senior, 12);
    let jordan = person(3, "Jordan", "Reyes", ClassYear::Junior, 7);
    let mut priya = person(4, "Priya", "Nair", ClassYear::Junior, 19);
    priya.notifications_enabled = false;
    let mut lee = person(5, "Lee", "Zhang", ClassYear::Sophomore, 3);
    lee.email = None;
    let mut morgan = person(6, "Morgan", "Blake", ClassYear::Sophomore, 31);
    morgan.preplaced = true;

    let room = |id: &str, dorm: DormId, suite: &str, max: usize, label: &str| {
        let mut room = Room::new(id, dorm, suite, max);
        room.label = label.to_string();
        room.frosh_room_type = Some(if max == 1 { 1 } else { 2 });
        room
    };

    RosterSnapshot {
        students: vec![avery, sam, jordan, priya, lee, morgan],
        rooms: vec![
            room("E101", EAST, "E-10", 2, "101"),
            room("E102", EAST, "E-10", 1, "102"),
            room("E201", EAST, "E-20", 2, "201"),
            room("E202", EAST, "E-20", 2, "202"),
            room("C101", CASE, "C-10", 2, "101"),
            room("L301", LINDE, "L-30", 1, "301"),
            room("L302", LINDE, "L-30", 1, "302"),
        ],
        suites: vec![
            Suite::new("E-10", EAST, &["E101", "E102"]),
            Suite::new("E-20", EAST, &["E201", "E202"]),
            Suite::new("C-10", CASE, &["C101"]),
            Suite::new("L-30", LINDE, &["L301", "L302"]),
        ],
        suite_groups: Vec::new(),
    }
}
