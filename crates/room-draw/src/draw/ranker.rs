use std::collections::HashMap;

use serde::Serialize;

use super::domain::{DormId, Student, StudentId};
use super::priority::{compare_priority, compute_priority, PullPriority};

/// A student's position in a dorm's draw order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedStudent {
    pub student_id: StudentId,
    pub priority: PullPriority,
}

/// Orders students from highest to lowest priority for `dorm`.
///
/// Students with identical priority fall back to ascending id so the order is
/// total and does not depend on how the roster was handed in.
pub fn rank(students: &[Student], dorm: DormId) -> Vec<RankedStudent> {
    let mut ranked: Vec<RankedStudent> = students
        .iter()
        .map(|student| RankedStudent {
            student_id: student.id,
            priority: compute_priority(student, dorm),
        })
        .collect();

    ranked.sort_by(|a, b| {
        compare_priority(&b.priority, &a.priority)
            .as_ordering()
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    ranked
}

/// Same order as [`rank`], yielding the roster entries themselves.
pub fn rank_students(students: &[Student], dorm: DormId) -> Vec<&Student> {
    let by_id: HashMap<StudentId, &Student> =
        students.iter().map(|student| (student.id, student)).collect();

    rank(students, dorm)
        .iter()
        .filter_map(|entry| by_id.get(&entry.student_id).copied())
        .collect()
}
