use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::{ClassYear, DormId, Student};

/// Tier granted to a senior drawing back into the dorm they already live in.
pub const HOME_DORM_SENIOR_TIER: u8 = 5;
const LOCK_PULL_TIER: u8 = 6;

/// How a room was claimed. Only `LockPull` changes the effective tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullType {
    #[default]
    Unspecified,
    SelfPull,
    NormalPull,
    LockPull,
    AlternativePull,
}

/// Priority borrowed from another member of a suite group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InheritedPriority {
    pub has_home_dorm: bool,
    pub draw_number: u32,
    pub year_tier: u8,
}

/// A student's standing in one dorm's draw. Recomputed for every ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullPriority {
    pub is_preplaced: bool,
    pub has_home_dorm: bool,
    pub draw_number: u32,
    pub year_tier: u8,
    #[serde(default)]
    pub inherited: Option<InheritedPriority>,
    #[serde(default)]
    pub pull_type: PullType,
}

impl PullPriority {
    pub fn preplaced() -> Self {
        Self {
            is_preplaced: true,
            has_home_dorm: false,
            draw_number: 0,
            year_tier: 0,
            inherited: None,
            pull_type: PullType::Unspecified,
        }
    }

    pub fn with_pull_type(mut self, pull_type: PullType) -> Self {
        self.pull_type = pull_type;
        self
    }

    pub fn inheriting(mut self, inherited: InheritedPriority) -> Self {
        self.inherited = Some(inherited);
        self
    }

    /// Tier and draw number actually used for comparison.
    pub fn effective(&self) -> (u8, u32) {
        let (mut tier, draw_number) = match self.inherited {
            Some(inherited) => {
                let tier = if inherited.has_home_dorm && inherited.year_tier == 4 {
                    HOME_DORM_SENIOR_TIER
                } else {
                    inherited.year_tier
                };
                (tier, inherited.draw_number)
            }
            None => (self.year_tier, self.draw_number),
        };

        if self.pull_type == PullType::LockPull {
            tier = LOCK_PULL_TIER;
        }

        (tier, draw_number)
    }
}

/// Outcome of comparing two priorities from the first one's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityOrdering {
    Higher,
    Lower,
    Equal,
}

impl PriorityOrdering {
    /// `Greater` means higher priority.
    pub fn as_ordering(self) -> Ordering {
        match self {
            Self::Higher => Ordering::Greater,
            Self::Lower => Ordering::Less,
            Self::Equal => Ordering::Equal,
        }
    }
}

impl From<Ordering> for PriorityOrdering {
    fn from(value: Ordering) -> Self {
        match value {
            Ordering::Greater => Self::Higher,
            Ordering::Less => Self::Lower,
            Ordering::Equal => Self::Equal,
        }
    }
}

pub fn year_tier(class_year: ClassYear) -> u8 {
    match class_year {
        ClassYear::Sophomore => 2,
        ClassYear::Junior => 3,
        ClassYear::Senior => 4,
        ClassYear::Freshman | ClassYear::Other => 0,
    }
}

pub fn compute_priority(student: &Student, dorm: DormId) -> PullPriority {
    if student.preplaced {
        return PullPriority::preplaced();
    }

    let has_home_dorm = student.lives_in(dorm);
    let mut tier = year_tier(student.class_year);
    if student.class_year == ClassYear::Senior && has_home_dorm {
        tier = HOME_DORM_SENIOR_TIER;
    }

    PullPriority {
        is_preplaced: false,
        has_home_dorm,
        draw_number: student.draw_number,
        year_tier: tier,
        inherited: None,
        pull_type: PullType::Unspecified,
    }
}

pub fn compare_priority(a: &PullPriority, b: &PullPriority) -> PriorityOrdering {
    match (a.is_preplaced, b.is_preplaced) {
        (true, false) => return PriorityOrdering::Higher,
        (false, true) => return PriorityOrdering::Lower,
        _ => {}
    }

    let (a_tier, a_draw) = a.effective();
    let (b_tier, b_draw) = b.effective();

    a_tier
        .cmp(&b_tier)
        .then_with(|| b_draw.cmp(&a_draw))
        .into()
}
