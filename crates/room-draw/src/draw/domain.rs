use std::fmt;

use serde::{Deserialize, Serialize};

use super::priority::PullPriority;

/// Roster identifier for a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u32);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for rooms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for suites. Ordering doubles as the lock acquisition order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteId(pub String);

impl SuiteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteGroupId(pub String);

impl fmt::Display for SuiteGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric dorm identifier as assigned by housing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DormId(pub u8);

impl DormId {
    /// Inner dorms treat frosh occupancy as a suite-wide property.
    pub fn is_inner(self) -> bool {
        (1..=4).contains(&self.0)
    }

    pub fn name(self) -> String {
        match dorm_profile(self) {
            Some(profile) => profile.name.to_string(),
            None => format!("Dorm {}", self.0),
        }
    }

    pub fn frosh_policy(self) -> FroshPolicy {
        dorm_profile(self)
            .map(|profile| profile.frosh_policy)
            .unwrap_or(FroshPolicy::PerRoom)
    }
}

impl fmt::Display for DormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How frosh occupancy flags behave inside a dorm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FroshPolicy {
    /// Every room in a suite shares one flag.
    SuiteWide,
    /// Flags are per room but a suite may host frosh in only one room.
    SuiteExclusive,
    PerRoom,
}

/// Static catalog entry for a known dorm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DormProfile {
    pub id: DormId,
    pub name: &'static str,
    pub frosh_policy: FroshPolicy,
}

const DORM_CATALOG: [DormProfile; 9] = [
    DormProfile {
        id: DormId(1),
        name: "East",
        frosh_policy: FroshPolicy::SuiteWide,
    },
    DormProfile {
        id: DormId(2),
        name: "North",
        frosh_policy: FroshPolicy::SuiteWide,
    },
    DormProfile {
        id: DormId(3),
        name: "South",
        frosh_policy: FroshPolicy::SuiteWide,
    },
    DormProfile {
        id: DormId(4),
        name: "West",
        frosh_policy: FroshPolicy::SuiteWide,
    },
    DormProfile {
        id: DormId(5),
        name: "Atwood",
        frosh_policy: FroshPolicy::PerRoom,
    },
    DormProfile {
        id: DormId(6),
        name: "Sontag",
        frosh_policy: FroshPolicy::PerRoom,
    },
    DormProfile {
        id: DormId(7),
        name: "Case",
        frosh_policy: FroshPolicy::PerRoom,
    },
    DormProfile {
        id: DormId(8),
        name: "Drinkward",
        frosh_policy: FroshPolicy::PerRoom,
    },
    DormProfile {
        id: DormId(9),
        name: "Linde",
        frosh_policy: FroshPolicy::SuiteExclusive,
    },
];

pub fn dorm_profile(id: DormId) -> Option<&'static DormProfile> {
    DORM_CATALOG.iter().find(|profile| profile.id == id)
}

pub fn dorm_profile_by_name(name: &str) -> Option<&'static DormProfile> {
    let name = name.trim();
    DORM_CATALOG
        .iter()
        .find(|profile| profile.name.eq_ignore_ascii_case(name))
}

/// Class standing used to derive the year tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassYear {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    Other,
}

impl ClassYear {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "freshman" | "frosh" => Self::Freshman,
            "sophomore" => Self::Sophomore,
            "junior" => Self::Junior,
            "senior" => Self::Senior,
            _ => Self::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Freshman => "freshman",
            Self::Sophomore => "sophomore",
            Self::Junior => "junior",
            Self::Senior => "senior",
            Self::Other => "other",
        }
    }
}

/// Roster entry for a student participating in the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub class_year: ClassYear,
    #[serde(default)]
    pub preplaced: bool,
    /// Dorm the student currently lives in; `None` when not continuing.
    #[serde(default, deserialize_with = "zero_dorm_as_none")]
    pub home_dorm: Option<DormId>,
    pub draw_number: u32,
    #[serde(default)]
    pub room: Option<RoomId>,
    #[serde(default)]
    pub suite_group: Option<SuiteGroupId>,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Student {
    pub fn new(id: u32, class_year: ClassYear, draw_number: u32) -> Self {
        Self {
            id: StudentId(id),
            class_year,
            preplaced: false,
            home_dorm: None,
            draw_number,
            room: None,
            suite_group: None,
            notifications_enabled: false,
            email: None,
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    pub fn lives_in(&self, dorm: DormId) -> bool {
        self.home_dorm == Some(dorm)
    }
}

fn zero_dorm_as_none<'de, D>(deserializer: D) -> Result<Option<DormId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<u8>::deserialize(deserializer)?;
    Ok(raw.filter(|value| *value != 0).map(DormId))
}

/// A room and its current occupants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub dorm: DormId,
    pub suite: SuiteId,
    pub label: String,
    pub max_occupancy: usize,
    #[serde(default)]
    pub occupants: Vec<StudentId>,
    /// Priority that claimed the room, kept for display.
    #[serde(default)]
    pub priority: Option<PullPriority>,
    #[serde(default)]
    pub has_frosh: bool,
    #[serde(default)]
    pub frosh_room_type: Option<u8>,
    #[serde(default)]
    pub suite_group: Option<SuiteGroupId>,
}

impl Room {
    pub fn new(id: &str, dorm: DormId, suite: &str, max_occupancy: usize) -> Self {
        Self {
            id: RoomId::new(id),
            dorm,
            suite: SuiteId::new(suite),
            label: id.to_string(),
            max_occupancy,
            occupants: Vec::new(),
            priority: None,
            has_frosh: false,
            frosh_room_type: None,
            suite_group: None,
        }
    }

    pub fn current_occupancy(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn holds(&self, student: StudentId) -> bool {
        self.occupants.contains(&student)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub id: SuiteId,
    pub dorm: DormId,
    #[serde(default)]
    pub floor: i32,
    pub rooms: Vec<RoomId>,
    #[serde(default)]
    pub alternative_pull: bool,
    #[serde(default)]
    pub design: String,
    /// Resident-life room hosted by the suite, if any.
    #[serde(default)]
    pub reslife_room: Option<RoomId>,
}

impl Suite {
    pub fn new(id: &str, dorm: DormId, rooms: &[&str]) -> Self {
        Self {
            id: SuiteId::new(id),
            dorm,
            floor: 1,
            rooms: rooms.iter().map(|room| RoomId::new(*room)).collect(),
            alternative_pull: false,
            design: String::new(),
            reslife_room: None,
        }
    }
}

/// Students who agreed to draw into a suite together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteGroup {
    pub id: SuiteGroupId,
    pub size: usize,
    #[serde(default)]
    pub priority_tier: String,
    #[serde(default)]
    pub suite: Option<SuiteId>,
    #[serde(default)]
    pub rooms: Vec<RoomId>,
    #[serde(default)]
    pub disbanded: bool,
}
