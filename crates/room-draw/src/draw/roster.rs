use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{dorm_profile_by_name, ClassYear, Room, Student, StudentId, Suite, SuiteGroup};

/// Point-in-time copy of the housing roster handed to the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub suites: Vec<Suite>,
    #[serde(default)]
    pub suite_groups: Vec<SuiteGroup>,
}

impl RosterSnapshot {
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, RosterError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RosterError> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    /// Replaces the student list, keeping the housing layout.
    pub fn with_students(mut self, students: Vec<Student>) -> Self {
        self.students = students;
        self
    }

    /// Checks the cross references the ledger relies on.
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut student_rooms = HashMap::new();
        for student in &self.students {
            if student_rooms.insert(student.id, student.room.clone()).is_some() {
                return Err(RosterError::Inconsistent(format!(
                    "student {} appears more than once",
                    student.id
                )));
            }
        }

        let suites: HashMap<_, _> = self.suites.iter().map(|suite| (&suite.id, suite)).collect();
        if suites.len() != self.suites.len() {
            return Err(RosterError::Inconsistent("duplicate suite id".to_string()));
        }

        let mut room_suites = HashMap::new();
        let mut placed: HashSet<StudentId> = HashSet::new();
        for room in &self.rooms {
            if room_suites.insert(&room.id, &room.suite).is_some() {
                return Err(RosterError::Inconsistent(format!(
                    "room {} appears more than once",
                    room.id
                )));
            }
            if room.max_occupancy == 0 {
                return Err(RosterError::Inconsistent(format!(
                    "room {} has no capacity",
                    room.id
                )));
            }
            if room.occupants.len() > room.max_occupancy {
                return Err(RosterError::Inconsistent(format!(
                    "room {} is over capacity",
                    room.id
                )));
            }

            let suite = suites.get(&room.suite).ok_or_else(|| {
                RosterError::Inconsistent(format!(
                    "room {} references unknown suite {}",
                    room.id, room.suite
                ))
            })?;
            if !suite.rooms.contains(&room.id) {
                return Err(RosterError::Inconsistent(format!(
                    "suite {} does not list room {}",
                    suite.id, room.id
                )));
            }
            if suite.dorm != room.dorm {
                return Err(RosterError::Inconsistent(format!(
                    "room {} and suite {} disagree on dorm",
                    room.id, suite.id
                )));
            }

            for occupant in &room.occupants {
                if !placed.insert(*occupant) {
                    return Err(RosterError::Inconsistent(format!(
                        "student {occupant} occupies more than one room"
                    )));
                }
                match student_rooms.get(occupant) {
                    Some(Some(back_reference)) if back_reference == &room.id => {}
                    Some(_) => {
                        return Err(RosterError::Inconsistent(format!(
                            "student {occupant} does not reference room {}",
                            room.id
                        )))
                    }
                    None => {
                        return Err(RosterError::Inconsistent(format!(
                            "room {} lists unknown student {occupant}",
                            room.id
                        )))
                    }
                }
            }
        }

        for suite in &self.suites {
            for listed in &suite.rooms {
                match room_suites.get(listed) {
                    Some(owner) if **owner == suite.id => {}
                    Some(owner) => {
                        return Err(RosterError::Inconsistent(format!(
                            "suite {} lists room {listed}, which belongs to suite {owner}",
                            suite.id
                        )))
                    }
                    None => {
                        return Err(RosterError::Inconsistent(format!(
                            "suite {} lists unknown room {listed}",
                            suite.id
                        )))
                    }
                }
            }
        }

        for student in &self.students {
            if student.room.is_some() && !placed.contains(&student.id) {
                return Err(RosterError::Inconsistent(format!(
                    "student {} references a room that does not list them",
                    student.id
                )));
            }
        }

        Ok(())
    }
}

/// Source of roster snapshots (database export, fixture file, and so on).
pub trait RosterProvider: Send + Sync {
    fn snapshot(&self) -> Result<RosterSnapshot, RosterError>;
}

impl RosterProvider for RosterSnapshot {
    fn snapshot(&self) -> Result<RosterSnapshot, RosterError> {
        Ok(self.clone())
    }
}

/// Housing layout stored as JSON, optionally with students from a separate CSV export.
#[derive(Debug, Clone)]
pub struct RosterFiles {
    pub layout: PathBuf,
    pub students_csv: Option<PathBuf>,
}

impl RosterProvider for RosterFiles {
    fn snapshot(&self) -> Result<RosterSnapshot, RosterError> {
        let snapshot = RosterSnapshot::from_path(&self.layout)?;
        let snapshot = match &self.students_csv {
            Some(path) => snapshot.with_students(StudentCsvImporter::from_path(path)?),
            None => snapshot,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Reads the registrar's draw-number export.
///
/// Expected headers: `Id` (optional, defaults to the row number), `First Name`,
/// `Last Name`, `Year`, `In Dorm` (dorm name or blank), `Number`, `Email`, and an
/// optional `Preplaced` column.
pub struct StudentCsvImporter;

impl StudentCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Student>, RosterError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Student>, RosterError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut students = Vec::new();

        for (index, record) in csv_reader.deserialize::<StudentRow>().enumerate() {
            let row = record?;
            let row_number = u32::try_from(index + 1).map_err(|_| {
                RosterError::Inconsistent("student export has too many rows".to_string())
            })?;
            students.push(row.into_student(row_number)?);
        }

        Ok(students)
    }
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    #[serde(rename = "Id", default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    #[serde(rename = "First Name", default)]
    first_name: String,
    #[serde(rename = "Last Name", default)]
    last_name: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "In Dorm", default, deserialize_with = "empty_string_as_none")]
    in_dorm: Option<String>,
    #[serde(rename = "Number")]
    number: u32,
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(rename = "Preplaced", default, deserialize_with = "empty_string_as_none")]
    preplaced: Option<String>,
}

impl StudentRow {
    fn into_student(self, row_number: u32) -> Result<Student, RosterError> {
        let id = match self.id.as_deref() {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                RosterError::Inconsistent(format!("row {row_number}: invalid student id '{raw}'"))
            })?,
            None => row_number,
        };

        let home_dorm = match self.in_dorm.as_deref() {
            Some(name) => Some(
                dorm_profile_by_name(name)
                    .map(|profile| profile.id)
                    .ok_or_else(|| {
                        RosterError::Inconsistent(format!("row {row_number}: unknown dorm '{name}'"))
                    })?,
            ),
            None => None,
        };

        let preplaced = matches!(
            self.preplaced.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "yes" | "1" | "y")
        );

        let mut student = Student::new(id, ClassYear::parse(&self.year), self.number);
        student.first_name = self.first_name;
        student.last_name = self.last_name;
        student.home_dorm = home_dorm;
        student.preplaced = preplaced;
        student.email = self.email;
        Ok(student)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug)]
pub enum RosterError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Inconsistent(String),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::Io(err) => write!(f, "failed to read roster: {}", err),
            RosterError::Csv(err) => write!(f, "invalid student CSV data: {}", err),
            RosterError::Json(err) => write!(f, "invalid roster JSON: {}", err),
            RosterError::Inconsistent(reason) => write!(f, "inconsistent roster: {}", reason),
        }
    }
}

impl std::error::Error for RosterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterError::Io(err) => Some(err),
            RosterError::Csv(err) => Some(err),
            RosterError::Json(err) => Some(err),
            RosterError::Inconsistent(_) => None,
        }
    }
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
