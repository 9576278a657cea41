use serde::{Deserialize, Serialize};

use super::domain::{Room, RoomId, StudentId, SuiteGroupId};

/// What triggered a committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    Assign { room: RoomId },
    SetFrosh { room: RoomId, present: bool },
    RelocateFrosh { from: RoomId, to: RoomId },
}

/// New back reference for a student touched by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPlacement {
    pub student: StudentId,
    pub room: Option<RoomId>,
}

/// Complete after-image of one ledger operation.
///
/// A persistence layer must apply every part of it in one transaction or none of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyChange {
    pub kind: ChangeKind,
    pub rooms: Vec<Room>,
    pub students: Vec<StudentPlacement>,
    pub disbanded_groups: Vec<SuiteGroupId>,
}

impl OccupancyChange {
    pub fn touches_room(&self, room: &RoomId) -> bool {
        self.rooms.iter().any(|candidate| &candidate.id == room)
    }
}

/// Durable storage seam for ledger mutations.
pub trait OccupancyStore: Send + Sync {
    fn commit(&self, change: &OccupancyChange) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("write conflicted with a concurrent transaction")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Store that accepts every change, for callers that only need the in-memory ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl OccupancyStore for NullStore {
    fn commit(&self, _change: &OccupancyChange) -> Result<(), StoreError> {
        Ok(())
    }
}
