//! Room draw core: priority ranking, the occupancy ledger, frosh flags, and bump notifications.

pub mod domain;
pub mod frosh;
pub mod ledger;
pub mod notifications;
pub mod priority;
pub mod ranker;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    dorm_profile, dorm_profile_by_name, ClassYear, DormId, DormProfile, FroshPolicy, Room, RoomId,
    Student, StudentId, Suite, SuiteGroup, SuiteGroupId, SuiteId,
};
pub use frosh::{FroshChange, FroshConsistencyRule, FroshPlan};
pub use ledger::{
    AssignmentOutcome, FroshOutcome, LedgerEntity, LedgerError, OccupancyLedger, StudentMove,
};
pub use notifications::{
    Bump, BumpDisposition, BumpNotification, BumpNotificationTrigger, LoggingDispatcher,
    NotificationDispatcher, NotificationError, NotificationPreference, NotificationPreferences,
    RosterPreferences,
};
pub use priority::{
    compare_priority, compute_priority, InheritedPriority, PriorityOrdering, PullPriority, PullType,
};
pub use ranker::{rank, rank_students, RankedStudent};
pub use repository::{
    ChangeKind, NullStore, OccupancyChange, OccupancyStore, StoreError, StudentPlacement,
};
pub use roster::{RosterError, RosterFiles, RosterProvider, RosterSnapshot, StudentCsvImporter};
pub use router::draw_router;
pub use service::{
    AssignmentReceipt, BumpReceipt, RankingEntry, RankingView, RoomDrawService, RoomView,
};
