//! Fleet records and the upcoming-renewal derivation engine.

pub mod compliance;
pub mod domain;
pub mod repository;
pub mod service;

pub use compliance::{
    classify, upcoming_report, KindVerdict, RenewalStatus, UpcomingRenewal,
    DEFAULT_LOOKAHEAD_DAYS, MAX_LOOKAHEAD_DAYS, MIN_LOOKAHEAD_DAYS,
};
pub use domain::{
    Car, CarDraft, CarId, CarPatch, RenewalDraft, RenewalId, RenewalKind, RenewalPatch,
    RenewalRecord,
};
pub use repository::FleetRepository;
pub use service::{FleetService, FleetServiceError};
