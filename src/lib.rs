// Library exports for testing and potential library use
//
// # Locking
//
// All settings read-modify-write paths go through
// `NotificationCoordinator`, which serializes them with one
// `parking_lot::Mutex<()>`. Nothing else holds a lock across a scan.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod cli;
pub mod coordinator;
pub mod debug;
pub mod mail;
pub mod report;
pub mod schedule;
pub mod trigger;

pub use coordinator::{
    AutoUpdateEmail, CheckOutcome, MailStatus, NotificationCoordinator, OnDemandOutcome,
};
pub use mail::{LogMailer, MailError, MailTransport, OutgoingMail, SmtpMailer};
pub use report::{DocumentReport, ReportRenderer};
pub use schedule::{
    Interval, LocalScheduler, ScheduleController, ScheduleError, ScheduleState, TriggerScheduler,
};
