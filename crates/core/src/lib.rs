//! Core types and the coordination registry for claimd.
//!
//! claimd lets cooperating AI coding agents claim mutual-exclusion locks on
//! named resources (files, directories, processes) without stepping on each
//! other: one owner at a time, a FIFO wait queue per resource, and
//! TTL-driven expiry so a crashed agent doesn't hold a resource forever.
//!
//! This crate has no knowledge of HTTP, sockets, or any wire format — that
//! lives in the `claimd-daemon` crate, which wraps [`Registry`] in a request
//! surface. Everything here is synchronous and in-process.

pub mod agent;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod registry;
pub mod work_unit;

pub use agent::{Agent, AgentKind};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::Config;
pub use error::RegistryError;
pub use events::{ChangeEvent, ChangeSink};
pub use registry::{Registry, StateSnapshot};
pub use work_unit::{ClaimResult, QueueEntry, QueueEntryView, ResourceKind, WorkUnit, WorkUnitStatus};
