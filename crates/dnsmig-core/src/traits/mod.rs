//! Core traits for the migration runner
//!
//! This module defines the ports the runner talks through.
//!
//! - [`TargetProvider`]: The DNS provider domains move to
//! - [`SourceProvider`]: The registrar/DNS provider domains leave
//! - [`ZoneStore`]: Persistent per-domain state between steps
//! - [`Prober`]: Read-only DNS and HTTPS diagnostics
//! - [`Confirm`]: Interactive confirmation gate

pub mod confirm;
pub mod prober;
pub mod source_provider;
pub mod target_provider;
pub mod zone_store;

pub use confirm::{AlwaysConfirm, Confirm};
pub use prober::{MailExchanger, ProbeOutcome, Prober};
pub use source_provider::{SourceProvider, SourceRecord};
pub use target_provider::{RedirectRule, TargetProvider, TargetRecord, Zone};
pub use zone_store::{PendingRedirect, ZoneRecord, ZoneStore};
