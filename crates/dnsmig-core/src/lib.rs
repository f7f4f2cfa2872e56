// # dnsmig-core
//
// Core library for moving domains from a legacy registrar/DNS provider to a
// new DNS provider in re-runnable steps.
//
// ## Architecture Overview
//
// - **SourceProvider**: The provider the domains leave (record source, registrar)
// - **TargetProvider**: The provider the domains move to (zones, records, redirects)
// - **ZoneStore**: Persistent per-domain state shared between step invocations
// - **Prober**: Read-only DNS and HTTPS diagnostics
// - **Confirm**: Interactive gate in front of irreversible actions
// - **Migrator**: Runs the named steps against the ports above
//
// ## Design Principles
//
// 1. **Re-runnable steps**: Every step can be repeated; add-zones never
//    creates a zone twice
// 2. **Keep going**: A provider error for one record or domain is logged and
//    counted, never fatal
// 3. **Library-First**: The binary only wires configuration to the ports

pub mod config;
pub mod error;
pub mod records;
pub mod runner;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{MigrationConfig, RedirectConfig};
pub use error::{Error, Result};
pub use records::{RecordPlan, RecordSpec};
pub use runner::{Migrator, Step, StepReport, VerifyReport};
pub use state::{FileZoneStore, MemoryZoneStore};
pub use traits::{Confirm, Prober, SourceProvider, TargetProvider, ZoneStore};
