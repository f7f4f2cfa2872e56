// # Zone Store Implementations
//
// This module provides implementations of the ZoneStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileZoneStore;
pub use memory::MemoryZoneStore;
