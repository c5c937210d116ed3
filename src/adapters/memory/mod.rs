//! In-memory store implementations for dry runs and tests

pub mod legacy;
pub mod target;

pub use legacy::MemoryLegacyStore;
pub use target::MemoryTargetStore;
