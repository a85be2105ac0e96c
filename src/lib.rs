pub mod core;

// Re-export key items for easy importing in this crate
pub use core::types;

// Re-export key items for easy importing in other crates
pub use core::engine::perturbation::{EngineOptions, PerturbationEngine};
pub use core::engine::traits::{BuildOracle, ReferenceMutator, WorkspaceReverter};
pub use core::main_shared::run_main;
pub use core::report::{LogReporter, ProgressReporter, ResultWriter};
