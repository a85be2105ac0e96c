pub mod config;
mod error;
mod hash;
mod outcome;
mod project;
mod stats;
mod verdict;

pub use error::*;
pub use hash::*;
pub use outcome::*;
pub use project::*;
pub use stats::*;
pub use verdict::*;
