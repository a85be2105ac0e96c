pub mod cli;
pub mod engine;
pub mod logging;
pub mod main_shared;
pub mod mutator;
pub mod oracle;
pub mod report;
pub mod revert;
pub mod solution;
pub mod types;
pub mod vcxproj;
