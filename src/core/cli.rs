use clap::Parser;

use crate::types::BuildScope;
use crate::types::config::RevertStrategy;

/// Finds implementation files a solution compiles but never needs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The .sln (or single .vcxproj) to process
    #[arg(value_name = "SOLUTION")]
    pub solution: String,

    /// All relative paths will be interpreted relative to this directory.
    #[arg(long)]
    pub cwd: Option<String>,

    /// Logging level (overrides config). One of: trace, debug, info, warn, error
    #[arg(long = "log.level")]
    pub log_level: Option<String>,

    /// Logging color control: "on" to force colors, "off" to disable; omit for auto
    #[arg(long = "log.color")]
    pub log_color: Option<String>,

    /// Build command template. Replaces config [build].cmd if provided.
    #[arg(long = "build.cmd")]
    pub build_cmd: Option<String>,

    /// Build timeout in seconds. Replaces config [build].timeout if provided.
    #[arg(long = "build.timeout")]
    pub build_timeout: Option<u32>,

    /// Build the whole solution or only the project being processed
    #[arg(long = "build.scope")]
    pub build_scope: Option<BuildScope>,

    /// How project directories are restored: git, svn or snapshot
    #[arg(long)]
    pub revert: Option<RevertStrategy>,

    /// Directory under which the timestamped results directory is created
    #[arg(long = "results-dir")]
    pub results_dir: Option<String>,
}
