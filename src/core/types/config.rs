use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::warn;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::BuildScope;

pub const CONFIG_FILENAME: &str = "maggot.toml";
pub const DEFAULT_BUILD_CMD: &str = "msbuild /p:Configuration=Debug /m \"{target}\"";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogConfig {
    pub level: Option<String>,
    pub color: Option<bool>, // None = auto-detect (semantic)
}

impl LogConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn color(&self) -> Option<bool> {
        self.color
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BuildConfig {
    pub cmd: Option<String>,
    pub timeout: Option<u32>,
    pub scope: Option<BuildScope>,
}

impl BuildConfig {
    pub fn cmd(&self) -> &str {
        self.cmd.as_deref().unwrap_or(DEFAULT_BUILD_CMD)
    }

    pub fn timeout(&self) -> Option<u32> {
        self.timeout
    }

    pub fn scope(&self) -> BuildScope {
        self.scope.unwrap_or_default()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RevertStrategy {
    #[default]
    Git,
    Svn,
    Snapshot,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RevertConfig {
    pub strategy: Option<RevertStrategy>,
    /// Where the snapshot strategy keeps pristine copies; defaults inside the
    /// results directory.
    pub snapshot_dir: Option<String>,
}

impl RevertConfig {
    pub fn strategy(&self) -> RevertStrategy {
        self.strategy.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MutationConfig {
    /// Treat a reference that cannot be found in the project file as an error.
    pub strict_match: Option<bool>,
}

impl MutationConfig {
    pub fn strict_match(&self) -> bool {
        self.strict_match.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    // Top-level fields
    pub results_dir: Option<String>,
    pub ignore_projects: Option<Vec<String>>,

    // Nested sections
    pub log: Option<LogConfig>,
    pub build: Option<BuildConfig>,
    pub revert: Option<RevertConfig>,
    pub mutation: Option<MutationConfig>,
}

impl Config {
    pub fn results_dir(&self) -> &str {
        self.results_dir.as_deref().unwrap_or(".")
    }

    pub fn ignore_projects(&self) -> &[String] {
        self.ignore_projects.as_deref().unwrap_or(&[])
    }

    pub fn log(&self) -> LogConfig {
        self.log.clone().unwrap_or_default()
    }

    pub fn build(&self) -> BuildConfig {
        self.build.clone().unwrap_or_default()
    }

    pub fn revert(&self) -> RevertConfig {
        self.revert.clone().unwrap_or_default()
    }

    pub fn mutation(&self) -> MutationConfig {
        self.mutation.clone().unwrap_or_default()
    }

    /// Compiles `ignore_projects` into a matcher; invalid globs are skipped.
    pub fn ignore_matcher(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in self.ignore_projects() {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid project glob '{pattern}': {e}"),
            }
        }
        builder.build().unwrap_or_else(|_| GlobSet::empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub log_color: Option<String>, // "on" | "off"
    pub build_cmd: Option<String>,
    pub build_timeout: Option<u32>,
    pub build_scope: Option<BuildScope>,
    pub revert: Option<RevertStrategy>,
    pub results_dir: Option<String>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| load_config(&CliOverrides::default()))
}

pub fn init_with_overrides(overrides: &CliOverrides) {
    let _ = CONFIG.set(load_config(overrides));
}

/// Layers, lowest priority first: user config dir, nearest `maggot.toml`
/// walking up from cwd, CLI arguments.
pub fn load_config(overrides: &CliOverrides) -> Config {
    let mut cfg = Config::default();

    if let Some(path) = user_config_file()
        && let Some(file_cfg) = read_config_file(&path)
    {
        apply_file_config(&mut cfg, &file_cfg);
    }

    if let Some(path) = find_nearest_config_file()
        && let Some(file_cfg) = read_config_file(&path)
    {
        apply_file_config(&mut cfg, &file_cfg);
    }

    apply_cli_overrides(&mut cfg, overrides);
    cfg
}

pub fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(contents)
}

fn read_config_file(path: &Path) -> Option<Config> {
    let contents = fs::read_to_string(path).ok()?;
    match parse_config(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // The logger is not installed yet at this point.
            eprintln!("Ignoring malformed config {}: {e}", path.display());
            None
        }
    }
}

pub fn apply_file_config(cfg: &mut Config, file: &Config) {
    if file.results_dir.is_some() {
        cfg.results_dir = file.results_dir.clone();
    }
    if let Some(patterns) = &file.ignore_projects {
        cfg.ignore_projects = Some(
            cfg.ignore_projects()
                .iter()
                .chain(patterns.iter())
                .cloned()
                .collect(),
        );
    }

    if let Some(file_log) = &file.log {
        let mut log = cfg.log();
        if file_log.level.is_some() {
            log.level = file_log.level.clone();
        }
        if file_log.color.is_some() {
            log.color = file_log.color;
        }
        cfg.log = Some(log);
    }

    if let Some(file_build) = &file.build {
        let mut build = cfg.build();
        if file_build.cmd.as_ref().is_some_and(|c| !c.trim().is_empty()) {
            build.cmd = file_build.cmd.clone();
        }
        if file_build.timeout.is_some() {
            build.timeout = file_build.timeout;
        }
        if file_build.scope.is_some() {
            build.scope = file_build.scope;
        }
        cfg.build = Some(build);
    }

    if let Some(file_revert) = &file.revert {
        let mut revert = cfg.revert();
        if file_revert.strategy.is_some() {
            revert.strategy = file_revert.strategy;
        }
        if file_revert.snapshot_dir.is_some() {
            revert.snapshot_dir = file_revert.snapshot_dir.clone();
        }
        cfg.revert = Some(revert);
    }

    if let Some(file_mutation) = &file.mutation
        && file_mutation.strict_match.is_some()
    {
        cfg.mutation = Some(file_mutation.clone());
    }
}

pub fn apply_cli_overrides(cfg: &mut Config, overrides: &CliOverrides) {
    if overrides.results_dir.is_some() {
        cfg.results_dir = overrides.results_dir.clone();
    }

    // Log overrides
    let mut log = cfg.log();
    if let Some(level) = &overrides.log_level
        && !level.trim().is_empty()
    {
        log.level = Some(level.trim().to_string());
    }
    if let Some(color_str) = &overrides.log_color {
        match color_str.to_lowercase().as_str() {
            "on" => log.color = Some(true),
            "off" => log.color = Some(false),
            _ => {}
        }
    }
    if overrides.log_level.is_some() || overrides.log_color.is_some() {
        cfg.log = Some(log);
    }

    // Build overrides
    let mut build = cfg.build();
    if let Some(cmd) = &overrides.build_cmd
        && !cmd.trim().is_empty()
    {
        build.cmd = Some(cmd.clone());
    }
    if overrides.build_timeout.is_some() {
        build.timeout = overrides.build_timeout;
    }
    if overrides.build_scope.is_some() {
        build.scope = overrides.build_scope;
    }
    if overrides.build_cmd.is_some()
        || overrides.build_timeout.is_some()
        || overrides.build_scope.is_some()
    {
        cfg.build = Some(build);
    }

    if let Some(strategy) = overrides.revert {
        let mut revert = cfg.revert();
        revert.strategy = Some(strategy);
        cfg.revert = Some(revert);
    }
}

fn find_nearest_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    for dir in cwd.ancestors() {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn user_config_file() -> Option<PathBuf> {
    let candidate = dirs_next::config_dir()?.join("maggot").join(CONFIG_FILENAME);
    candidate.exists().then_some(candidate)
}

pub fn colors_enabled() -> bool {
    match config().log().color() {
        Some(force) => force,
        None => console::colors_enabled(),
    }
}
