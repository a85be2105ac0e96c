use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::core::engine::traits::BuildOracle;
use crate::types::{BuildOutcome, BuildTarget, BuildVerdict};

/// Builds by running a shell command and trusting its exit status.
///
/// The command is a template; `{target}`, `{solution}`, `{project}`,
/// `{project_name}` and `{log}` are substituted before each invocation.
pub struct CommandBuildOracle {
    cmd: String,
    timeout: Option<u32>,
    log_dir: PathBuf,
}

impl CommandBuildOracle {
    pub fn new(cmd: impl Into<String>, timeout: Option<u32>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            timeout,
            log_dir: log_dir.into(),
        }
    }

    pub fn log_path(&self, target: &BuildTarget) -> PathBuf {
        self.log_dir.join(format!("{}.log", target.log_name))
    }

    pub fn render(&self, target: &BuildTarget) -> String {
        self.cmd
            .replace("{target}", &target.path().to_string_lossy())
            .replace("{solution}", &target.solution.to_string_lossy())
            .replace("{project}", &target.project.to_string_lossy())
            .replace("{project_name}", &target.log_name)
            .replace("{log}", &self.log_path(target).to_string_lossy())
    }

    async fn invoke(&self, command: &str, target: &BuildTarget, log: &Path) -> BuildVerdict {
        let working_dir = target
            .solution
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let child = shell(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                error!("Exception thrown starting `{command}`: {e}");
                return BuildVerdict::Failure;
            }
        };

        let output = match self.timeout {
            Some(secs) => {
                match tokio::time::timeout(
                    Duration::from_secs(u64::from(secs)),
                    child.wait_with_output(),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Build timed out after {secs}s");
                        return BuildVerdict::Failure;
                    }
                }
            }
            None => child.wait_with_output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                error!("Exception thrown waiting for `{command}`: {e}");
                return BuildVerdict::Failure;
            }
        };

        if let Err(e) = append_log(log, command, &output.stdout, &output.stderr).await {
            warn!("Failed to write build log {}: {e}", log.display());
        }

        if output.status.success() {
            BuildVerdict::Success
        } else {
            BuildVerdict::Failure
        }
    }
}

impl BuildOracle for CommandBuildOracle {
    async fn build(&self, target: &BuildTarget) -> BuildOutcome {
        debug!("Beginning build");
        let log = self.log_path(target);
        let command = self.render(target);
        let started = Instant::now();

        let verdict = self.invoke(&command, target, &log).await;
        match verdict {
            BuildVerdict::Success => debug!("Build succeeded"),
            BuildVerdict::Failure => debug!("Build failed"),
        }

        BuildOutcome {
            verdict,
            log: Some(log),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

async fn append_log(
    path: &Path,
    command: &str,
    stdout: &[u8],
    stderr: &[u8],
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("> {command}\n").as_bytes()).await?;
    file.write_all(stdout).await?;
    file.write_all(stderr).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
