//! `virsh`-backed [`Hypervisor`] implementation.
//!
//! Every call is `virsh -c <uri> <subcommand> ...`. Domain state is obtained
//! from virsh's own `--state-*` filters rather than by scraping the state
//! column, and the remaining table parsing lives in [`super::virsh_parse`].

use std::collections::HashSet;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::core::config::VirshConfig;
use crate::core::errors::{Result, VrcError};
use crate::platform::pal::{Domain, DomainState, Hypervisor, Volume};
use crate::platform::virsh_parse::{is_missing_pool_error, parse_name_list, parse_vol_list};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Talks to libvirt through the `virsh` binary.
#[derive(Debug, Clone)]
pub struct VirshHypervisor {
    binary: String,
    uri: String,
    action_timeout: Option<Duration>,
}

impl VirshHypervisor {
    /// Unbounded adapter for `binary` talking to `uri`.
    #[must_use]
    pub fn new(binary: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            uri: uri.into(),
            action_timeout: None,
        }
    }

    /// Build from config, connecting to `uri` (which may differ from the configured default).
    #[must_use]
    pub fn from_config(config: &VirshConfig, uri: &str) -> Self {
        let timeout = (config.action_timeout_secs > 0)
            .then(|| Duration::from_secs(config.action_timeout_secs));
        Self::new(config.binary.clone(), uri).with_action_timeout(timeout)
    }

    /// Bound each mutating call; `None` waits forever.
    #[must_use]
    pub fn with_action_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Fail with [`VrcError::ToolMissing`] unless the binary can be executed.
    pub fn ensure_available(&self) -> Result<()> {
        match Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => Ok(()),
            Ok(_) | Err(_) => Err(VrcError::ToolMissing {
                tool: self.binary.clone(),
            }),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c")
            .arg(&self.uri)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn query(&self, args: &[&str]) -> Result<Output> {
        self.command(args).output().map_err(|e| self.spawn_error(&e))
    }

    /// Run a query that must succeed for the inventory to be trusted.
    fn query_or_unreachable(&self, args: &[&str]) -> Result<String> {
        let output = self.query(args)?;
        if !output.status.success() {
            return Err(VrcError::DaemonUnreachable {
                uri: self.uri.clone(),
                details: stderr_text(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_error(&self, err: &std::io::Error) -> VrcError {
        if err.kind() == ErrorKind::NotFound {
            VrcError::ToolMissing {
                tool: self.binary.clone(),
            }
        } else {
            VrcError::Runtime {
                details: format!("failed to run {}: {err}", self.binary),
            }
        }
    }

    fn mutate(&self, command: &'static str, args: &[&str], target: &str) -> Result<()> {
        let child = self
            .command(args)
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;
        let output = match self.action_timeout {
            None => child.wait_with_output(),
            Some(limit) => match wait_bounded(child, limit)? {
                Some(output) => Ok(output),
                None => {
                    return Err(VrcError::ActionTimedOut {
                        command,
                        target: target.to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
        }
        .map_err(|e| VrcError::Runtime {
            details: format!("waiting for virsh {command}: {e}"),
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(VrcError::ActionFailed {
                command,
                target: target.to_string(),
                details: stderr_text(&output),
            })
        }
    }

    fn domain_names(&self, filter: &str) -> Result<HashSet<String>> {
        let stdout = self.query_or_unreachable(&["list", "--name", filter])?;
        Ok(parse_name_list(&stdout).into_iter().collect())
    }
}

impl Hypervisor for VirshHypervisor {
    fn endpoint(&self) -> &str {
        &self.uri
    }

    fn list_domains(&self) -> Result<Vec<Domain>> {
        let all = parse_name_list(&self.query_or_unreachable(&["list", "--all", "--name"])?);
        let running = self.domain_names("--state-running")?;
        let stopped = self.domain_names("--state-shutoff")?;
        Ok(all
            .into_iter()
            .map(|name| {
                let state = if running.contains(&name) {
                    DomainState::Running
                } else if stopped.contains(&name) {
                    DomainState::Stopped
                } else {
                    DomainState::Other
                };
                Domain::new(name, state)
            })
            .collect())
    }

    fn pool_exists(&self, pool: &str) -> Result<bool> {
        let stdout = self.query_or_unreachable(&["pool-list", "--all", "--name"])?;
        Ok(parse_name_list(&stdout).iter().any(|name| name == pool))
    }

    fn list_volumes(&self, pool: &str) -> Result<Vec<Volume>> {
        let output = self.query(&["vol-list", "--pool", pool])?;
        if output.status.success() {
            return Ok(parse_vol_list(&String::from_utf8_lossy(&output.stdout), pool));
        }
        let stderr = stderr_text(&output);
        if is_missing_pool_error(&stderr) {
            return Ok(Vec::new());
        }
        Err(VrcError::Runtime {
            details: format!("virsh vol-list --pool {pool}: {stderr}"),
        })
    }

    fn destroy_domain(&self, name: &str) -> Result<()> {
        self.mutate("destroy", &["destroy", name], name)
    }

    fn undefine_domain(&self, name: &str) -> Result<()> {
        self.mutate("undefine", &["undefine", name], name)
    }

    fn delete_volume(&self, pool: &str, name: &str) -> Result<()> {
        self.mutate("vol-delete", &["vol-delete", "--pool", pool, name], name)
    }
}

/// Wait up to `limit`; on expiry send SIGTERM, then SIGKILL after a grace period.
/// Returns `None` when the child had to be killed.
///
/// stderr is drained on a helper thread so a chatty child cannot block on a
/// full pipe and be mistaken for a hung one. stdout must not be piped.
fn wait_bounded(mut child: Child, limit: Duration) -> Result<Option<Output>> {
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stderr = stderr_reader
                    .and_then(|reader| reader.join().ok())
                    .unwrap_or_default();
                return Ok(Some(Output {
                    status,
                    stdout: Vec::new(),
                    stderr,
                }));
            }
            Ok(None) if Instant::now() >= deadline => break,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(VrcError::Runtime {
                    details: format!("polling virsh: {e}"),
                });
            }
        }
    }

    if let Ok(raw) = i32::try_from(child.id()) {
        let _ = kill(Pid::from_raw(raw), Signal::SIGTERM);
    }
    let grace_deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < grace_deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
    let _ = child.kill();
    let _ = child.wait();
    Ok(None)
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if text.is_empty() {
        format!("exited with {}", output.status)
    } else {
        text
    }
}
