//! Shared harness: a throwaway "host" with a scripted `virsh` and `vagrant`.
//!
//! The fake `virsh` reads its inventory from plain files in the lab's state
//! directory and appends every invocation to `calls.log`, so tests can assert
//! exactly which commands a run issued.

#![allow(dead_code, missing_docs)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tempfile::TempDir;

const FAKE_VIRSH: &str = r#"#!/bin/sh
STATE="__STATE__"
echo "$*" >> "$STATE/calls.log"
if [ "$1" = "--version" ]; then echo "10.0.0"; exit 0; fi
if [ -f "$STATE/unreachable" ]; then
  echo "error: failed to connect to the hypervisor" >&2
  exit 1
fi
shift 2
cmd="$1"
shift
case "$cmd" in
  list)
    case "$*" in
      *--state-running*) awk '$2=="running"{print $1}' "$STATE/domains" ;;
      *--state-shutoff*) awk '$2=="shutoff"{print $1}' "$STATE/domains" ;;
      *) awk '{print $1}' "$STATE/domains" ;;
    esac
    echo
    exit 0 ;;
  pool-list)
    cat "$STATE/pools"
    echo
    exit 0 ;;
  vol-list)
    pool="$2"
    if ! grep -qx "$pool" "$STATE/pools"; then
      echo "error: failed to get pool '$pool'" >&2
      echo "error: Storage pool not found: no storage pool with matching name '$pool'" >&2
      exit 1
    fi
    echo " Name                 Path"
    echo "------------------------------------------------------------"
    while read -r vol; do
      [ -n "$vol" ] && echo " $vol    /var/lib/libvirt/images/$vol"
    done < "$STATE/volumes"
    echo
    exit 0 ;;
  destroy|undefine|vol-delete)
    for target in "$@"; do :; done
    if grep -qx "$cmd $target" "$STATE/fail"; then
      echo "error: failed to $cmd '$target'" >&2
      exit 1
    fi
    exit 0 ;;
esac
echo "error: unknown command '$cmd'" >&2
exit 1
"#;

const FAKE_VAGRANT: &str = r#"#!/bin/sh
echo "$* @ $(basename "$PWD")" >> "__STATE__/vagrant.log"
exit 0
"#;

/// A fake host: scripted tools plus the files they read.
pub struct Lab {
    root: TempDir,
}

impl Lab {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let lab = Self { root };
        fs::create_dir_all(lab.state()).expect("state dir");
        for file in ["domains", "pools", "volumes", "fail", "calls.log"] {
            fs::write(lab.state().join(file), "").expect("state file");
        }
        lab.install_script("virsh", FAKE_VIRSH);
        lab.install_script("vagrant", FAKE_VAGRANT);
        lab
    }

    fn install_script(&self, name: &str, template: &str) {
        let path = self.state().join(name);
        let body = template.replace("__STATE__", &self.state().display().to_string());
        fs::write(&path, body).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    pub fn state(&self) -> PathBuf {
        self.root.path().join("state")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.path().join("run/virt-reclaim.lock")
    }

    pub fn activity_log(&self) -> PathBuf {
        self.root.path().join("activity.jsonl")
    }

    /// `state` is `running` or `shutoff`.
    pub fn domain(self, name: &str, state: &str) -> Self {
        self.append("domains", &format!("{name} {state}"));
        self
    }

    pub fn pool(self, name: &str) -> Self {
        self.append("pools", name);
        self
    }

    /// Volume in the `default` pool.
    pub fn volume(self, name: &str) -> Self {
        self.append("volumes", name);
        self
    }

    /// Make `<op> <target>` exit non-zero.
    pub fn failing(self, op: &str, target: &str) -> Self {
        self.append("fail", &format!("{op} {target}"));
        self
    }

    pub fn unreachable(self) -> Self {
        fs::write(self.state().join("unreachable"), "").expect("marker");
        self
    }

    /// Directory `<root>/projects/<name>`, optionally holding a Vagrantfile.
    pub fn project_dir(&self, name: &str, with_vagrantfile: bool) -> PathBuf {
        let dir = self.root.path().join("projects").join(name);
        fs::create_dir_all(&dir).expect("project dir");
        if with_vagrantfile {
            fs::write(dir.join("Vagrantfile"), "Vagrant.configure('2') do |c| end\n")
                .expect("vagrantfile");
        }
        dir
    }

    fn append(&self, file: &str, line: &str) {
        let path = self.state().join(file);
        let mut raw = fs::read_to_string(&path).unwrap_or_default();
        raw.push_str(line);
        raw.push('\n');
        fs::write(path, raw).expect("append");
    }

    /// Every virsh invocation, minus the `-c <uri>` prefix.
    pub fn virsh_calls(&self) -> Vec<String> {
        fs::read_to_string(self.state().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(|line| {
                line.strip_prefix("-c ")
                    .and_then(|rest| rest.split_once(' ').map(|(_, cmd)| cmd))
                    .unwrap_or(line)
                    .to_string()
            })
            .collect()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.virsh_calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("destroy ") || c.starts_with("undefine ") || c.starts_with("vol-delete ")
            })
            .collect()
    }

    pub fn vagrant_calls(&self) -> Vec<String> {
        fs::read_to_string(self.state().join("vagrant.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Captured result of one binary invocation.
pub struct CaseResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CaseResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Run `bin` (`reclaim-all` or `reclaim-project`) against `lab` from `cwd`,
/// and keep a per-case log under the cargo target tmpdir.
pub fn run_cli_case(case: &str, bin: &str, lab: &Lab, cwd: &Path, args: &[&str]) -> CaseResult {
    let exe = match bin {
        "reclaim-all" => env!("CARGO_BIN_EXE_reclaim-all"),
        "reclaim-project" => env!("CARGO_BIN_EXE_reclaim-project"),
        other => panic!("unknown binary {other}"),
    };
    let output = Command::new(exe)
        .args(args)
        .current_dir(cwd)
        .env_remove("VRC_CONFIG")
        .env("VRC_VIRSH", lab.state().join("virsh"))
        .env("VRC_VAGRANT", lab.state().join("vagrant"))
        .env("VRC_LOCK_PATH", lab.lock_path())
        .env("VRC_ACTIVITY_LOG", lab.activity_log())
        .env("NO_COLOR", "1")
        .output()
        .expect("spawn binary");

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    let log_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("cli-cases");
    fs::create_dir_all(&log_dir).expect("log dir");
    let log_path = log_dir.join(format!("{case}.log"));
    let log = format!(
        "bin: {bin}\nargs: {args:?}\ncwd: {}\nstatus: {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n--- virsh ---\n{}\n",
        cwd.display(),
        output.status,
        lab.virsh_calls().join("\n"),
    );
    fs::write(&log_path, log).expect("write case log");

    CaseResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
