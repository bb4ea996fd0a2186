//! End-to-end runs of `reclaim-all` and `reclaim-project` against a scripted virsh.

mod common;

use common::{Lab, run_cli_case};
use virt_reclaim::guard::lock::RunLock;

#[test]
fn help_lists_the_force_flag() {
    let lab = Lab::new();
    for bin in ["reclaim-all", "reclaim-project"] {
        let result = run_cli_case("help_lists_the_force_flag", bin, &lab, &lab.state(), &["--help"]);
        assert!(result.status.success(), "log: {}", result.log_path.display());
        assert!(
            result.stdout.contains("--force") && result.stdout.contains("--quiet"),
            "missing flags in help; log: {}",
            result.log_path.display()
        );
    }
    assert!(lab.virsh_calls().is_empty());
}

#[test]
fn unknown_arguments_are_usage_errors() {
    let lab = Lab::new();
    let result = run_cli_case("unknown_arguments", "reclaim-all", &lab, &lab.state(), &["--bogus"]);
    assert_eq!(result.code(), Some(2), "log: {}", result.log_path.display());
    assert!(lab.virsh_calls().is_empty());
}

#[test]
fn project_dry_run_plans_only_prefixed_resources() {
    let lab = Lab::new()
        .domain("lab1_web", "running")
        .domain("lab1_db", "shutoff")
        .domain("other_db", "running")
        .pool("default")
        .volume("lab1_web_disk")
        .volume("base_vagrant_box_image_9")
        .volume("other_disk");
    let project = lab.project_dir("lab1", true);

    let result = run_cli_case("project_dry_run", "reclaim-project", &lab, &project, &[]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("[dry-run] would destroy domain lab1_web"));
    assert!(result.stdout.contains("[dry-run] would undefine domain lab1_db"));
    assert!(result.stdout.contains("[dry-run] would delete volume lab1_web_disk"));
    assert!(!result.stdout.contains("other_db"));
    assert!(!result.stdout.contains("other_disk"));
    assert!(!result.stdout.contains("base_vagrant_box_image_9"));
    assert!(result.stdout.contains("Re-run with --force"));
    assert!(
        lab.mutating_calls().is_empty(),
        "dry run mutated; log: {}",
        result.log_path.display()
    );
    assert!(lab.vagrant_calls().is_empty());
}

#[test]
fn project_force_run_touches_exactly_the_prefixed_resources() {
    let lab = Lab::new()
        .domain("lab1_web", "running")
        .domain("lab1_db", "shutoff")
        .domain("other_db", "running")
        .pool("default")
        .volume("lab1_web_disk")
        .volume("base_vagrant_box_image_9")
        .volume("other_disk");
    let project = lab.project_dir("lab1", true);

    let result = run_cli_case("project_force", "reclaim-project", &lab, &project, &["--force"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(
        lab.mutating_calls(),
        vec![
            "destroy lab1_web",
            "undefine lab1_web",
            "undefine lab1_db",
            "vol-delete --pool default lab1_web_disk",
        ]
    );
    assert_eq!(lab.vagrant_calls(), vec!["destroy -f @ lab1"]);
    assert!(result.stdout.contains("Done: 4 succeeded, 0 failed, 0 skipped"));
}

#[test]
fn force_run_never_requeries_libvirt_after_mutating() {
    let lab = Lab::new()
        .domain("vm1", "running")
        .domain("vm2", "shutoff")
        .pool("default")
        .volume("vm1.img")
        .volume("installer.iso");

    let result = run_cli_case("no_requery", "reclaim-all", &lab, &lab.state(), &["--force"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let calls = lab.virsh_calls();
    let is_mutation = |c: &String| {
        c.starts_with("destroy ") || c.starts_with("undefine ") || c.starts_with("vol-delete ")
    };
    let first = calls
        .iter()
        .position(is_mutation)
        .expect("force run mutates");
    let queries_after: Vec<&String> = calls[first..]
        .iter()
        .filter(|c| c.starts_with("list ") || c.starts_with("pool-list ") || c.starts_with("vol-list "))
        .collect();
    assert!(
        queries_after.is_empty(),
        "inventory re-queried mid-run: {queries_after:?}; log: {}",
        result.log_path.display()
    );
    assert_eq!(calls.iter().filter(|c| c.starts_with("vol-list ")).count(), 1);
    assert_eq!(calls.iter().filter(|c| c.starts_with("list --all")).count(), 1);
}

#[test]
fn skip_vagrant_leaves_the_orchestrator_alone() {
    let lab = Lab::new().domain("lab1_web", "shutoff");
    let project = lab.project_dir("lab1", true);
    let result = run_cli_case(
        "skip_vagrant",
        "reclaim-project",
        &lab,
        &project,
        &["--force", "--skip-vagrant"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(lab.vagrant_calls().is_empty());
    assert_eq!(lab.mutating_calls(), vec!["undefine lab1_web"]);
}

#[test]
fn global_run_keeps_box_images_and_isos() {
    let lab = Lab::new()
        .pool("default")
        .volume("vm_disk1")
        .volume("centos_vagrant_box_image_7")
        .volume("installer.iso");

    let result = run_cli_case("global_force", "reclaim-all", &lab, &lab.state(), &["--force"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(lab.mutating_calls(), vec!["vol-delete --pool default vm_disk1"]);
    assert!(result.stdout.contains("Keeping protected volume centos_vagrant_box_image_7"));
    assert!(result.stdout.contains("Keeping protected volume installer.iso"));
}

#[test]
fn failed_destroy_does_not_stop_undefine() {
    let lab = Lab::new()
        .domain("lab1_web", "running")
        .failing("destroy", "lab1_web");
    let project = lab.project_dir("lab1", true);

    let result = run_cli_case(
        "failed_destroy",
        "reclaim-project",
        &lab,
        &project,
        &["--force", "--skip-vagrant"],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert_eq!(lab.mutating_calls(), vec!["destroy lab1_web", "undefine lab1_web"]);
    assert!(result.stderr.contains("[failed] destroy domain lab1_web"));
    assert!(result.stdout.contains("Done: 1 succeeded, 1 failed, 0 skipped"));
}

#[test]
fn empty_inventory_reports_nothing_to_reclaim() {
    let lab = Lab::new().pool("default");
    for args in [&[][..], &["--force"][..]] {
        let result = run_cli_case("empty_inventory", "reclaim-all", &lab, &lab.state(), args);
        assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
        assert!(result.stdout.contains("Nothing to reclaim"));
    }
    assert!(lab.mutating_calls().is_empty());
}

#[test]
fn missing_pool_is_skipped_but_domains_are_reclaimed() {
    let lab = Lab::new().domain("vm1", "shutoff");
    let result = run_cli_case("missing_pool", "reclaim-all", &lab, &lab.state(), &["--force"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Pool 'default' not found; skipping volumes."));
    assert_eq!(lab.mutating_calls(), vec!["undefine vm1"]);
}

#[test]
fn missing_vagrantfile_fails_before_touching_libvirt() {
    let lab = Lab::new().domain("lab1_web", "running");
    let project = lab.project_dir("lab1", false);
    let result = run_cli_case("missing_vagrantfile", "reclaim-project", &lab, &project, &["--force"]);
    assert_eq!(result.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("Vagrantfile"));
    assert!(lab.virsh_calls().is_empty());
    assert!(!lab.lock_path().exists());
}

#[test]
fn missing_virsh_is_fatal() {
    let lab = Lab::new();
    let exe = env!("CARGO_BIN_EXE_reclaim-all");
    let output = std::process::Command::new(exe)
        .arg("--force")
        .env_remove("VRC_CONFIG")
        .env("VRC_VIRSH", lab.state().join("no-such-virsh"))
        .env("VRC_LOCK_PATH", lab.lock_path())
        .output()
        .expect("spawn");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VRC-2001"), "stderr: {stderr}");
}

#[test]
fn unreachable_daemon_is_fatal_and_mutates_nothing() {
    let lab = Lab::new().domain("vm1", "running").unreachable();
    let result = run_cli_case("unreachable", "reclaim-all", &lab, &lab.state(), &["--force"]);
    assert_eq!(result.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("error:"));
    assert!(lab.mutating_calls().is_empty());
}

#[test]
fn held_lock_rejects_a_second_run() {
    let lab = Lab::new().domain("vm1", "running").pool("default");
    let project = lab.project_dir("vm1", true);
    let _held = RunLock::acquire(&lab.lock_path()).expect("hold lock");

    for (bin, cwd) in [("reclaim-all", lab.state()), ("reclaim-project", project)] {
        let result = run_cli_case("held_lock", bin, &lab, &cwd, &["--force", "-q"]);
        assert_eq!(result.code(), Some(1), "log: {}", result.log_path.display());
        assert!(result.stderr.contains("another instance is running"));
        assert!(result.stdout.is_empty());
    }
    assert!(lab.mutating_calls().is_empty());
}

#[test]
fn lock_is_released_after_a_run() {
    let lab = Lab::new().pool("default");
    let first = run_cli_case("lock_release_1", "reclaim-all", &lab, &lab.state(), &["--force"]);
    assert!(first.status.success(), "log: {}", first.log_path.display());
    assert!(RunLock::acquire(&lab.lock_path()).is_ok());
}

#[test]
fn quiet_mode_prints_nothing_on_success() {
    let lab = Lab::new()
        .domain("vm1", "running")
        .pool("default")
        .volume("vm1.img");
    let result = run_cli_case("quiet", "reclaim-all", &lab, &lab.state(), &["--force", "--quiet"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.is_empty());
    assert!(result.stderr.is_empty());
    assert_eq!(lab.mutating_calls().len(), 3);
}

#[test]
fn json_mode_emits_one_report_object() {
    let lab = Lab::new()
        .domain("vm1", "shutoff")
        .pool("default")
        .volume("ubuntu_vagrant_box_image_1");
    let result = run_cli_case("json", "reclaim-all", &lab, &lab.state(), &["--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let value: serde_json::Value =
        serde_json::from_str(result.stdout.trim()).expect("stdout is one JSON document");
    assert_eq!(value["report"]["mode"], "simulate");
    assert_eq!(value["skipped"], 1);
    assert_eq!(value["protected"][0]["name"], "ubuntu_vagrant_box_image_1");
}

#[test]
fn activity_log_records_each_action() {
    let lab = Lab::new()
        .domain("vm1", "running")
        .failing("undefine", "vm1");
    let result = run_cli_case("activity_log", "reclaim-all", &lab, &lab.state(), &["--force"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let raw = std::fs::read_to_string(lab.activity_log()).expect("activity log");
    let lines: Vec<serde_json::Value> = raw
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["outcome"], "failed");
    assert_eq!(lines[1]["code"], "VRC-3001");
    assert_eq!(lines[2]["event"], "run_summary");
}
