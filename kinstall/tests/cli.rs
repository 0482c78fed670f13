/*
 * Binary-level checks for `kinstall install` that don't need a cluster.
 * Flag parsing and skip validation both happen before any client exists.
 */

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn kinstall_cmd() -> Command {
    let mut cmd = Command::cargo_bin("kinstall").unwrap();
    cmd.env("RUST_LOG", "info");
    cmd
}

#[test]
fn legacy_skip_name_is_rejected() {
    kinstall_cmd()
	.args(["install", "--skip", "cilium"])
	.assert()
	.failure()
	.code(1)
	.stderr(predicate::str::contains("invalid input \"cilium\" for skip flag"));
}

#[test]
fn first_invalid_skip_name_is_reported() {
    kinstall_cmd()
	.args(["install", "-s", "networking,kubearmor", "-s", "discoveryengine"])
	.assert()
	.failure()
	.stderr(predicate::str::contains("\"kubearmor\""))
	.stderr(predicate::str::contains("discoveryengine").not());
}

#[test]
fn valid_skip_proceeds_to_cluster_connection() {
    kinstall_cmd()
	.args(["--kubeconfig", "/nonexistent/kinstall/kubeconfig", "install", "--skip", "networking"])
	.assert()
	.failure()
	.code(1)
	.stderr(predicate::str::contains("unable to load kubeconfig"))
	.stderr(predicate::str::contains("skip flag").not());
}

#[test]
fn empty_skip_value_proceeds_to_cluster_connection() {
    kinstall_cmd()
	.args(["--kubeconfig", "/nonexistent/kinstall/kubeconfig", "install", "--skip", ""])
	.assert()
	.failure()
	.code(1)
	.stderr(predicate::str::contains("unable to load kubeconfig"))
	.stderr(predicate::str::contains("skip flag").not());
}

#[test]
fn out_of_range_cluster_id_is_a_usage_error() {
    kinstall_cmd()
	.args(["install", "--cluster-id", "256"])
	.assert()
	.failure()
	.code(2);
}

#[test]
fn install_help_lists_flags_but_hides_base_version() {
    kinstall_cmd()
	.args(["install", "--help"])
	.assert()
	.success()
	.stdout(predicate::str::contains("--skip"))
	.stdout(predicate::str::contains("--cilium-ready-timeout"))
	.stdout(predicate::str::contains("--base-version").not());
}
