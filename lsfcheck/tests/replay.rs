//! Recorded transcripts, through the library and through the `lsfcheck`
//! binary.

use lsfcheck::executor::{Reply, ScriptedConnector, Transcript};
use lsfcheck::{Scenario, run_scenario};
use lsfcheck_test_utils::fixtures::*;
use lsfcheck_test_utils::{ClusterScript, CommandOutput, test_config, write_transcript};
use std::path::Path;

fn lsfcheck(args: &[&str]) -> CommandOutput {
    CommandOutput::run(Path::new(env!("CARGO_BIN_EXE_lsfcheck")), args)
}

#[tokio::test(start_paused = true)]
async fn test_transcript_survives_a_round_trip_through_toml() {
    let file = write_transcript(&ClusterScript::healthy(Scenario::Basic).transcript());
    let transcript = Transcript::load_from_file(file.path()).unwrap();
    assert!(transcript.hosts.contains_key(MASTER_IP));

    let connector = ScriptedConnector::from_transcript(transcript);
    let report = run_scenario(&connector, &test_config(), Scenario::Basic).await;
    assert!(report.all_passed(), "{}", report.summary());
}

#[test]
fn test_replay_command() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("config.toml");
    test_config().save_to_file(&config)?;
    let transcript = write_transcript(&ClusterScript::healthy(Scenario::Basic).transcript());

    let output = lsfcheck(&[
        "--config",
        config.to_str().unwrap(),
        "replay",
        transcript.path().to_str().unwrap(),
        "basic",
    ])
    .expect_success()?;
    output.assert_contains("[PASS] check Cluster ID")?;
    output.assert_contains("[PASS] wait for dynamic node disappearance")?;
    output.assert_contains("0 failed")?;
    Ok(())
}

#[test]
fn test_replay_failure_exits_non_zero() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("config.toml");
    test_config().save_to_file(&config)?;
    let transcript = write_transcript(
        &ClusterScript::healthy(Scenario::Basic)
            .with(MASTER_IP, "lscpu", Reply::ok(LSCPU_OFFLINE))
            .transcript(),
    );

    let output = lsfcheck(&[
        "--config",
        config.to_str().unwrap(),
        "replay",
        transcript.path().to_str().unwrap(),
        "basic",
    ])
    .expect_failure()?;
    assert_eq!(output.exit_code, Some(1));
    output.assert_contains("[FAIL] Hyperthreading check on management node")?;
    output.assert_contains("[PASS] Hyperthreading check on login node")?;
    Ok(())
}

#[test]
fn test_unknown_scenario_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let transcript = write_transcript(&Transcript::default());
    let output = lsfcheck(&["replay", transcript.path().to_str().unwrap(), "everything"])
        .expect_failure()?;
    output.assert_contains("unknown scenario 'everything'")?;
    Ok(())
}

#[test]
fn test_check_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let outputs = dir.path().join("outputs.json");
    std::fs::write(&outputs, PROVISIONING_OUTPUTS)?;
    let outputs = outputs.to_str().unwrap();

    lsfcheck(&["check-outputs", outputs, "--app-center", "--ldap"])
        .expect_success()?
        .assert_contains("[PASS] check terraform outputs")?;

    let partial = dir.path().join("partial.json");
    std::fs::write(
        &partial,
        r#"{"cluster_info": {"ssh_to_management_node": "ssh x", "ssh_to_login_node": "ssh y", "region_name": "us-east"}}"#,
    )?;
    lsfcheck(&["check-outputs", partial.to_str().unwrap()])
        .expect_failure()?
        .assert_contains("vpc_name is missing from terraform output")?;
    Ok(())
}

#[test]
fn test_init_config_does_not_overwrite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lsfcheck.toml");
    let path_arg = path.to_str().unwrap();

    lsfcheck(&["init-config", path_arg]).expect_success()?;
    let written = lsfcheck::Config::load_from_file(&path)?;
    assert_eq!(written, lsfcheck::Config::default());

    lsfcheck(&["init-config", path_arg])
        .expect_failure()?
        .assert_contains("already exists")?;
    Ok(())
}

#[test]
fn test_init_config_from_provisioning_vars() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let vars = dir.path().join("vars.json");
    std::fs::write(
        &vars,
        r#"{"cluster_id": "hpc-cluster", "reservation_id": "res-123", "cluster_prefix": "demo",
            "zones": ["us-east-1"], "ssh_keys": ["deploy-key", "operator-key"]}"#,
    )?;
    let path = dir.path().join("lsfcheck.toml");

    lsfcheck(&[
        "init-config",
        path.to_str().unwrap(),
        "--from-vars",
        vars.to_str().unwrap(),
    ])
    .expect_success()?;
    let written = lsfcheck::Config::load_from_file(&path)?;
    assert_eq!(written.expected.cluster_id, CLUSTER_ID);
    assert_eq!(written.expected.master_name(), "demo-mgmt-1");
    assert_eq!(written.expected.ssh_key_count, 2);
    Ok(())
}

#[test]
fn test_missing_explicit_config_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    lsfcheck(&["--config", "/no/such/lsfcheck.toml", "nodes"])
        .expect_failure()?
        .assert_contains("does not exist")?;
    Ok(())
}
