use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_raft_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("RAFT__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = RaftNodeConfig::default();

    assert_eq!(config.cluster.node_id, 1);
    assert!(config.cluster.peers.is_empty());
    assert_eq!(config.raft.election.election_timeout_min, 400);
    assert_eq!(config.raft.election.election_timeout_max, 500);
    assert_eq!(config.raft.replication.rpc_append_entries_clock_in_ms, 100);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_raft_env_vars();
    with_vars(
        vec![
            ("RAFT__CLUSTER__NODE_ID", Some("3")),
            ("RAFT__RAFT__ELECTION__ELECTION_TIMEOUT_MAX", Some("900")),
        ],
        || {
            let config = RaftNodeConfig::new().unwrap();

            assert_eq!(config.cluster.node_id, 3);
            assert_eq!(config.raft.election.election_timeout_max, 900);
            // untouched values keep their defaults
            assert_eq!(config.raft.election.election_timeout_min, 400);
        },
    );
}

#[test]
#[serial]
fn peers_can_be_listed_in_environment() {
    cleanup_all_raft_env_vars();
    with_vars(
        vec![
            ("RAFT__CLUSTER__NODE_ID", Some("1")),
            ("RAFT__CLUSTER__PEERS", Some("2,3")),
        ],
        || {
            let config = RaftNodeConfig::new().unwrap().validate().unwrap();

            assert_eq!(config.cluster.peers, vec![2, 3]);
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_raft_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dynamic_config.toml");

    std::fs::write(
        &config_path,
        r#"
        [cluster]
        db_root_dir = "/tmp/xx/db"
        peers = [2, 3]

        [raft.election]
        election_timeout_min = 1000
        election_timeout_max = 3000
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = RaftNodeConfig::new().expect("success");
        let result = base_config.with_override_config(config_path.to_str().unwrap());

        assert!(result.is_ok());
        let config = result.unwrap();

        assert_eq!(config.cluster.db_root_dir.as_os_str().to_str(), Some("/tmp/xx/db"));
        assert_eq!(config.cluster.peers, vec![2, 3]);
        assert_eq!(config.raft.election.election_timeout_min, 1000);
        assert_eq!(config.raft.election.election_timeout_max, 3000);
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_raft_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("test_config.toml");
    std::fs::write(
        &config_path,
        r#"
        [cluster]
        node_id = 100
        peers = [200, 300]
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("RAFT__CLUSTER__NODE_ID", Some("400")),
        ],
        || {
            let config = RaftNodeConfig::new().unwrap();
            assert_eq!(config.cluster.node_id, 400);
            assert_eq!(config.cluster.peers, vec![200, 300]);
        },
    );
}

#[test]
#[serial]
fn missing_config_file_should_fail() {
    cleanup_all_raft_env_vars();
    with_vars(vec![("CONFIG_PATH", Some("/nonexistent/raft_config.toml"))], || {
        assert!(RaftNodeConfig::new().is_err());
    });
}

#[test]
fn validation_should_fail_with_invalid_cluster_config() {
    let mut config = RaftNodeConfig::default();
    config.cluster.node_id = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_self_in_peers() {
    let mut config = RaftNodeConfig::default();
    config.cluster.node_id = 1;
    config.cluster.peers = vec![1, 2];

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_duplicated_peers() {
    let mut config = RaftNodeConfig::default();
    config.cluster.peers = vec![2, 3, 2];

    assert!(config.validate().is_err());
}
