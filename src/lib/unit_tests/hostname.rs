// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{apply_yaml, merge_yaml, new_provider, show},
    ErrorKind, NetworkState,
};

const HOST_A: &str = r"---
hostname:
  running: host-a.example.org
  config: host-a.example.org
";

#[test]
fn test_hostname_apply_running_and_config() {
    let mut provider = new_provider(HOST_A);
    apply_yaml(
        &mut provider,
        r"---
hostname:
  running: host-b.example.org
  config: host-c.example.org
",
    )
    .unwrap();

    let hostname = show(&mut provider).hostname.unwrap();
    assert_eq!(hostname.running.as_deref(), Some("host-b.example.org"));
    assert_eq!(hostname.config.as_deref(), Some("host-c.example.org"));
}

#[test]
fn test_hostname_config_also_changes_running() {
    let mut provider = new_provider(HOST_A);
    apply_yaml(
        &mut provider,
        r"---
hostname:
  config: host-c.example.org
",
    )
    .unwrap();

    let hostname = show(&mut provider).hostname.unwrap();
    assert_eq!(hostname.running.as_deref(), Some("host-c.example.org"));
    assert_eq!(hostname.config.as_deref(), Some("host-c.example.org"));
}

#[test]
fn test_hostname_memory_only_config() {
    let mut provider = new_provider(HOST_A);
    let mut desired = NetworkState::new_from_yaml(
        r"---
hostname:
  config: host-b.example.org
",
    )
    .unwrap();
    desired.set_memory_only(true).set_verify_retry(2, 10);
    desired.apply(&mut provider).unwrap();

    let hostname = show(&mut provider).hostname.unwrap();
    assert_eq!(hostname.running.as_deref(), Some("host-b.example.org"));
    assert_eq!(hostname.config.as_deref(), Some("host-a.example.org"));
}

#[test]
fn test_hostname_empty_string_means_no_change() {
    let mut provider = new_provider(HOST_A);
    apply_yaml(
        &mut provider,
        r#"---
hostname:
  running: ""
  config: ""
"#,
    )
    .unwrap();

    let hostname = show(&mut provider).hostname.unwrap();
    assert_eq!(hostname.running.as_deref(), Some("host-a.example.org"));
    assert_eq!(hostname.config.as_deref(), Some("host-a.example.org"));
}

#[test]
fn test_hostname_too_long() {
    let result = merge_yaml(
        &format!(
            r"---
hostname:
  config: {}
",
            "a".repeat(65)
        ),
        HOST_A,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_hostname_verify_mismatch() {
    let desired: NetworkState = serde_yaml::from_str(
        r"---
hostname:
  running: host-b.example.org
",
    )
    .unwrap();
    let current: NetworkState = serde_yaml::from_str(HOST_A).unwrap();
    assert!(!NetworkState::state_match(&desired, &current));
}

#[test]
fn test_hostname_verify_without_current() {
    let desired: NetworkState = serde_yaml::from_str(HOST_A).unwrap();
    let merged_state = merge_yaml(HOST_A, "{}").unwrap();
    let result = merged_state.verify(&NetworkState::new());
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::Bug);
    }
    assert!(!NetworkState::state_match(&desired, &NetworkState::new()));
}
