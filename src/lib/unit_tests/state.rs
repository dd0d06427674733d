// SPDX-License-Identifier: Apache-2.0

use serde_json::{json, Value};

use crate::state::{get_json_value_difference, PASSWORD_HID};

#[test]
fn test_json_difference_reports_nested_path() {
    let desired = json!({"eth1": {"ipv4": {"address": [
        {"ip": "192.0.2.1", "prefix-length": 24},
    ]}}});
    let current = json!({"eth1": {"mtu": 1500, "ipv4": {"address": [
        {"ip": "192.0.2.1", "prefix-length": 25},
    ]}}});
    let diff =
        get_json_value_difference("iface".to_string(), &desired, &current);
    assert_eq!(
        diff,
        Some((
            "iface.eth1.ipv4.address[0].prefix-length".to_string(),
            &json!(24),
            &json!(25),
        ))
    );
}

#[test]
fn test_json_difference_ignores_null_and_hidden_password() {
    let desired = json!({"description": null, "psk": PASSWORD_HID});
    let current = json!({"psk": "secret"});
    assert_eq!(
        get_json_value_difference("iface".to_string(), &desired, &current),
        None
    );
}

#[test]
fn test_json_difference_list_length_mismatch() {
    let desired = json!({"ports": ["eth1", "eth2"]});
    let current = json!({"ports": ["eth1"]});
    let diff =
        get_json_value_difference("br0".to_string(), &desired, &current);
    assert_eq!(diff.map(|(path, _, _)| path), Some("br0.ports".to_string()));
}

#[test]
fn test_json_difference_missing_key() {
    let desired = json!({"mtu": 9000});
    let current = json!({});
    assert_eq!(
        get_json_value_difference("eth1".to_string(), &desired, &current),
        Some(("eth1.mtu".to_string(), &json!(9000), &Value::Null))
    );
}
