//! Wiring tests for the tool registry and dispatcher.
//!
//! These run against a client that was never connected: argument
//! validation must fire before any network I/O, and anything that would
//! reach the appliance fails fast with a connection error instead.

use serde_json::{Map, Value, json};

use fmg_api::{FmgClient, FmgError};
use fmg_mcp::tools;

fn offline_client() -> FmgClient {
    FmgClient::builder("fmg.test.invalid")
        .token("test-token")
        .build()
        .expect("client builds")
}

fn args(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn every_registered_tool_has_a_dispatch_arm() {
    let client = offline_client();
    for spec in tools::all_specs() {
        let result = tools::dispatch(&client, spec.name, &Map::new()).await;
        assert!(
            result.is_some(),
            "tool '{}' is registered but not dispatchable",
            spec.name
        );
    }
}

#[tokio::test]
async fn unknown_tool_name_is_not_claimed() {
    let client = offline_client();
    assert!(
        tools::dispatch(&client, "no_such_tool", &Map::new())
            .await
            .is_none()
    );
}

#[tokio::test]
async fn validation_rejects_bad_arguments_before_any_network_io() {
    let client = offline_client();

    // Serial numbers must carry a Fortinet platform prefix.
    let result = tools::dispatch(
        &client,
        "add_model_device",
        &args(&[
            ("adom", json!("root")),
            ("name", json!("fgt-lab")),
            ("serial_number", json!("NOT-A-SERIAL")),
        ]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Validation(_))), "{result:?}");

    // Zero polling budget is rejected up front.
    let result = tools::dispatch(
        &client,
        "wait_for_task",
        &args(&[("task_id", json!(42)), ("timeout", json!(0))]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Validation(_))), "{result:?}");

    // Move positions are a closed set.
    let result = tools::dispatch(
        &client,
        "move_firewall_policy",
        &args(&[
            ("adom", json!("root")),
            ("package", json!("default")),
            ("policy_id", json!(1)),
            ("target", json!(2)),
            ("position", json!("sideways")),
        ]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Validation(_))), "{result:?}");

    // ADOM names ride into request URLs, so they are checked strictly.
    let result = tools::dispatch(
        &client,
        "list_devices",
        &args(&[("adom", json!("../escape"))]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Validation(_))), "{result:?}");

    // A device must come with an address or a serial number.
    let result = tools::dispatch(
        &client,
        "add_device",
        &args(&[("adom", json!("root")), ("name", json!("fgt-new"))]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Validation(_))), "{result:?}");
}

#[tokio::test]
async fn disconnected_client_fails_fast_with_connection_error() {
    let client = offline_client();

    let result = tools::dispatch(&client, "get_system_status", &Map::new())
        .await
        .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Connection(_))), "{result:?}");

    // Valid arguments, but the status fetch itself cannot happen; the
    // poller must surface that as an error, not as a timeout.
    let result = tools::dispatch(
        &client,
        "wait_for_task",
        &args(&[("task_id", json!(99))]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Connection(_))), "{result:?}");
}

#[tokio::test]
async fn create_service_requires_at_least_one_port_range() {
    let client = offline_client();
    let result = tools::dispatch(
        &client,
        "create_service_tcp_udp",
        &args(&[("adom", json!("root")), ("name", json!("svc-empty"))]),
    )
    .await
    .expect("dispatched");
    assert!(matches!(result, Err(FmgError::Validation(_))), "{result:?}");
}
