mod common;

use common::{FakeSdk, module_from_json, task_args};
use dnac_runner_host::{FaultKind, Module, SdkError};
use serde_json::json;

fn info_module() -> Module {
    module_from_json(json!({
        "family": "intent",
        "name": "thing_info",
        "operations": { "get": ["get_x"] },
        "parameters": {
            "get_x": [ { "name": "id", "type": "string", "required": true } ]
        }
    }))
}

fn lifecycle_module() -> Module {
    module_from_json(json!({
        "family": "things",
        "name": "thing",
        "operations": {
            "get": ["get_thing"],
            "post": ["create_thing"],
            "delete": ["delete_thing"]
        },
        "parameters": {
            "get_thing": [ { "name": "name", "type": "string", "required": true } ],
            "create_thing": [
                { "name": "name", "type": "string", "required": true },
                { "name": "description", "type": "string" }
            ],
            "delete_thing": [ { "name": "name", "type": "string", "required": true } ]
        },
        "responses": {
            "get_thing": { "kind": "object" }
        }
    }))
}

#[tokio::test]
async fn query_invokes_the_get_method_and_never_changes() {
    let module = info_module();
    let client = FakeSdk::new().reply("intent", "get_x", Ok(json!({"response": {"id": "X"}})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "query", "id": "X"})))
        .await;
    assert!(!outcome.failed, "unexpected failure: {outcome:?}");
    assert!(!outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("intent.get_x"));
    assert_eq!(outcome.response, Some(json!({"response": {"id": "X"}})));
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].family, "intent");
    assert_eq!(calls[0].method, "get_x");
    assert_eq!(calls[0].arguments, json!({"id": "X"}).as_object().unwrap().clone());
}

#[tokio::test]
async fn connection_parameters_never_reach_the_sdk() {
    let module = info_module();
    let client = FakeSdk::new().reply("intent", "get_x", Ok(json!({"response": null})));
    module
        .run(&client, &task_args(json!({"state": "query", "id": "X"})))
        .await;
    let call = &client.calls()[0];
    assert!(!call.arguments.contains_key("dnac_host"));
    assert!(!call.arguments.contains_key("dnac_password"));
    assert!(!call.arguments.contains_key("state"));
}

#[tokio::test]
async fn present_creates_when_the_pre_read_finds_nothing() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "get_thing", Ok(json!({"response": null})))
        .reply("things", "create_thing", Ok(json!({"response": {"id": "A"}})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "present", "name": "A"})))
        .await;
    assert!(!outcome.failed);
    assert!(outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("things.create_thing"));
    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, "get_thing");
    assert_eq!(calls[1].method, "create_thing");
}

#[tokio::test]
async fn present_without_put_reports_unchanged_when_found() {
    let module = lifecycle_module();
    let existing = json!({"response": {"id": "A", "name": "A"}});
    let client = FakeSdk::new().reply("things", "get_thing", Ok(existing.clone()));
    let outcome = module
        .run(&client, &task_args(json!({"state": "present", "name": "A"})))
        .await;
    assert!(!outcome.failed);
    assert!(!outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("things.get_thing"));
    assert_eq!(outcome.response, Some(existing));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn absent_skips_the_delete_when_already_gone() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "get_thing", Ok(json!({"response": null})))
        .reply("things", "delete_thing", Ok(json!({})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "absent", "name": "A"})))
        .await;
    assert!(!outcome.failed);
    assert!(!outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("things.get_thing"));
    let calls = client.calls();
    assert_eq!(calls.len(), 1, "delete must not run: {calls:?}");
}

#[tokio::test]
async fn absent_deletes_when_the_object_exists() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "get_thing", Ok(json!({"response": {"id": "A"}})))
        .reply("things", "delete_thing", Ok(json!({})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "absent", "name": "A"})))
        .await;
    assert!(!outcome.failed);
    assert!(outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("things.delete_thing"));
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn pre_read_sends_only_identifying_parameters() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "get_thing", Ok(json!({"response": null})))
        .reply("things", "create_thing", Ok(json!({"response": {"id": "A"}})));
    module
        .run(
            &client,
            &task_args(json!({"state": "present", "name": "A", "description": "first"})),
        )
        .await;
    let calls = client.calls();
    assert_eq!(
        calls[0].arguments,
        json!({"name": "A"}).as_object().unwrap().clone()
    );
    // the write still carries the full parameter set
    assert_eq!(calls[1].arguments["description"], json!("first"));
}

#[tokio::test]
async fn artificial_discriminator_selects_but_is_not_forwarded() {
    let module = module_from_json(json!({
        "family": "devices",
        "name": "device_info",
        "operations": { "get": ["get_detail", "get_count"] },
        "parameters": {
            "get_detail": [
                { "name": "detail", "type": "boolean", "required": true, "artificial": true },
                { "name": "hostname", "type": "string" }
            ],
            "get_count": [
                { "name": "count", "type": "boolean", "required": true, "artificial": true }
            ]
        }
    }));
    let client = FakeSdk::new().reply("devices", "get_count", Ok(json!({"response": 12})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "query", "count": true})))
        .await;
    assert!(!outcome.failed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("devices.get_count"));
    let calls = client.calls();
    assert_eq!(calls[0].method, "get_count");
    assert!(!calls[0].arguments.contains_key("count"));
}

#[tokio::test]
async fn timeout_surfaces_its_own_kind_with_the_function_set() {
    let module = info_module();
    let client = FakeSdk::new().reply(
        "intent",
        "get_x",
        Err(SdkError::timeout("read timed out after 60s")),
    );
    let outcome = module
        .run(&client, &task_args(json!({"state": "query", "id": "X"})))
        .await;
    assert!(outcome.failed);
    assert!(!outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("intent.get_x"));
    let fault = outcome.exception.unwrap();
    assert_eq!(fault.kind, FaultKind::SdkTimeout);
    assert_eq!(fault.sdk_message.as_deref(), Some("read timed out after 60s"));
}

#[tokio::test]
async fn missing_required_argument_fails_validation_with_messages() {
    let module = info_module();
    let client = FakeSdk::new().reply("intent", "get_x", Ok(json!({})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "query"})))
        .await;
    assert!(outcome.failed);
    assert!(outcome.sdk_function.is_none());
    let fault = outcome.exception.unwrap();
    assert_eq!(fault.kind, FaultKind::ArgumentInvalid);
    assert!(fault.details.iter().any(|msg| msg.contains("id")));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn unknown_sdk_function_fails_loudly() {
    let module = info_module();
    let client = FakeSdk::new();
    let outcome = module
        .run(&client, &task_args(json!({"state": "query", "id": "X"})))
        .await;
    assert!(outcome.failed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("intent.get_x"));
    let fault = outcome.exception.unwrap();
    assert_eq!(fault.kind, FaultKind::SdkNotFound);
    assert!(fault.message.contains("intent.get_x"));
}

#[tokio::test]
async fn delete_state_absorbs_not_found() {
    let module = lifecycle_module();
    let client = FakeSdk::new().reply(
        "things",
        "delete_thing",
        Err(SdkError::http(404, "no such thing")),
    );
    let outcome = module
        .run(&client, &task_args(json!({"state": "delete", "name": "A"})))
        .await;
    assert!(!outcome.failed, "not-found must be absorbed: {outcome:?}");
    assert!(!outcome.changed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("things.delete_thing"));
}

#[tokio::test]
async fn create_conflict_is_returned_verbatim() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "create_thing", Ok(json!({"response": {"id": "A"}})))
        .reply(
            "things",
            "create_thing",
            Err(SdkError::http(409, "thing already exists")),
        );
    let first = module
        .run(&client, &task_args(json!({"state": "create", "name": "A"})))
        .await;
    assert!(first.changed && !first.failed);
    let second = module
        .run(&client, &task_args(json!({"state": "create", "name": "A"})))
        .await;
    assert!(second.failed);
    let fault = second.exception.unwrap();
    assert_eq!(fault.kind, FaultKind::SdkCallError);
    assert_eq!(fault.status_code, Some(409));
    assert_eq!(fault.sdk_message.as_deref(), Some("thing already exists"));
}

#[tokio::test]
async fn pre_read_failure_is_its_own_kind_and_precedes_the_write() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "get_thing", Err(SdkError::http(503, "maintenance")))
        .reply("things", "create_thing", Ok(json!({})));
    let outcome = module
        .run(&client, &task_args(json!({"state": "present", "name": "A"})))
        .await;
    assert!(outcome.failed);
    assert_eq!(outcome.sdk_function.as_deref(), Some("things.get_thing"));
    let fault = outcome.exception.unwrap();
    assert_eq!(fault.kind, FaultKind::PreReadFailed);
    assert_eq!(fault.status_code, Some(503));
    assert_eq!(client.calls().len(), 1, "the write must not run");
}

#[tokio::test]
async fn metrics_count_validation_and_dispatch_activity() {
    let module = lifecycle_module();
    let client = FakeSdk::new()
        .reply("things", "get_thing", Ok(json!({"response": null})))
        .reply("things", "create_thing", Ok(json!({"response": {"id": "A"}})));
    module
        .run(&client, &task_args(json!({"state": "present", "name": "A"})))
        .await;
    module.run(&client, &task_args(json!({"state": "create"}))).await;
    let snapshot = module.metrics();
    assert_eq!(snapshot.pre_read_attempts, 1);
    assert_eq!(snapshot.dispatch_attempts, 1);
    assert_eq!(snapshot.validate_errors, 1);
}
