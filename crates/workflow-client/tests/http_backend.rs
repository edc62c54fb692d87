//! HTTP backend against a mock workflow service

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workflow_client::{
    ClientConfig, ExecutionStatus, HttpBackend, NoCredentials, StaticToken, StoreError, StoreStatus,
    WorkflowBackend, WorkflowStatus, WorkflowStore,
};
use workflow_graph::{EditEvent, Node, NodeKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    }
}

fn backend_for(server: &MockServer) -> HttpBackend {
    HttpBackend::new(config_for(server), Arc::new(StaticToken("secret".into())))
}

fn workflow_json(id: &str, data: Value) -> Value {
    json!({
        "id": id,
        "name": "Lead routing",
        "description": "Route inbound leads",
        "status": "draft",
        "user_id": "u-1",
        "template_id": null,
        "workflow_data": data,
        "trigger_config": null,
        "created_at": "2024-05-01T09:30:00.000000",
        "updated_at": "2024-05-01T09:30:00.000000"
    })
}

#[tokio::test]
async fn test_get_workflow_sends_bearer_token() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflows/wf-1"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflow_json("wf-1", json!({"nodes": [], "edges": []}))))
        .expect(1)
        .mount(&server)
        .await;

    let workflow = backend_for(&server).get_workflow("wf-1").await.unwrap();
    assert_eq!(workflow.name, "Lead routing");
    assert_eq!(workflow.status, WorkflowStatus::Draft);
}

#[tokio::test]
async fn test_status_codes_map_to_error_classes() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflows/expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workflows/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Workflow not found"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/workflows/stale"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"detail": "Version mismatch"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workflows/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server), Arc::new(NoCredentials));

    let err = backend.get_workflow("expired").await.unwrap_err();
    assert!(err.requires_reauth());

    match backend.get_workflow("gone").await.unwrap_err() {
        StoreError::NotFound(detail) => assert_eq!(detail, "Workflow not found"),
        other => panic!("unexpected error {:?}", other),
    }

    let err = backend
        .update_workflow("stale", &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let err = backend.get_workflow("flaky").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    init_logging();
    let server = MockServer::start().await;
    let config = config_for(&server);
    drop(server);

    let backend = HttpBackend::new(config, Arc::new(NoCredentials));
    let err = backend.list_workflows(0, 10).await.unwrap_err();
    assert!(matches!(err, StoreError::Network(_)));
}

#[tokio::test]
async fn test_list_pages_with_skip_and_limit() {
    init_logging();
    let server = MockServer::start().await;
    let summary = |id: &str| json!({"id": id, "name": id, "description": null, "status": "active"});
    Mock::given(method("GET"))
        .and(path("/workflows/"))
        .and(query_param("skip", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([summary("a"), summary("b")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workflows/"))
        .and(query_param("skip", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([summary("c")])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        page_size: 2,
        ..config_for(&server)
    };
    let backend = HttpBackend::new(config.clone(), Arc::new(NoCredentials));
    let store = WorkflowStore::new(Arc::new(backend), config);

    let listed = store.list().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_open_edit_save_execute_round_trip() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflows/wf-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflow_json("wf-7", json!({"nodes": [], "edges": []}))))
        .mount(&server)
        .await;

    let saved_data = json!({
        "nodes": [{
            "id": "t1",
            "kind": "trigger",
            "label": "Trigger",
            "config": {},
            "position": {"x": 0.0, "y": 0.0}
        }],
        "edges": []
    });
    Mock::given(method("PUT"))
        .and(path("/workflows/wf-7"))
        .and(body_partial_json(json!({"name": "Lead routing", "workflow_data": saved_data})))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflow_json("wf-7", saved_data.clone())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/workflows/wf-7/execute"))
        .and(body_partial_json(json!({"lead": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "ex-1",
            "workflow_id": "wf-7",
            "user_id": "u-1",
            "status": "pending",
            "input_data": {"lead": "ada@example.com"},
            "output_data": null,
            "error_message": null,
            "execution_logs": [],
            "started_at": "2024-05-01T09:31:00",
            "completed_at": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let store = WorkflowStore::new(Arc::new(backend_for(&server)), config);

    store.open("wf-7").await.unwrap();
    store
        .apply_edit(EditEvent::AddNode {
            node: Node::new("t1", NodeKind::Trigger),
        })
        .unwrap();
    assert_eq!(store.status(), StoreStatus::Dirty);

    store.save().await.unwrap();
    assert_eq!(store.status(), StoreStatus::Clean);

    let execution = store
        .execute("wf-7", json!({"lead": "ada@example.com"}))
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Pending);
}

#[tokio::test]
async fn test_create_rejected_by_service_validation() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workflows/"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [{"loc": ["body", "workflow_data"], "msg": "field required", "type": "missing"}]
        })))
        .mount(&server)
        .await;

    let store = WorkflowStore::new(Arc::new(backend_for(&server)), config_for(&server));
    match store.create("New flow", "").await.unwrap_err() {
        StoreError::Validation { detail, .. } => assert_eq!(detail, "workflow_data: field required"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(store.status(), StoreStatus::Unopened);
}

#[tokio::test]
async fn test_delete_and_templates() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/workflows/wf-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/templates/"))
        .and(query_param("category", "sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "tpl-1",
            "name": "Lead follow-up",
            "description": null,
            "category": "sales",
            "icon": "mail",
            "template_data": {"nodes": [], "edges": []},
            "is_published": true,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    backend.delete_workflow("wf-1").await.unwrap();

    let templates = backend.list_templates(Some("sales"), 0, 100).await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].icon.as_deref(), Some("mail"));
}

#[tokio::test]
async fn test_get_execution_path() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflows/executions/ex-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ex-9",
            "workflow_id": "wf-1",
            "status": "completed",
            "started_at": "2024-05-01T09:31:00",
            "completed_at": "2024-05-01T09:31:05.250000"
        })))
        .mount(&server)
        .await;

    let execution = backend_for(&server).get_execution("ex-9").await.unwrap();
    assert!(execution.status.is_terminal());
    assert!(execution.completed_at.unwrap() > execution.started_at);
}

#[tokio::test]
async fn test_clearing_description_sends_null() {
    init_logging();
    let server = MockServer::start().await;
    let data = json!({"nodes": [], "edges": []});
    Mock::given(method("GET"))
        .and(path("/workflows/wf-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflow_json("wf-3", data.clone())))
        .mount(&server)
        .await;

    let mut cleared = workflow_json("wf-3", data);
    cleared["description"] = Value::Null;
    Mock::given(method("PUT"))
        .and(path("/workflows/wf-3"))
        .and(body_partial_json(json!({"name": "Lead routing", "description": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(cleared))
        .expect(1)
        .mount(&server)
        .await;

    let store = WorkflowStore::new(Arc::new(backend_for(&server)), config_for(&server));
    store.open("wf-3").await.unwrap();
    let updated = store.update_details("Lead routing", "").await.unwrap();
    assert_eq!(updated.description, None);
}
