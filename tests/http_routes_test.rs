mod common;

use common::*;
use qna_engine::pipeline::QaPipeline;
use qna_engine::server::{route, AppState, HttpRequest};
use serde_json::Value;
use std::sync::Arc;

fn state(planner: ScriptedPlanner, gateway: ScriptedGateway) -> AppState {
    let orchestrator = orchestrator(Arc::new(planner), Arc::new(gateway), 2);
    AppState {
        pipeline: QaPipeline::new(orchestrator, Arc::new(CountingComposer)),
        title: "QnA test".to_string(),
        version: "0.0.1".to_string(),
    }
}

fn request(method: &str, path: &str, body: &str) -> HttpRequest {
    HttpRequest {
        method: method.to_string(),
        path: path.to_string(),
        body: body.to_string(),
    }
}

fn body(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

#[tokio::test]
async fn test_health_reports_service() {
    let state = state(ScriptedPlanner::new(), ScriptedGateway::new());
    let response = route(&state, &request("GET", "/api/health", "")).await;
    assert_eq!(response.status, 200);
    let payload = body(&response.body);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["service"], "QnA test");
}

#[tokio::test]
async fn test_question_is_answered() {
    let state = state(
        ScriptedPlanner::new().intent("SELECT id, razao_social FROM empresa LIMIT 5"),
        ScriptedGateway::new().rows(vec![row(7, "ACME LTDA")]),
    );
    let response = route(&state, &request("POST", "/api/questions", r#"{"pergunta": "Quais empresas?"}"#)).await;

    assert_eq!(response.status, 200);
    let payload = body(&response.body);
    assert_eq!(payload["original_question"], "Quais empresas?");
    assert_eq!(payload["composed_answer"], "1 rows found");
    assert_eq!(payload["query_summary"]["rows"][0]["razao_social"], "ACME LTDA");
}

#[tokio::test]
async fn test_rejected_statement_maps_to_400() {
    let state = state(ScriptedPlanner::new().intent("DROP TABLE empresa"), ScriptedGateway::new());
    let response = route(&state, &request("POST", "/api/questions", r#"{"question": "Apague tudo"}"#)).await;
    assert_eq!(response.status, 400);
    assert!(body(&response.body)["detail"].as_str().unwrap().contains("DisallowedStatementType"));
}

#[tokio::test]
async fn test_exhausted_engine_errors_map_to_422() {
    let state = state(
        ScriptedPlanner::new()
            .intent("SELECT a FROM empresa LIMIT 1")
            .intent("SELECT b FROM empresa LIMIT 1"),
        ScriptedGateway::new()
            .engine_error("column \"a\" does not exist")
            .engine_error("column \"b\" does not exist"),
    );
    let response = route(&state, &request("POST", "/api/questions", r#"{"question": "Quais?"}"#)).await;
    assert_eq!(response.status, 422);
    assert!(body(&response.body)["detail"].as_str().unwrap().contains("column \"b\" does not exist"));
}

#[tokio::test]
async fn test_malformed_planner_reply_maps_to_502() {
    let state = state(ScriptedPlanner::new().raw("not json at all"), ScriptedGateway::new());
    let response = route(&state, &request("POST", "/api/questions", r#"{"question": "Quais?"}"#)).await;
    assert_eq!(response.status, 502);
}

#[tokio::test]
async fn test_bad_body_and_unknown_route() {
    let state = state(ScriptedPlanner::new(), ScriptedGateway::new());

    let response = route(&state, &request("POST", "/api/questions", "{not json")).await;
    assert_eq!(response.status, 400);

    let response = route(&state, &request("POST", "/api/questions", r#"{"question": "   "}"#)).await;
    assert_eq!(response.status, 400);

    let response = route(&state, &request("GET", "/api/unknown", "")).await;
    assert_eq!(response.status, 404);
}
