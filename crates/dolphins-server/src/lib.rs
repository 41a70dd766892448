//! HTTP gateway for the Dolphins diver ledger.
//!
//! Exposes the record manager over a small JSON API: one route per
//! operation plus a generic `/invoke` endpoint. Every request runs in its own
//! ledger transaction, committed only when the operation succeeds.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::DolphinsServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use dolphins_ledger::InMemoryLedger;
    use dolphins_registry::RecordManager;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn app() -> Router {
        router::build_router(AppState::new(InMemoryLedger::new(), RecordManager::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(&app(), get("/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_lists_operations() {
        let (status, body) = send(&app(), get("/v1/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["operations"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn diver_lifecycle_over_http() {
        let app = app();

        let (status, body) = send(
            &app,
            post(
                "/diver",
                json!({"id": "d1", "name": "Ann", "bdate": "2000-01-01", "gender": "F", "btype": "Open Water"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "success");
        assert_eq!(body["record"]["levels"], json!([]));

        let (status, _) = send(
            &app,
            post("/level", json!({"id": "d1", "levelname": "OW", "org": "PADI", "instid": "INST1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            post("/course", json!({"id": "d1", "levelname": "OW", "course": "C101"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["levels"][0]["courses"], json!(["C101"]));

        let (status, _) = send(
            &app,
            post("/test", json!({"id": "d1", "levelname": "OW", "status": "Qualified"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get("/diver?id=d1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["levels"][0]["status"], "Qualified");
        assert_eq!(body["bdate"], "2000-01-01");

        let (status, body) = send(&app, get("/diver/history?id=d1")).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3]["IsDelete"], "false");
        assert_eq!(entries[3]["Value"]["levels"][0]["status"], "Qualified");
    }

    #[tokio::test]
    async fn unknown_diver_is_not_found() {
        let (status, body) = send(&app(), get("/diver?id=ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "diver not found: ghost");
    }

    #[tokio::test]
    async fn invoke_endpoint_dispatches_by_name() {
        let app = app();
        let (status, body) = send(
            &app,
            post("/invoke", json!({"fn": "addDiver", "args": ["d2", "Bo", "1990-02-02", "M", "Rescue"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "d2");

        let (status, body) = send(&app, post("/invoke", json!({"fn": "deleteDiver", "args": ["d2"]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported operation: deleteDiver");

        let (status, _) = send(&app, post("/invoke", json!({"fn": "getLevel", "args": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn course_without_levels_is_rejected() {
        let app = app();
        send(
            &app,
            post("/diver", json!({"id": "d3", "name": "Cy", "bdate": "", "gender": "", "btype": ""})),
        )
        .await;
        let (status, _) = send(
            &app,
            post("/course", json!({"id": "d3", "levelname": "OW", "course": "C1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
