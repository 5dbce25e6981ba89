//! API router.
//!
//! Returns a composable `Router` with all endpoints nested under `/api`,
//! wrapped in request tracing and permissive CORS for browser clients.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/conversations",
            get(endpoints::conversations::list).post(endpoints::conversations::create),
        )
        .route(
            "/conversations/:id",
            get(endpoints::conversations::detail)
                .patch(endpoints::conversations::update)
                .delete(endpoints::conversations::remove),
        )
        .route(
            "/conversations/:id/messages",
            get(endpoints::messages::list).post(endpoints::messages::send),
        )
        .route(
            "/messages/:id/feedback",
            get(endpoints::feedback::detail).post(endpoints::feedback::submit),
        )
        .route("/insights", get(endpoints::insights::report))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::llm::MockReplyGenerator;

    fn test_app(generator: MockReplyGenerator) -> (Router, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(tmp.path().join("test.db"), Arc::new(generator));
        (api_router(ctx), tmp)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_conversation(app: &Router, body: &str) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/conversations", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn health_reports_name_and_version() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));

        let response = app.oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["name"], "Palaver");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));
        let response = app.oneshot(get_request("/api/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_and_list_conversations() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));

        let created = create_conversation(&app, r#"{"title":"First"}"#).await;
        assert_eq!(created["title"], "First");
        assert!(created["quality_score"].is_null());

        let response = app
            .oneshot(get_request("/api/conversations"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["limit"], 20);
        assert_eq!(json["offset"], 0);
        assert_eq!(json["results"][0]["title"], "First");
    }

    #[tokio::test]
    async fn list_tolerates_malformed_pagination() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));

        let response = app
            .oneshot(get_request("/api/conversations?limit=abc&offset=-3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["limit"], 20);
        assert_eq!(json["offset"], 0);
    }

    #[tokio::test]
    async fn detail_rejects_bad_and_unknown_ids() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));

        let response = app
            .clone()
            .oneshot(get_request("/api/conversations/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get_request(&format!(
                "/api/conversations/{}",
                uuid::Uuid::new_v4()
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_renames_and_clears_title() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));
        let created = create_conversation(&app, r#"{"title":"Before"}"#).await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/conversations/{id}"),
                r#"{"title":"After"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["title"], "After");

        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/api/conversations/{id}"),
                r#"{"title":"   "}"#,
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["title"].is_null());
    }

    #[tokio::test]
    async fn delete_removes_conversation() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));
        let created = create_conversation(&app, "{}").await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/conversations/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(get_request(&format!("/api/conversations/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn send_message_stores_turn_and_auto_titles() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("Lifetimes tie borrows to scopes."));
        let created = create_conversation(&app, "{}").await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/conversations/{id}/messages"),
                r#"{"text":"How do lifetimes work?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["user_message"]["role"], "user");
        assert_eq!(json["user_message"]["sequence"], 1);
        assert_eq!(json["ai_message"]["role"], "ai");
        assert_eq!(json["ai_message"]["sequence"], 2);
        assert_eq!(json["ai_message"]["text"], "Lifetimes tie borrows to scopes.");

        // First user message titles the conversation
        let response = app
            .oneshot(get_request(&format!("/api/conversations/{id}")))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["title"], "How do lifetimes work?");
    }

    #[tokio::test]
    async fn send_message_rejects_blank_text() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));
        let created = create_conversation(&app, "{}").await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/conversations/{id}/messages"),
                r#"{"text":"   "}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn send_message_unknown_conversation_is_404() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("ok"));
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/conversations/{}/messages", uuid::Uuid::new_v4()),
                r#"{"text":"hello"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generator_failure_returns_502_but_keeps_user_message() {
        let (app, _tmp) = test_app(MockReplyGenerator::failing("connection refused"));
        let created = create_conversation(&app, "{}").await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/conversations/{id}/messages"),
                r#"{"text":"hello"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "LLM_UNAVAILABLE");

        // The user message survived the failed reply
        let response = app
            .oneshot(get_request(&format!("/api/conversations/{id}/messages")))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["results"].as_array().unwrap().len(), 1);
        assert_eq!(json["results"][0]["role"], "user");
        assert_eq!(json["lastSeq"], 1);
    }

    #[tokio::test]
    async fn message_list_supports_since_cursor() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("reply"));
        let created = create_conversation(&app, "{}").await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/conversations/{id}/messages"),
                r#"{"text":"first"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(get_request(&format!(
                "/api/conversations/{id}/messages?since=1"
            )))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["results"].as_array().unwrap().len(), 1);
        assert_eq!(json["results"][0]["sequence"], 2);
        assert_eq!(json["lastSeq"], 2);

        // An empty page echoes the cursor back
        let response = app
            .oneshot(get_request(&format!(
                "/api/conversations/{id}/messages?since=2"
            )))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["results"].as_array().unwrap().is_empty());
        assert_eq!(json["lastSeq"], 2);
    }

    #[tokio::test]
    async fn feedback_create_update_and_validation() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("the reply"));
        let created = create_conversation(&app, "{}").await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/conversations/{id}/messages"),
                r#"{"text":"question"}"#,
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        let ai_id = json["ai_message"]["id"].as_str().unwrap().to_string();
        let user_id = json["user_message"]["id"].as_str().unwrap().to_string();

        // Create
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/messages/{ai_id}/feedback"),
                r#"{"rating":true,"note":"spot on"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Update is idempotent on the same message
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/messages/{ai_id}/feedback"),
                r#"{"rating":false}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/messages/{ai_id}/feedback")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["rating"], false);
        assert_eq!(json["note"], "spot on");

        // User messages cannot receive feedback
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/messages/{user_id}/feedback"),
                r#"{"rating":true}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // No feedback on the user message
        let response = app
            .oneshot(get_request(&format!("/api/messages/{user_id}/feedback")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn insights_on_empty_store() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("should not run"));

        let response = app
            .oneshot(get_request("/api/insights?include_summary=false"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["usage"]["total_conversations"], 0);
        assert_eq!(json["feedback"]["total_feedback"], 0);
        assert_eq!(json["feedback"]["satisfaction_rate"], 0.0);
        assert!(json["themes"].as_array().unwrap().is_empty());
        assert!(json["quality_scores"]["average"].is_null());
        assert!(json["summary"].is_null());
    }

    #[tokio::test]
    async fn insights_includes_summary_by_default() {
        let (app, _tmp) = test_app(MockReplyGenerator::replying("Users are happy."));

        let response = app.oneshot(get_request("/api/insights")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["summary"], "Users are happy.");
    }
}
