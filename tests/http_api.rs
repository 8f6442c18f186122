// tests/http_api.rs

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{item, requestor, reviewer, Harness};
use http_body_util::BodyExt;
use lab_requisitions::{models::borrow::ApprovePayload, routes};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    routes::router(h.state.clone())
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_needs_no_token() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthorized() {
    let h = Harness::new();
    let app = app(&h);

    let (status, body) = send(&app, Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");

    let (status, _) = send(&app, Method::GET, "/api/cart", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requestors_cannot_open_the_review_queue() {
    let h = Harness::new();
    let token = h.token(&requestor("Alice"));

    let (status, body) = send(&app(&h), Method::GET, "/api/review/queue", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn missing_metadata_is_a_bad_request() {
    let h = Harness::new();
    let token = h.token(&requestor("Alice"));

    let (status, body) = send(
        &app(&h),
        Method::POST,
        "/api/requisitions",
        Some(&token),
        Some(json!({ "program": "BS Medical Technology", "room": "LAB-3" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "dateRequired");
}

#[tokio::test]
async fn duplicate_cart_line_is_a_conflict() {
    let h = Harness::new();
    let pipette = item("Pipette", "PIP-001");
    h.seed(&pipette).await;
    let token = h.token(&requestor("Alice"));
    let app = app(&h);

    let line = json!({ "inventoryItemId": pipette.id, "quantity": 2 });
    let (status, _) = send(&app, Method::POST, "/api/cart/lines", Some(&token), Some(line.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/api/cart/lines", Some(&token), Some(line)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_LINE");
}

#[tokio::test]
async fn invalid_return_lines_name_the_offending_entry() {
    let h = Harness::new();
    let slide = item("Slide", "GLS-010");
    let alice = requestor("Alice");
    let custodian = reviewer("Custodian");
    h.fill_cart(&alice, &[(&slide, 2)]).await;
    let requisition = h.submit(&alice).await;
    let outcome = h
        .state
        .approval_service
        .approve(
            &custodian,
            requisition.id,
            ApprovePayload {
                selected_item_ids: vec![slide.id],
                selection_id: None,
            },
        )
        .await
        .unwrap();
    h.state
        .reconciliation_service
        .mark_borrowed(&custodian, outcome.selection.id)
        .await
        .unwrap();

    let (status, body) = send(
        &app(&h),
        Method::POST,
        &format!("/api/borrows/{}/returns", outcome.selection.id),
        Some(&h.token(&custodian)),
        Some(json!({ "returns": [{ "itemId": slide.id, "quantity": 1, "condition": "" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["returns[0].condition"][0], "A condição do item é obrigatória.");
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let h = Harness::new();
    let scope = item("Microscope", "MED-002");
    let slide = item("Slide", "GLS-010");
    h.seed(&scope).await;
    h.seed(&slide).await;

    let alice = requestor("Alice");
    let alice_token = h.token(&alice);
    let custodian_token = h.token(&reviewer("Custodian"));
    let app = app(&h);

    // 1. Catálogo e carrinho
    let (status, items) = send(&app, Method::GET, "/api/inventory/items?search=gls", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().unwrap().len(), 1);

    for (id, quantity) in [(scope.id, 1), (slide.id, 5)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/cart/lines",
            Some(&alice_token),
            Some(json!({ "inventoryItemId": id, "quantity": quantity })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // 2. Submissão
    let (status, receipt) = send(
        &app,
        Method::POST,
        "/api/requisitions",
        Some(&alice_token),
        Some(json!({
            "dateRequired": "2025-10-06",
            "program": "BS Medical Technology",
            "room": "LAB-3",
            "reason": "Hematology practical"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["requisition"]["status"], "PENDING");
    let requisition_id = receipt["requisition"]["id"].as_str().unwrap().to_string();

    let (_, cart) = send(&app, Method::GET, "/api/cart", Some(&alice_token), None).await;
    assert!(cart.as_array().unwrap().is_empty());

    // 3. Aprovação parcial e rejeição do restante
    let (status, queue) = send(&app, Method::GET, "/api/review/queue", Some(&custodian_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, approval) = send(
        &app,
        Method::POST,
        &format!("/api/review/requisitions/{}/approve", requisition_id),
        Some(&custodian_token),
        Some(json!({ "selectedItemIds": [slide.id] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(approval["requisition"]["status"], "PARTIALLY_APPROVED");
    assert_eq!(approval["selection"]["approvedLines"][0]["itemCode"], "GLS-010");
    let selection_id = approval["selection"]["id"].as_str().unwrap().to_string();

    let (status, rejected) = send(
        &app,
        Method::POST,
        &format!("/api/review/requisitions/{}/reject", requisition_id),
        Some(&custodian_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "REJECTED");

    // 4. Empréstimo e devoluções
    let (status, borrowed) = send(
        &app,
        Method::POST,
        &format!("/api/borrows/{}/borrowed", selection_id),
        Some(&custodian_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(borrowed["status"], "BORROWED");

    let returns_uri = format!("/api/borrows/{}/returns", selection_id);
    let (status, partial) = send(
        &app,
        Method::POST,
        &returns_uri,
        Some(&custodian_token),
        Some(json!({ "returns": [{ "itemId": slide.id, "quantity": 3, "condition": "Good" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(partial["selection"]["status"], "BORROWED");

    let (status, over) = send(
        &app,
        Method::POST,
        &returns_uri,
        Some(&custodian_token),
        Some(json!({ "returns": [{ "itemId": slide.id, "quantity": 3, "condition": "Good" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(over["code"], "OVER_RETURN");

    let (status, done) = send(
        &app,
        Method::POST,
        &returns_uri,
        Some(&custodian_token),
        Some(json!({ "returns": [{ "itemId": slide.id, "quantity": 2, "condition": "Good" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["selection"]["status"], "RETURNED");

    // 5. Visão do solicitante
    let (status, overview) = send(&app, Method::GET, "/api/me/overview", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let stages: Vec<&str> = overview
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["stage"].as_str().unwrap())
        .collect();
    assert_eq!(stages, vec!["requisition", "approvedSelection"]);

    let (status, activity) = send(&app, Method::GET, "/api/me/activity", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let recorded: Vec<&str> = activity
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        recorded,
        vec![
            "Returned Items",
            "Returned Items",
            "Borrowed Items",
            "Rejected Request",
            "Approved Items",
            "Requested Items"
        ]
    );
}
