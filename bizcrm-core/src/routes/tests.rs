use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::JwtKeys;
use crate::seed::seed_users;
use crate::storage::MemStorage;
use crate::{create_router, AppState};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

async fn test_app() -> Router {
    let storage = MemStorage::with_clock(fixed_now);
    seed_users(&storage, 4).await.unwrap();
    create_router(AppState::new(Arc::new(storage), JwtKeys::new("test-secret", 3600)))
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed for {}: {}", username, body);
    body["token"].as_str().unwrap().to_string()
}

async fn create_client(app: &Router, token: &str, company: &str) -> u64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/clients",
        Some(token),
        Some(json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": "+1-555-0100",
            "company": company,
            "address": "1 Main St"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_and_check_are_public() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(&app, Method::GET, "/api/auth/check", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_returns_user_and_token() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "manager", "password": "manager123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "manager");
    assert_eq!(body["role"], "manager");
    assert_eq!(body["name"], "Sales Manager");
    assert!(body["token"].as_str().is_some());
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "manager");
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Invalid credentials" }));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/leads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/leads", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let app = test_app().await;
    let engineer = login(&app, "engineer", "eng123").await;
    let client = login(&app, "client", "client123").await;
    let exec = login(&app, "exec", "exec123").await;

    let (status, _) = send(&app, Method::GET, "/api/invoices", Some(&engineer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/leads", Some(&client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::POST, "/api/quotations/1/approve", Some(&exec), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/users", Some(&exec), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/dashboard/metrics", Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_and_missing_ids() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;

    let (status, body) = send(&app, Method::GET, "/api/leads/abc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid id: abc" }));

    let (status, body) = send(&app, Method::GET, "/api/leads/999", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Lead not found" }));

    let (status, _) = send(&app, Method::POST, "/api/leads/999/convert", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, clients) = send(&app, Method::GET, "/api/clients", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clients, json!([]));
}

#[tokio::test]
async fn test_lead_lifecycle() {
    let app = test_app().await;
    let exec = login(&app, "exec", "exec123").await;

    let (status, lead) = send(
        &app,
        Method::POST,
        "/api/leads",
        Some(&exec),
        Some(json!({
            "name": "John Smith",
            "email": "john@techcorp.com",
            "phone": "+1-555-0101",
            "company": "TechCorp Inc",
            "source": "Cold Call",
            "assignedTo": "exec"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lead["status"], "New");
    assert_eq!(lead["assignedToName"], "Sales Executive");
    assert_eq!(lead["createdDate"], "2025-03-10");
    let id = lead["id"].as_u64().unwrap();

    let (status, lead) = send(
        &app,
        Method::POST,
        &format!("/api/leads/{}/notes", id),
        Some(&exec),
        Some(json!({ "text": "Called back" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["notes"][0]["user"], "exec");

    let (status, client) = send(&app, Method::POST, &format!("/api/leads/{}/convert", id), Some(&exec), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client["company"], "TechCorp Inc");
    assert_eq!(client["leadId"], id);

    let (status, _) = send(&app, Method::POST, &format!("/api/leads/{}/convert", id), Some(&exec), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/leads/{}", id), Some(&exec), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/leads/{}", id), Some(&exec), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lead_validation() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/leads",
        Some(&admin),
        Some(json!({
            "name": "Bad Email",
            "email": "not-an-email",
            "source": "Website",
            "assignedTo": "exec"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("email"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/leads",
        Some(&admin),
        Some(json!({
            "name": "Bad Source",
            "email": "bad@source.com",
            "source": "Billboard",
            "assignedTo": "exec"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quotation_to_payment_scenario() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;
    let accountant = login(&app, "accountant", "acc123").await;
    let client_id = create_client(&app, &admin, "Acme").await;

    let (status, quotation) = send(
        &app,
        Method::POST,
        "/api/quotations",
        Some(&admin),
        Some(json!({
            "clientId": client_id,
            "items": [{ "description": "Consulting", "quantity": 2, "unitPrice": 100 }],
            "taxRate": 18
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quotation["status"], "Draft");
    assert_eq!(quotation["clientName"], "Acme");
    assert_eq!(quotation["createdBy"], "admin");
    assert_eq!(quotation["subtotal"].as_f64(), Some(200.0));
    assert_eq!(quotation["taxAmount"].as_f64(), Some(36.0));
    assert_eq!(quotation["total"].as_f64(), Some(236.0));
    assert_eq!(quotation["items"][0]["amount"].as_f64(), Some(200.0));
    let quotation_id = quotation["id"].as_u64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/quotations/{}/generate-invoice", quotation_id),
        Some(&accountant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Quotation must be approved first" }));

    let (status, approved) = send(
        &app,
        Method::POST,
        &format!("/api/quotations/{}/approve", quotation_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "Approved");
    assert_eq!(approved["approvedBy"], "admin");
    assert_eq!(approved["approvedDate"], "2025-03-10");

    let (status, invoice) = send(
        &app,
        Method::POST,
        &format!("/api/quotations/{}/generate-invoice", quotation_id),
        Some(&accountant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["status"], "Generated");
    assert_eq!(invoice["dueDate"], "2025-04-09");
    assert_eq!(invoice["total"].as_f64(), Some(236.0));
    let invoice_id = invoice["id"].as_u64().unwrap();

    let (status, paid) = send(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/record-payment", invoice_id),
        Some(&accountant),
        Some(json!({
            "paymentAmount": 236,
            "paymentMethod": "Bank Transfer",
            "transactionRef": "TXN123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "Paid");
    assert_eq!(paid["paymentMethod"], "Bank Transfer");

    let (_, client) = send(&app, Method::GET, &format!("/api/clients/{}", client_id), Some(&admin), None).await;
    assert_eq!(client["totalRevenue"].as_f64(), Some(236.0));

    let (_, metrics) = send(&app, Method::GET, "/api/dashboard/metrics", Some(&admin), None).await;
    assert_eq!(metrics["totalRevenue"].as_f64(), Some(236.0));
    assert_eq!(metrics["quotationStatusDistribution"]["Approved"], 1);

    let (_, activities) = send(&app, Method::GET, "/api/dashboard/activities", Some(&admin), None).await;
    assert_eq!(activities[0]["action"], "recorded payment for invoice");
}

#[tokio::test]
async fn test_payment_validation() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/invoices/1/record-payment",
        Some(&admin),
        Some(json!({ "paymentAmount": 0, "paymentMethod": "Cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/invoices/1/record-payment",
        Some(&admin),
        Some(json!({ "paymentAmount": 10, "paymentMethod": "Barter" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_huge_amounts_are_rejected() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;
    let client_id = create_client(&app, &admin, "Acme").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/quotations",
        Some(&admin),
        Some(json!({
            "clientId": client_id,
            "items": [{ "description": "Big", "quantity": 1, "unitPrice": 1e28 }],
            "taxRate": 100
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body) = send(&app, Method::GET, "/api/quotations", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/invoices/1/record-payment",
        Some(&admin),
        Some(json!({ "paymentAmount": 1e28, "paymentMethod": "Cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_client_id_filter() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;
    let first = create_client(&app, &admin, "Acme").await;
    let second = create_client(&app, &admin, "Globex").await;

    for client_id in [first, second, second] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/quotations",
            Some(&admin),
            Some(json!({
                "clientId": client_id,
                "items": [{ "description": "Support", "quantity": 1, "unitPrice": 50 }],
                "taxRate": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, all) = send(&app, Method::GET, "/api/quotations", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, filtered) = send(
        &app,
        Method::GET,
        &format!("/api/quotations?clientId={}", second),
        Some(&admin),
        None,
    )
    .await;
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|q| q["clientId"] == second));

    let (status, _) = send(&app, Method::GET, "/api/quotations?clientId=abc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ticket_permissions_and_status() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;
    let client = login(&app, "client", "client123").await;
    let engineer = login(&app, "engineer", "eng123").await;
    let client_id = create_client(&app, &admin, "Acme").await;

    let (status, ticket) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(&client),
        Some(json!({
            "clientId": client_id,
            "title": "Email down",
            "description": "SMTP errors",
            "priority": "Critical",
            "assignedTo": "engineer"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "Open");
    assert_eq!(ticket["createdBy"], "client");
    let ticket_id = ticket["id"].as_u64().unwrap();

    let uri = format!("/api/tickets/{}/update-status", ticket_id);
    let (status, _) = send(&app, Method::POST, &uri, Some(&client), Some(json!({ "status": "Closed" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resolved) = send(&app, Method::POST, &uri, Some(&engineer), Some(json!({ "status": "Resolved" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "Resolved");
    assert_eq!(resolved["resolvedDate"], "2025-03-10");
}
