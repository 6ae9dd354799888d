
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use common::test_helpers::generate_unique_test_id;
use http_body_util::BodyExt;
use mocks::{InMemoryStore, SilentNotifier, StubProvider};
use orders::service::OrderService;
use serde_json::{json, Value};
use std::sync::Arc;
use store::api::{build_router, AppState};
use tower::ServiceExt;

struct TestApp {
    store: Arc<InMemoryStore>,
    router: Router,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(StubProvider),
        Arc::new(SilentNotifier),
    ));
    TestApp {
        store: store.clone(),
        router: build_router(AppState::new(service)),
    }
}

fn request(method: &str, uri: &str, user_id: i64, role: &str, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("x-user-id", user_id.to_string())
        .header("x-user-role", role);
    if body.is_some() {
        builder = builder.header("Content-Type", "application/json");
    }
    builder
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn order_body(address_id: i64, product_id: i64, quantity: i32) -> Value {
    json!({
        "shippingAddress": address_id,
        "orderItems": [{"product": product_id, "quantity": quantity}],
        "paymentMethod": "Cash on Delivery",
        "itemsPrice": 50.0,
        "taxPrice": 5.0,
        "shippingPrice": 10.0
    })
}

#[tokio::test]
async fn test_place_order_returns_created() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let response = app
        .router
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 2))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["totalPrice"], 65.0);
    assert_eq!(body["items"][0]["unitPrice"], 25.0);
    assert_eq!(app.store.stock_of(1), 8);
}

#[tokio::test]
async fn test_insufficient_stock_is_conflict() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 1);
    app.store.seed_address(5, user);

    let response = app
        .router
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 3))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Insufficient stock"));
    assert_eq!(app.store.stock_of(1), 1);
    assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
async fn test_empty_order_is_bad_request() {
    let app = test_app();
    let user = generate_unique_test_id();

    let body = json!({
        "shippingAddress": 5,
        "orderItems": [],
        "paymentMethod": "Card",
        "itemsPrice": 0.0,
        "taxPrice": 0.0,
        "shippingPrice": 0.0
    });
    let response = app
        .router
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = test_app();
    let response = app
        .router
        .oneshot(request("GET", "/api/v1/orders/999", 1, "customer", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_identity_is_forbidden() {
    let app = test_app();
    let req = Request::builder()
        .uri("/api/v1/orders")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_update_requires_staff_role() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 1))))
        .await
        .unwrap();
    let order_id = body_json(created).await["id"].as_i64().unwrap();

    let response = app
        .router
        .oneshot(request(
            "PUT",
            &format!("/api/v1/admin/orders/{order_id}"),
            user,
            "customer",
            Some(json!({"orderStatus": "Processing"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_ships_order_with_tracking() {
    let app = test_app();
    let user = generate_unique_test_id();
    let staff = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 1))))
        .await
        .unwrap();
    let order_id = body_json(created).await["id"].as_i64().unwrap();

    let response = app
        .router
        .oneshot(request(
            "PUT",
            &format!("/api/v1/admin/orders/{order_id}"),
            staff,
            "staff",
            Some(json!({
                "orderStatus": "Shipped",
                "shippingInfo": {"courier": "DHL", "trackingNumber": "TRK-9"}
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Shipped");
    assert_eq!(body["shippingInfo"]["courier"], "DHL");
    assert_eq!(body["shippingInfo"]["trackingNumber"], "TRK-9");
    assert!(!body["shippingInfo"]["shippedAt"].is_null());
    assert_eq!(body["updatedBy"].as_i64().unwrap(), staff);
}

#[tokio::test]
async fn test_unknown_status_word_is_bad_request() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 1))))
        .await
        .unwrap();
    let order_id = body_json(created).await["id"].as_i64().unwrap();

    let response = app
        .router
        .oneshot(request(
            "PUT",
            &format!("/api/v1/admin/orders/{order_id}"),
            generate_unique_test_id(),
            "staff",
            Some(json!({"orderStatus": "Teleported"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Unknown order status"));
}

#[tokio::test]
async fn test_customer_cancels_own_order() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 2))))
        .await
        .unwrap();
    let order_id = body_json(created).await["id"].as_i64().unwrap();
    assert_eq!(app.store.stock_of(1), 8);

    let response = app
        .router
        .oneshot(request(
            "PUT",
            &format!("/api/v1/orders/{order_id}"),
            user,
            "customer",
            Some(json!({"cancelOrder": true, "cancellationReason": "Changed my mind"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Cancelled");
    assert_eq!(body["cancellationReason"], "Changed my mind");
    assert_eq!(app.store.stock_of(1), 10);
}

#[tokio::test]
async fn test_refund_returns_order_and_refund() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let body = json!({
        "shippingAddress": 5,
        "orderItems": [{"product": 1, "quantity": 2}],
        "paymentMethod": "Card",
        "cardSource": "tok_visa",
        "itemsPrice": 50.0,
        "taxPrice": 5.0,
        "shippingPrice": 10.0
    });
    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(body)))
        .await
        .unwrap();
    let created_body = body_json(created).await;
    let order_id = created_body["id"].as_i64().unwrap();
    assert_eq!(created_body["payment"]["status"], "Paid");

    let response = app
        .router
        .oneshot(request(
            "POST",
            &format!("/api/v1/admin/orders/{order_id}/refund"),
            generate_unique_test_id(),
            "staff",
            Some(json!({"reason": "Damaged in transit"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["order"]["status"], "Cancelled");
    assert_eq!(body["order"]["payment"]["status"], "Refunded");
    assert_eq!(body["refund"]["chargeId"], "ch_test_1");
    assert_eq!(app.store.stock_of(1), 10);
}

#[tokio::test]
async fn test_refund_of_cod_order_is_bad_request() {
    let app = test_app();
    let user = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 1))))
        .await
        .unwrap();
    let order_id = body_json(created).await["id"].as_i64().unwrap();

    let response = app
        .router
        .oneshot(request(
            "POST",
            &format!("/api/v1/admin/orders/{order_id}/refund"),
            generate_unique_test_id(),
            "staff",
            Some(json!({})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_hides_order_from_customer() {
    let app = test_app();
    let user = generate_unique_test_id();
    let staff = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, user);

    let created = app
        .router
        .clone()
        .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(5, 1, 1))))
        .await
        .unwrap();
    let order_id = body_json(created).await["id"].as_i64().unwrap();

    let deleted = app
        .router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/admin/orders/{order_id}"),
            staff,
            "staff",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .oneshot(request(
            "GET",
            &format!("/api/v1/orders/{order_id}"),
            user,
            "customer",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_orders_is_scoped_to_customer() {
    let app = test_app();
    let alice = generate_unique_test_id();
    let bob = generate_unique_test_id();
    app.store.seed_product(1, "Lamp", 25.0, 10);
    app.store.seed_address(5, alice);
    app.store.seed_address(6, bob);

    for (user, address) in [(alice, 5), (bob, 6)] {
        let created = app
            .router
            .clone()
            .oneshot(request("POST", "/api/v1/orders", user, "customer", Some(order_body(address, 1, 1))))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
    }

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/v1/orders", alice, "customer", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["userId"].as_i64().unwrap(), alice);

    let staff_view = app
        .router
        .oneshot(request("GET", "/api/v1/orders", generate_unique_test_id(), "staff", None))
        .await
        .unwrap();
    let body = body_json(staff_view).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_and_list_addresses() {
    let app = test_app();
    let user = generate_unique_test_id();

    let created = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/addresses",
            user,
            "customer",
            Some(json!({
                "line1": "4 High Street",
                "city": "Springfield",
                "postalCode": "12345",
                "country": "US",
                "isDefault": true
            })),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = app
        .router
        .oneshot(request("GET", "/api/v1/addresses", user, "customer", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["isDefault"], true);
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let req = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
