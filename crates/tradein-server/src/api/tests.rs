use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_with(
    pool: PgPool,
    discounts: Option<Arc<ShopifyDiscountClient>>,
    auth: AuthState,
    rate_limit: RateLimitState,
) -> Router {
    build_app(
        AppState {
            pool,
            discounts,
            discount_prefix: "TRADEIN".to_string(),
        },
        auth,
        rate_limit,
    )
}

fn test_app(pool: PgPool) -> Router {
    let auth = AuthState::from_keys("", true).expect("auth");
    app_with(pool, None, auth, default_rate_limit_state())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

fn dec(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal is serialized as a string")
        .parse()
        .expect("decimal parse")
}

async fn create_option(app: &Router, category: &str, label: &str, device_type: Option<&str>) -> i64 {
    let (status, json) = send(
        app,
        Method::POST,
        &format!("/api/v1/admin/options/{category}"),
        Some(json!({ "label": label, "device_type": device_type })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create option: {json}");
    json["data"]["id"].as_i64().expect("option id")
}

async fn create_device(app: &Router, model_name: &str, options: Value) -> i64 {
    let (status, json) = send(
        app,
        Method::POST,
        "/api/v1/admin/devices",
        Some(json!({
            "vendor": "Apple",
            "device_type": "iphone",
            "model_name": model_name,
            "max_price": 1000,
            "options": options,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create device: {json}");
    json["data"]["id"].as_i64().expect("device id")
}

async fn device_row_percentage(app: &Router, model_name: &str, category: &str, option_id: i64) -> Decimal {
    let (status, json) = send(app, Method::GET, &format!("/api/v1/devices/{model_name}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let row = json["data"]["options"][category]
        .as_array()
        .expect("category rows")
        .iter()
        .find(|r| r["option_id"].as_i64() == Some(option_id))
        .expect("device row present");
    dec(&row["deduction_percentage"])
}

// ---------------------------------------------------------------------------
// Envelope and helpers (no DB)
// ---------------------------------------------------------------------------

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("conflict", StatusCode::CONFLICT),
        ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[test]
fn required_text_trims_and_bounds() {
    assert_eq!(required_text("r", "vendor", "  Apple ", 10).unwrap(), "Apple");
    assert!(required_text("r", "vendor", "   ", 10).is_err());
    assert!(required_text("r", "vendor", "abcdefghijk", 10).is_err());
}

// ---------------------------------------------------------------------------
// Health, request ids, auth, rate limiting
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_echoes_request_id(pool: PgPool) {
    let app = test_app(pool);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-abc")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[sqlx::test(migrations = "../../migrations")]
async fn admin_routes_require_bearer_token(pool: PgPool) {
    let auth = AuthState::from_keys("secret-key", false).expect("auth");
    let app = app_with(pool, None, auth, default_rate_limit_state());

    let (status, json) = send(&app, Method::DELETE, "/api/v1/admin/devices/1", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/v1/admin/devices/1")
                .header(header::AUTHORIZATION, "Bearer secret-key")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/api/v1/devices", None).await;
    assert_eq!(status, StatusCode::OK, "public routes stay open");
}

#[sqlx::test(migrations = "../../migrations")]
async fn rate_limit_applies_to_api_but_not_health(pool: PgPool) {
    let auth = AuthState::from_keys("", true).expect("auth");
    let app = app_with(
        pool,
        None,
        auth,
        RateLimitState::new(1, Duration::from_secs(60)),
    );

    let (first, _) = send(&app, Method::GET, "/api/v1/devices", None).await;
    let (second, json) = send(&app, Method::GET, "/api/v1/presets", None).await;
    let (health, _) = send(&app, Method::GET, "/api/v1/health", None).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");
    assert_eq!(health, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn option_list_filter_includes_generic_options(pool: PgPool) {
    let app = test_app(pool);
    create_option(&app, "fault", "Face ID", Some("iphone")).await;
    create_option(&app, "fault", "Stylus", Some("samsung")).await;
    create_option(&app, "fault", "Speaker", None).await;

    let (status, json) = send(&app, Method::GET, "/api/v1/options/fault?device_type=iphone", None).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = json["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|o| o["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["Face ID", "Speaker"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_option_category_is_not_found(pool: PgPool) {
    let app = test_app(pool);
    let (status, json) = send(&app, Method::GET, "/api/v1/options/hinge", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_option_label_conflicts(pool: PgPool) {
    let app = test_app(pool);
    create_option(&app, "repair", "Screen replaced", None).await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/admin/options/repair",
        Some(json!({ "label": "Screen replaced" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[sqlx::test(migrations = "../../migrations")]
async fn option_update_can_clear_header(pool: PgPool) {
    let app = test_app(pool);
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/v1/admin/options/back",
        Some(json!({ "label": "Cracked", "header": "Back glass" })),
    )
    .await;
    let id = created["data"]["id"].as_i64().expect("id");

    let (status, json) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/options/back/{id}"),
        Some(json!({ "header": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["header"].is_null());
    assert_eq!(json["data"]["label"], "Cracked");
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn created_device_round_trips_by_model_name(pool: PgPool) {
    let app = test_app(pool);
    create_device(&app, "iPhone 13", json!({})).await;

    let (status, json) = send(&app, Method::GET, "/api/v1/devices/iPhone%2013", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["model_name"], "iPhone 13");
    assert_eq!(dec(&json["data"]["max_price"]), Decimal::new(1000, 0));

    let options = json["data"]["options"].as_object().expect("options map");
    assert_eq!(options.len(), tradein_core::OptionCategory::ALL.len());
    assert!(options.values().all(|rows| rows.as_array().is_some_and(Vec::is_empty)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_device_drops_unknown_option_ids(pool: PgPool) {
    let app = test_app(pool);
    let known = create_option(&app, "fault", "Face ID", None).await;

    create_device(
        &app,
        "iPhone 14",
        json!({ "fault": [known, 999_999, known] }),
    )
    .await;

    let (_, json) = send(&app, Method::GET, "/api/v1/devices/iPhone%2014", None).await;
    let rows = json["data"]["options"]["fault"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["option_id"].as_i64(), Some(known));
    assert_eq!(dec(&rows[0]["deduction_percentage"]), Decimal::ZERO);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_device_model_name_conflicts(pool: PgPool) {
    let app = test_app(pool);
    create_device(&app, "Galaxy S22", json!({})).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/admin/devices",
        Some(json!({
            "vendor": "Samsung",
            "device_type": "samsung",
            "model_name": "Galaxy S22",
            "max_price": 500,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../migrations")]
async fn device_update_preserves_tuned_deductions(pool: PgPool) {
    let app = test_app(pool);
    let face_id = create_option(&app, "fault", "Face ID", None).await;
    let speaker = create_option(&app, "fault", "Speaker", None).await;
    let id = create_device(&app, "iPhone 15", json!({ "fault": [face_id] })).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/devices/{id}/device-details"),
        Some(json!({ "fault": [{ "option_id": face_id, "deduction_percentage": 15 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Attribute-only update leaves the rows alone.
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/devices/{id}"),
        Some(json!({ "max_price": 1100 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        device_row_percentage(&app, "iPhone%2015", "fault", face_id).await,
        Decimal::new(15, 0)
    );

    // Re-sending the references keeps 15% and adds the new one at 0%.
    let (status, json) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/devices/{id}"),
        Some(json!({ "options": { "fault": [face_id, speaker] } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["options"]["fault"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        device_row_percentage(&app, "iPhone%2015", "fault", face_id).await,
        Decimal::new(15, 0)
    );
    assert_eq!(
        device_row_percentage(&app, "iPhone%2015", "fault", speaker).await,
        Decimal::ZERO
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn device_details_can_reset_to_zero_and_ignore_unknown_rows(pool: PgPool) {
    let app = test_app(pool);
    let option = create_option(&app, "battery_health", "Below 80%", None).await;
    let id = create_device(&app, "iPad Air", json!({ "battery_health": [option] })).await;
    let uri = format!("/api/v1/admin/devices/{id}/device-details");

    send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "battery_health": [{ "option_id": option, "deduction_percentage": 30 }] })),
    )
    .await;

    let (status, json) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({
            "battery_health": [
                { "option_id": option, "deduction_percentage": 0 },
                { "option_id": 424_242, "deduction_percentage": 50 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["rows_updated"].as_u64(), Some(1));
    assert_eq!(
        device_row_percentage(&app, "iPad%20Air", "battery_health", option).await,
        Decimal::ZERO
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn device_details_rejects_out_of_range_percentage(pool: PgPool) {
    let app = test_app(pool);
    let id = create_device(&app, "Watch S9", json!({})).await;

    let (status, json) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/devices/{id}/device-details"),
        Some(json!({ "strap": [{ "option_id": 1, "deduction_percentage": 120 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn device_details_rejects_sub_cent_percentage(pool: PgPool) {
    let app = test_app(pool);
    let option = create_option(&app, "side", "Scuffed", None).await;
    let id = create_device(&app, "iPhone 16", json!({ "side": [option] })).await;

    let (status, json) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/devices/{id}/device-details"),
        Some(json!({ "side": [{ "option_id": option, "deduction_percentage": "12.345" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(
        device_row_percentage(&app, "iPhone%2016", "side", option).await,
        Decimal::ZERO
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_device_rejects_price_beyond_column(pool: PgPool) {
    let app = test_app(pool);
    for max_price in ["10000000000", "999.999"] {
        let (status, json) = send(
            &app,
            Method::POST,
            "/api/v1/admin/devices",
            Some(json!({
                "vendor": "Apple",
                "device_type": "iphone",
                "model_name": "iPhone Max",
                "max_price": max_price,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "max_price {max_price}");
        assert_eq!(json["error"]["code"], "validation_error");
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleted_device_is_gone(pool: PgPool) {
    let app = test_app(pool);
    let id = create_device(&app, "MacBook Air", json!({})).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/admin/devices/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/api/v1/devices/MacBook%20Air", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn applying_preset_copies_matching_deductions(pool: PgPool) {
    let app = test_app(pool);
    let worn = create_option(&app, "battery_health", "Below 80%", None).await;
    let other = create_option(&app, "battery_health", "Service", None).await;
    let id = create_device(&app, "iPhone 12", json!({ "battery_health": [worn] })).await;

    let (status, preset) = send(
        &app,
        Method::POST,
        "/api/v1/admin/presets",
        Some(json!({
            "model_name": "iPhone 12 preset",
            "vendor": "Apple",
            "device_type": "iphone",
            "options": {
                "battery_health": [
                    { "option_id": worn, "deduction_percentage": 20 },
                    { "option_id": other, "deduction_percentage": 35 }
                ]
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create preset: {preset}");
    let preset_id = preset["data"]["id"].as_i64().expect("preset id");

    let (status, json) = send(
        &app,
        Method::POST,
        &format!("/api/v1/admin/devices/{id}/apply-preset"),
        Some(json!({ "preset_id": preset_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["rows_updated"].as_u64(), Some(1));

    let rows = json["data"]["device"]["options"]["battery_health"]
        .as_array()
        .expect("rows");
    assert_eq!(rows.len(), 1, "preset application never adds rows");
    assert_eq!(dec(&rows[0]["deduction_percentage"]), Decimal::new(20, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn applying_missing_preset_is_not_found(pool: PgPool) {
    let app = test_app(pool);
    let id = create_device(&app, "iPhone 11", json!({})).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/admin/devices/{id}/apply-preset"),
        Some(json!({ "preset_id": 77 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn preset_lookup_by_model_name(pool: PgPool) {
    let app = test_app(pool);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/admin/presets",
        Some(json!({ "model_name": "Galaxy", "vendor": "Samsung", "device_type": "samsung" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, Method::GET, "/api/v1/presets/Galaxy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["vendor"], "Samsung");

    let (_, json) = send(&app, Method::GET, "/api/v1/presets?device_type=iphone", None).await;
    assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn quote_sums_device_deductions(pool: PgPool) {
    let app = test_app(pool);
    let cracked = create_option(&app, "front_screen", "Cracked", None).await;
    let scuffed = create_option(&app, "side", "Scuffed", None).await;
    let unattached = create_option(&app, "side", "Dented", None).await;
    let id = create_device(
        &app,
        "iPhone 13 Pro",
        json!({ "front_screen": [cracked], "side": [scuffed] }),
    )
    .await;

    send(
        &app,
        Method::PUT,
        &format!("/api/v1/admin/devices/{id}/device-details"),
        Some(json!({
            "front_screen": [{ "option_id": cracked, "deduction_percentage": 20 }],
            "side": [{ "option_id": scuffed, "deduction_percentage": 5 }]
        })),
    )
    .await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/quotes",
        Some(json!({
            "model_name": "iPhone 13 Pro",
            "selections": { "front_screen": [cracked], "side": [scuffed, unattached] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&json["data"]["total_deduction_percentage"]), Decimal::new(25, 0));
    assert_eq!(dec(&json["data"]["final_price"]), Decimal::new(750, 0));
    assert_eq!(json["data"]["applied"].as_array().map(Vec::len), Some(2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn quote_for_unknown_device_is_not_found(pool: PgPool) {
    let app = test_app(pool);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/quotes",
        Some(json!({ "model_name": "Nokia 3310" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Trade-ins
// ---------------------------------------------------------------------------

fn trade_in_body() -> Value {
    json!({
        "product_model": "iPhone 13",
        "trade_in_value": 750,
        "max_price": 1000,
        "storage": "128GB",
        "conditions": { "front_screen": "Cracked" }
    })
}

fn shopify_client(server: &MockServer) -> Option<Arc<ShopifyDiscountClient>> {
    Some(Arc::new(
        ShopifyDiscountClient::new(&server.uri(), "shpat_test", "2024-01", 5)
            .expect("shopify client"),
    ))
}

#[sqlx::test(migrations = "../../migrations")]
async fn trade_in_issues_code_and_persists_submission(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/api/2024-01/price_rules.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "price_rule": { "id": 9001 } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/api/2024-01/price_rules/9001/discount_codes.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "discount_code": { "id": 1, "price_rule_id": 9001, "code": "TRADEIN-HJK23456" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthState::from_keys("", true).expect("auth");
    let app = app_with(pool.clone(), shopify_client(&server), auth, default_rate_limit_state());

    let (status, json) = send(&app, Method::POST, "/api/v1/trade-ins", Some(trade_in_body())).await;
    assert_eq!(status, StatusCode::CREATED, "trade-in: {json}");
    assert_eq!(json["data"]["discount_code"], "TRADEIN-HJK23456");
    assert_eq!(tradein_db::count_submissions(&pool).await.expect("count"), 1);

    let (_, listed) = send(&app, Method::GET, "/api/v1/admin/trade-ins", None).await;
    let row = &listed["data"][0];
    assert_eq!(row["price_rule_id"].as_i64(), Some(9001));
    assert_eq!(row["conditions"]["front_screen"], "Cracked");
}

#[sqlx::test(migrations = "../../migrations")]
async fn trade_in_price_rule_failure_persists_nothing(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/api/2024-01/price_rules.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthState::from_keys("", true).expect("auth");
    let app = app_with(pool.clone(), shopify_client(&server), auth, default_rate_limit_state());

    let (status, json) = send(&app, Method::POST, "/api/v1/trade-ins", Some(trade_in_body())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "internal_error");
    assert_eq!(tradein_db::count_submissions(&pool).await.expect("count"), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trade_in_rejects_non_positive_value(pool: PgPool) {
    let app = test_app(pool.clone());
    let mut body = trade_in_body();
    body["trade_in_value"] = json!(0);

    let (status, json) = send(&app, Method::POST, "/api/v1/trade-ins", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(tradein_db::count_submissions(&pool).await.expect("count"), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trade_in_value_that_cannot_be_stored_never_reaches_shopify(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let auth = AuthState::from_keys("", true).expect("auth");
    let app = app_with(pool.clone(), shopify_client(&server), auth, default_rate_limit_state());

    for value in ["0.001", "123456789012.50", "10.005"] {
        let mut body = trade_in_body();
        body["trade_in_value"] = json!(value);

        let (status, json) = send(&app, Method::POST, "/api/v1/trade-ins", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "trade_in_value {value}");
        assert_eq!(json["error"]["code"], "validation_error");
    }

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert_eq!(tradein_db::count_submissions(&pool).await.expect("count"), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trade_in_without_shopify_is_unavailable(pool: PgPool) {
    let app = test_app(pool);
    let (status, _) = send(&app, Method::POST, "/api/v1/trade-ins", Some(trade_in_body())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
