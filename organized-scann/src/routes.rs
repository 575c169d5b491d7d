//! Router assembly

use axum::{
    http::{StatusCode, Uri},
    middleware::{from_fn_with_state, map_response},
    response::Response,
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    auth::{require_admin, require_identity},
    error::ErrorResponse,
    handlers::{auth, predictions, resource},
    health,
    middleware::{
        cors_layer, json_error_body, panic_response, request_id_layer,
        request_id_propagation_layer, sensitive_headers_layer,
    },
    models::{Motorcycle, Portal, User},
    state::AppState,
};

/// Unknown routes
async fn fallback(uri: Uri) -> Response {
    ErrorResponse::with_code(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("No route for {}", uri.path()),
    )
    .into_http()
}

/// Full application router with middleware
///
/// Layers run outermost first: CORS, request id, sensitive header masking,
/// tracing, JSON error bodies, timeout, body limit, panic recovery.
pub fn build_router(state: AppState) -> Router {
    let config = state.config().clone();
    let tokens = state.tokens().clone();

    let users = resource::routes::<User>()
        .route_layer(from_fn_with_state(tokens.clone(), require_admin));
    let predictions = predictions::routes()
        .route_layer(from_fn_with_state(tokens, require_identity));

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(resource::routes::<Motorcycle>())
        .merge(resource::routes::<Portal>())
        .merge(users)
        .merge(auth::routes())
        .merge(predictions)
        .fallback(fallback)
        .with_state(state);

    let router = if config.middleware.catch_panic {
        router.layer(CatchPanicLayer::custom(panic_response))
    } else {
        router
    };

    router
        .layer(RequestBodyLimitLayer::new(
            config.middleware.body_limit_mb.saturating_mul(1024 * 1024),
        ))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(map_response(json_error_body))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(sensitive_headers_layer())
        .layer(request_id_propagation_layer(&config.middleware))
        .layer(request_id_layer(&config.middleware))
        .layer(cors_layer(&config.middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        app_with(Config::default())
    }

    fn app_with(config: Config) -> Router {
        build_router(AppState::in_memory(config).unwrap())
    }

    /// Router whose registration honors the requested role
    fn open_registration_app() -> Router {
        let mut config = Config::default();
        config.registration.allow_role_selection = true;
        app_with(config)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn get(app: &Router, uri: &str) -> Response {
        send(app, Method::GET, uri, None, None).await
    }

    async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response {
        send(app, Method::POST, uri, token, Some(body)).await
    }

    async fn put(app: &Router, uri: &str, body: Value) -> Response {
        send(app, Method::PUT, uri, None, Some(body)).await
    }

    async fn body_bytes(response: Response) -> axum::body::Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn get_json(app: &Router, uri: &str) -> Value {
        let response = get(app, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        body_json(response).await
    }

    fn motorcycle(plate: &str, brand: &str, year: i32, days: i64) -> Value {
        json!({
            "licensePlate": plate,
            "rfid": format!("RFID-{plate}"),
            "problemDescription": "Oil leak",
            "portalId": 1,
            "entryDate": "2024-05-01T08:00:00Z",
            "availabilityForecast": format!("2024-05-{:02}T08:00:00Z", 1 + days),
            "brand": brand,
            "year": year
        })
    }

    async fn seed_two(app: &Router) {
        for body in [
            motorcycle("HND2022", "Honda", 2022, 3),
            motorcycle("YMH2021", "Yamaha", 2021, 5),
        ] {
            let response = post(app, "/api/motorcycles", None, body).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }

    async fn register(app: &Router, email: &str, role: Value) -> Response {
        let body = json!({
            "name": "Yard Operator",
            "email": email,
            "password": "Password123",
            "role": role
        });
        post(app, "/api/v1/auth/register", None, body).await
    }

    async fn token_for(app: &Router, email: &str, role: Value) -> String {
        let response = register(app, email, role).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_list_pages_seeded_records() {
        let app = app();
        seed_two(&app).await;

        let body = get_json(&app, "/api/motorcycles?pageNumber=1&pageSize=1").await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["totalPages"], 2);
        assert_eq!(body["data"]["pageNumber"], 1);
        assert_eq!(body["data"]["pageSize"], 1);
        assert_eq!(body["data"]["items"][0]["brand"], "Honda");

        assert_eq!(
            body["links"],
            json!([
                {
                    "rel": "self",
                    "href": "/api/motorcycles?pageNumber=1&pageSize=1",
                    "method": "GET"
                },
                {"rel": "create", "href": "/api/motorcycles", "method": "POST"}
            ])
        );
    }

    #[tokio::test]
    async fn test_list_filters_and_clamps() {
        let app = app();
        seed_two(&app).await;

        let body = get_json(&app, "/api/motorcycles?brand=Honda").await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["licensePlate"], "HND2022");

        let body = get_json(&app, "/api/motorcycles?brand=%20%20&year=2021").await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["brand"], "Yamaha");

        let body = get_json(&app, "/api/motorcycles?pageNumber=0&pageSize=1000").await;
        assert_eq!(body["data"]["pageNumber"], 1);
        assert_eq!(body["data"]["pageSize"], 100);
        assert_eq!(body["data"]["totalPages"], 1);

        let body = get_json(&app, "/api/motorcycles?pageNumber=5&pageSize=1").await;
        assert_eq!(body["data"]["total"], 2);
        assert!(body["data"]["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_integer_filter_is_bad_request() {
        let response = get(&app(), "/api/motorcycles?year=recent").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_record_is_bare_404() {
        let response = get(&app(), "/api/motorcycles/999999").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_crud_lifecycle() {
        let app = app();

        let portal = json!({"type": "REPAIR", "name": "North gate"});
        let response = post(&app, "/api/portals", None, portal).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/api/portals/1");
        let created = body_json(response).await;
        assert_eq!(created, json!({"id": 1, "type": "REPAIR", "name": "North gate"}));

        let body = get_json(&app, "/api/portals/1").await;
        assert_eq!(body["data"]["name"], "North gate");
        let rels: Vec<_> = body["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| (l["rel"].as_str().unwrap(), l["method"].as_str().unwrap()))
            .collect();
        assert_eq!(rels, vec![("self", "GET"), ("update", "PUT"), ("delete", "DELETE")]);

        let replacement = json!({"type": "POLICE", "name": "South gate"});
        let response = put(&app, "/api/portals/1", replacement.clone()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = put(&app, "/api/portals/42", replacement).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = get_json(&app, "/api/portals?type=police").await;
        assert_eq!(body["data"]["total"], 1);

        let response = send(&app, Method::DELETE, "/api/portals/1", None, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, Method::DELETE, "/api/portals/1", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_payloads() {
        let app = app();

        let mut body = motorcycle("BAD0001", "Honda", 2020, 2);
        body["availabilityForecast"] = json!("2024-04-01T08:00:00Z");
        let response = post(&app, "/api/motorcycles", None, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "availabilityForecast must not be earlier than entryDate"
        );

        let portal = json!({"type": "CAR_WASH", "name": "x"});
        let response = post(&app, "/api/portals", None, portal).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get(&app, "/api/portals/abc").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_plate_is_conflict() {
        let app = app();
        seed_two(&app).await;
        let duplicate = motorcycle("HND2022", "Honda", 2020, 1);
        let response = post(&app, "/api/motorcycles", None, duplicate).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "License plate is already registered");
    }

    #[tokio::test]
    async fn test_oversized_body_gets_json_413() {
        let mut config = Config::default();
        config.middleware.body_limit_mb = 0;
        let app = app_with(config);
        let payload = motorcycle("BIG0001", "Honda", 2020, 1).to_string();

        let declared = Request::post("/api/motorcycles")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, payload.len())
            .body(Body::from(payload.clone()))
            .unwrap();
        let streamed = Request::post("/api/motorcycles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .unwrap();

        for request in [declared, streamed] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
            let body = body_json(response).await;
            assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
            assert_eq!(body["status"], 413);
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let app = app();

        let response = register(&app, "rider@scann.io", json!(0)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["email"], "rider@scann.io");
        assert_eq!(body["role"], "USER");
        assert!(!body["token"].as_str().unwrap().is_empty());

        let response = register(&app, "rider@scann.io", json!(0)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Email is already in use");

        let login = json!({"email": "rider@scann.io", "password": "Password123"});
        let response = post(&app, "/api/v1/auth/login", None, login).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["role"], "USER");

        let wrong = json!({"email": "rider@scann.io", "password": "nope-nope"});
        let response = post(&app, "/api/v1/auth/login", None, wrong).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let wrong_password = body_json(response).await["error"].clone();

        let unknown = json!({"email": "ghost@scann.io", "password": "Password123"});
        let response = post(&app, "/api/v1/auth/login", None, unknown).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], wrong_password);
    }

    #[tokio::test]
    async fn test_self_registration_cannot_claim_admin_by_default() {
        let app = app();

        let response = register(&app, "mallory@scann.io", json!("ADMIN")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["role"], "USER");

        let token = body["token"].as_str().unwrap();
        let response = send(&app, Method::GET, "/api/users", Some(token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_users_require_admin() {
        let app = open_registration_app();

        let response = get(&app, "/api/users").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let user = token_for(&app, "user@scann.io", json!("USER")).await;
        let response = send(&app, Method::GET, "/api/users", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = token_for(&app, "admin@scann.io", json!(3)).await;
        let response = send(&app, Method::GET, "/api/users?role=admin", Some(&admin), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 1);
        let listed = &body["data"]["items"][0];
        assert_eq!(listed["email"], "admin@scann.io");
        assert!(listed.get("passwordHash").is_none());
        assert!(listed.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn test_predictions() {
        const TIME: &str = "/api/v1/predictions/maintenance-time";
        const PATTERNS: &str = "/api/v1/predictions/maintenance-patterns";
        let app = app();

        let request = json!({"year": 2021, "brand": "Kawasaki"});
        let response = post(&app, TIME, None, request.clone()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = token_for(&app, "analyst@scann.io", json!("OPERATOR")).await;

        let response = post(&app, TIME, Some(&token), request.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        seed_two(&app).await;
        let response = post(&app, TIME, Some(&token), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["predictedDays"].as_f64().unwrap() >= 0.0);
        assert!(body["estimatedCompletionDate"].is_string());
        assert!(["High", "Medium", "Low"].contains(&body["confidence"].as_str().unwrap()));

        let response = send(&app, Method::GET, PATTERNS, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bmw = motorcycle("BMW1999", "BMW", 1999, 9);
        assert_eq!(post(&app, "/api/motorcycles", None, bmw).await.status(), StatusCode::CREATED);
        let response = send(&app, Method::GET, PATTERNS, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["totalMotorcycles"], 3);
        assert_eq!(body["clusters"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app();

        let body = get_json(&app, "/health").await;
        assert_eq!(body["status"], "Healthy");
        assert_eq!(body["checks"].as_array().unwrap().len(), 2);

        get_json(&app, "/health/live").await;

        let body = get_json(&app, "/health/ready").await;
        assert_eq!(body["checks"][0]["name"], "database");
    }

    #[tokio::test]
    async fn test_unknown_route_and_request_id() {
        let response = get(&app(), "/api/garages").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_public_url_links() {
        let mut config = Config::default();
        config.service.public_url = Some("https://scann.example.com/yard".to_string());
        let app = app_with(config);

        let portal = json!({"type": "REPAIR", "name": "Gate"});
        let response = post(&app, "/api/portals", None, portal).await;
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://scann.example.com/yard/api/portals/1"
        );
    }
}
