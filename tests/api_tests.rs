//! End-to-end tests of the HTTP surface through the real router

use aws_cost_advisor::{
    analysis::{EstimatorConfig, SubscriptionPlan},
    config::{ApiKeyConfig, Config, HistoryConfig, MetricsConfig, ServerConfig, UploadConfig},
    handlers::AppState,
    history::HistoryStore,
    server::create_router,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;

const STARTER_KEY: &str = "sk-starter-test-0001";
const ENTERPRISE_KEY: &str = "sk-enterprise-test-0002";
const BOUNDARY: &str = "cost-advisor-boundary";

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            cors_origins: vec![],
        },
        api_keys: vec![
            ApiKeyConfig {
                key: STARTER_KEY.to_string(),
                name: "starter".to_string(),
                enabled: true,
                plan: SubscriptionPlan::Starter,
            },
            ApiKeyConfig {
                key: ENTERPRISE_KEY.to_string(),
                name: "enterprise".to_string(),
                enabled: true,
                plan: SubscriptionPlan::Enterprise,
            },
        ],
        estimator: EstimatorConfig::default(),
        upload: UploadConfig {
            max_file_bytes: 64 * 1024,
        },
        metrics: MetricsConfig { enabled: false },
        history: HistoryConfig {
            enabled: false,
            database_url: "sqlite::memory:".to_string(),
        },
    }
}

fn app() -> Router {
    let config = test_config();
    let limit = config.upload.max_file_bytes;
    create_router(AppState::new(config), None, limit)
}

async fn app_with_history() -> Router {
    let config = test_config();
    let limit = config.upload.max_file_bytes;
    let history = HistoryStore::connect("sqlite::memory:").await.unwrap();
    create_router(AppState::new(config).with_history(Arc::new(history)), None, limit)
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    send_to(app(), request).await
}

async fn send_to(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn analyze_request(key: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", key))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(key: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload-billing")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header("authorization", format!("Bearer {}", key))
        .body(Body::from(body))
        .unwrap()
}

fn amount(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("amounts serialize as strings")).unwrap()
}

#[tokio::test]
async fn analyze_web_workload() {
    let (status, body) = send(analyze_request(
        STARTER_KEY,
        json!({
            "monthly_bill": 1250,
            "services": ["EC2", "S3", "RDS", "CloudFront"],
            "region": "us-east-1",
            "workload_type": "web",
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["current_bill"]), dec!(1250));
    assert_eq!(amount(&body["potential_savings"]), dec!(468.75));
    assert_eq!(amount(&body["optimized_bill"]), dec!(781.25));
    assert_eq!(amount(&body["confidence_score"]), dec!(0.95));
    assert_eq!(body["workload_type"], "web");
    assert_eq!(body["region"], "us-east-1");

    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 5);
    assert_eq!(recommendations[0]["title"], "RDS Reserved Instances");
    assert_eq!(recommendations[0]["priority"], "High");

    let breakdown = body["service_breakdown"].as_object().unwrap();
    assert_eq!(amount(&breakdown["EC2"]), dec!(500));
    assert_eq!(amount(&breakdown["Other Services"]), dec!(187.5));
}

#[tokio::test]
async fn analyze_plan_comes_from_api_key() {
    let request = |key| analyze_request(key, json!({"monthly_bill": "5000", "services": ["EC2"]}));

    let (_, starter) = send(request(STARTER_KEY)).await;
    let (_, enterprise) = send(request(ENTERPRISE_KEY)).await;

    let has_auto_scaling = |body: &Value| {
        body["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["title"] == "Auto Scaling Groups")
    };
    assert!(!has_auto_scaling(&starter));
    assert!(has_auto_scaling(&enterprise));
    assert!(amount(&enterprise["confidence_score"]) > amount(&starter["confidence_score"]));
}

#[tokio::test]
async fn analyze_validation_errors_are_400() {
    for body in [
        json!({"monthly_bill": 0}),
        json!({"monthly_bill": -20, "services": ["EC2"]}),
        json!({"monthly_bill": "abc"}),
        json!({"services": ["EC2"]}),
    ] {
        let (status, response) = send(analyze_request(STARTER_KEY, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response["error"]["type"], "validation_error");
    }

    let (_, response) = send(analyze_request(STARTER_KEY, json!({"monthly_bill": 0}))).await;
    assert_eq!(
        response["error"]["message"],
        "Monthly bill must be greater than $0"
    );
}

#[tokio::test]
async fn analyze_malformed_json_is_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", STARTER_KEY))
        .body(Body::from("{\"monthly_bill\": "))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "bad_request");
}

#[tokio::test]
async fn analyze_rejects_unknown_key() {
    let (status, body) = send(analyze_request("sk-unknown", json!({"monthly_bill": 10}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "unauthorized");
}

#[tokio::test]
async fn upload_csv_is_decoded_and_analyzed() {
    let csv = b"Date,Service,Cost\n2024-05-01,EC2,600\n2024-05-02,S3,300\n2024-05-03,Lambda,100\n";
    let (status, body) = send(upload_request(ENTERPRISE_KEY, "may.csv", csv)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["filename"], "may.csv");
    assert_eq!(body["bill"]["analysis_type"], "csv");
    assert_eq!(amount(&body["bill"]["total_cost"]), dec!(1000));
    assert_eq!(amount(&body["bill"]["services"]["EC2"]), dec!(600));

    let analysis = &body["analysis"];
    assert_eq!(amount(&analysis["current_bill"]), dec!(1000));
    assert_eq!(analysis["workload_type"], "other");
    // 0.25 * (1.2 * 1.1 * 0.8) * 1.0 = 0.264
    assert_eq!(amount(&analysis["potential_savings"]), dec!(264));
}

#[tokio::test]
async fn upload_cost_explorer_json() {
    let document = json!({
        "resultsByTime": [{
            "groups": [
                {"keys": ["RDS"], "metrics": {"UnblendedCost": {"amount": "800.00", "unit": "USD"}}},
                {"keys": ["S3"], "metrics": {"UnblendedCost": {"amount": "200.00", "unit": "USD"}}}
            ]
        }]
    });
    let (status, body) = send(upload_request(
        STARTER_KEY,
        "ce-export.JSON",
        document.to_string().as_bytes(),
    ))
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["bill"]["analysis_type"], "cost_explorer");
    let titles: Vec<&str> = body["analysis"]["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"RDS Reserved Instances"));
    assert!(titles.contains(&"S3 Lifecycle Policies"));
}

#[tokio::test]
async fn upload_unsupported_format_is_422() {
    let (status, body) = send(upload_request(STARTER_KEY, "bill.pdf", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "parse_error");
}

#[tokio::test]
async fn upload_without_cost_column_is_422() {
    let (status, body) = send(upload_request(
        STARTER_KEY,
        "usage.csv",
        b"service,hours\nEC2,720\n",
    ))
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "No cost columns found in CSV");
}

#[tokio::test]
async fn upload_zero_total_is_400() {
    let (status, body) = send(upload_request(STARTER_KEY, "empty.csv", b"service,cost\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn upload_without_file_field_is_400() {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nhello");
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/upload-billing")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header("authorization", format!("Bearer {}", STARTER_KEY))
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "bad_request");
}

#[tokio::test]
async fn plans_are_public() {
    let request = Request::builder()
        .uri("/api/subscription/plans")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    let plans = body.as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[2]["id"], "enterprise");
    assert_eq!(amount(&plans[2]["price"]), dec!(299));
}

#[tokio::test]
async fn upload_with_overflowing_amounts_is_422() {
    let json = br#"{"bills": [
        {"service": "EC2", "amount": "79228162514264337593543950335"},
        {"service": "EC2", "amount": "1"}
    ]}"#;
    let (status, body) = send(upload_request(STARTER_KEY, "huge.json", json)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "parse_error");

    let csv = b"service,cost\nEC2,79228162514264337593543950335\nS3,79228162514264337593543950335\n";
    let (status, body) = send(upload_request(STARTER_KEY, "huge.csv", csv)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"]["message"],
        "Amounts overflow the supported range at CSV row 3"
    );
}

#[tokio::test]
async fn upload_excel_workbook() {
    let workbook = include_bytes!("fixtures/billing.xlsx");
    let (status, body) = send(upload_request(STARTER_KEY, "may.xlsx", workbook)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["bill"]["analysis_type"], "excel");
    assert_eq!(amount(&body["bill"]["total_cost"]), dec!(180));
    assert_eq!(amount(&body["bill"]["services"]["Lambda"]), dec!(19.5));
    assert_eq!(amount(&body["analysis"]["current_bill"]), dec!(180));
}

#[tokio::test]
async fn unknown_routes_are_404() {
    for uri in ["/api/does-not-exist", "/api/analyses"] {
        let request = Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", STARTER_KEY))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn history_lists_own_analyses_newest_first() {
    let app = app_with_history().await;

    for bill in [100, 200, 300] {
        let (status, _) = send_to(
            app.clone(),
            analyze_request(STARTER_KEY, json!({"monthly_bill": bill, "services": ["EC2"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let csv = b"service,cost\nS3,50\n";
    let (status, _) = send_to(app.clone(), upload_request(ENTERPRISE_KEY, "s3.csv", csv)).await;
    assert_eq!(status, StatusCode::OK);

    let history = |key: &str, query: &str| {
        Request::builder()
            .uri(format!("/api/analyses{}", query))
            .header("authorization", format!("Bearer {}", key))
            .body(Body::empty())
            .unwrap()
    };

    let (status, page) = send_to(app.clone(), history(STARTER_KEY, "?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 2);
    let analyses = page["analyses"].as_array().unwrap();
    assert_eq!(analyses.len(), 2);
    assert_eq!(analyses[0]["source"], "manual");
    // Same-millisecond analyses fall back to insertion order
    let first = amount(&analyses[0]["analysis"]["current_bill"]);
    let second = amount(&analyses[1]["analysis"]["current_bill"]);
    assert!(first > second, "{} then {}", first, second);

    let (_, page) = send_to(app.clone(), history(STARTER_KEY, "?limit=2&offset=2")).await;
    assert_eq!(page["analyses"].as_array().unwrap().len(), 1);
    assert_eq!(amount(&page["analyses"][0]["analysis"]["current_bill"]), dec!(100));

    let (_, page) = send_to(app.clone(), history(ENTERPRISE_KEY, "")).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["analyses"][0]["source"], "csv");
    assert_eq!(page["analyses"][0]["filename"], "s3.csv");

    let (status, body) = send_to(app, history(STARTER_KEY, "?limit=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "bad_request");
}
