use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

use checkpoint::otp::{KeyOutcome, SubmitOutcome};
use checkpoint::{
    Activation, HttpOtpService, OtpConfig, OtpFlowController, OtpService, OtpServiceConfig,
    ServiceError,
};
use checkpoint_common::FlowEvent;

const RECIPIENT: &str = "user@example.com";

/// In-memory stand-in for the OTP issuing service
#[derive(Clone, Default)]
struct FakeBackend {
    issued: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

#[derive(Deserialize)]
struct RequestBody {
    email: String,
    role: String,
}

#[derive(Deserialize)]
struct VerifyBody {
    email: String,
    otp: String,
}

async fn request_otp(
    State(backend): State<FakeBackend>,
    Json(body): Json<RequestBody>,
) -> (StatusCode, Json<Value>) {
    match body.email.as_str() {
        "broken@example.com" => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
        }
        "unknown@example.com" => {
            return (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" })));
        }
        _ => {}
    }

    let mut requests = backend.requests.lock().unwrap();
    requests.push((body.email.clone(), body.role));
    let code = format!("{:06}", 111_111 * requests.len());
    backend.issued.lock().unwrap().insert(body.email, code);

    (StatusCode::OK, Json(json!({ "message": "OTP sent" })))
}

async fn verify_otp(
    State(backend): State<FakeBackend>,
    Json(body): Json<VerifyBody>,
) -> (StatusCode, Json<Value>) {
    if body.email == "soft-fail@example.com" {
        return (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "OTP expired" })),
        );
    }

    let issued = backend.issued.lock().unwrap();
    match issued.get(&body.email) {
        Some(code) if *code == body.otp => (StatusCode::OK, Json(json!({ "success": true }))),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid OTP" }))),
    }
}

struct TestApp {
    backend: FakeBackend,
    service: HttpOtpService,
}

impl TestApp {
    async fn new() -> Self {
        let backend = FakeBackend::default();
        let app = Router::new()
            .route("/auth/forgot-password", post(request_otp))
            .route("/auth/verify-otp", post(verify_otp))
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed binding to an ephemeral port");
        let address = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        let config = OtpServiceConfig {
            base_url: format!("{address}/"),
            ..OtpServiceConfig::default()
        };
        let service = HttpOtpService::new(&config).unwrap();

        TestApp { backend, service }
    }

    fn issued_code(&self, email: &str) -> Option<String> {
        self.backend.issued.lock().unwrap().get(email).cloned()
    }
}

#[tokio::test]
async fn request_then_verify_issued_code() {
    let app = TestApp::new().await;

    assert_ok!(app.service.request_otp(RECIPIENT, "admin").await);
    assert_eq!(
        app.backend.requests.lock().unwrap().clone(),
        vec![(RECIPIENT.to_string(), "admin".to_string())]
    );

    let code = app.issued_code(RECIPIENT).unwrap();
    assert_ok!(app.service.verify_otp(RECIPIENT, &code).await);
}

#[tokio::test]
async fn wrong_code_is_rejected_with_service_message() {
    let app = TestApp::new().await;
    app.service.request_otp(RECIPIENT, "user").await.unwrap();

    let err = assert_err!(app.service.verify_otp(RECIPIENT, "000000").await);
    assert_eq!(err, ServiceError::Rejected("Invalid OTP".to_string()));
}

#[tokio::test]
async fn client_and_server_errors_are_classified() {
    let app = TestApp::new().await;

    let err = assert_err!(app.service.request_otp("unknown@example.com", "user").await);
    assert_eq!(err, ServiceError::Rejected("User not found".to_string()));

    let err = assert_err!(app.service.request_otp("broken@example.com", "user").await);
    assert_eq!(err, ServiceError::Unavailable("Internal Server Error".to_string()));

    let err = assert_err!(app.service.verify_otp("soft-fail@example.com", "123456").await);
    assert_eq!(err, ServiceError::Rejected("OTP expired".to_string()));
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let config = OtpServiceConfig {
        base_url: format!("http://{address}"),
        timeout_secs: 2,
        ..OtpServiceConfig::default()
    };
    let service = HttpOtpService::new(&config).unwrap();

    let err = assert_err!(service.verify_otp(RECIPIENT, "123456").await);
    assert!(matches!(err, ServiceError::Unavailable(_)));
    assert_eq!(err.user_message(), "Verification service unavailable");
}

#[tokio::test]
async fn flow_recovers_from_wrong_code_then_verifies() {
    let app = TestApp::new().await;
    app.service.request_otp(RECIPIENT, "user").await.unwrap();
    let code = app.issued_code(RECIPIENT).unwrap();

    let (activation, mut events) = OtpFlowController::activate(
        Some(RECIPIENT),
        Arc::new(app.service.clone()),
        &OtpConfig::default(),
    );
    let Activation::Active(flow) = activation else {
        panic!("flow should be active");
    };

    for (i, c) in "999999".chars().enumerate() {
        assert!(matches!(
            flow.input(i, &c.to_string()).await,
            KeyOutcome::Accepted { .. }
        ));
    }
    assert_eq!(
        flow.submit().await,
        SubmitOutcome::Rejected("Invalid OTP. Please try again.".to_string())
    );
    assert_eq!(flow.snapshot().await.code(), "999999");

    for (i, c) in code.chars().enumerate() {
        flow.input(i, &c.to_string()).await;
    }
    assert!(flow.snapshot().await.message.is_none());
    assert!(matches!(flow.submit().await, SubmitOutcome::Verified(_)));

    match events.recv().await {
        Some(FlowEvent::Verified(verified)) => {
            assert_eq!(verified.recipient, RECIPIENT);
            assert_eq!(verified.code, code);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
