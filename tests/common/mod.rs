#![allow(dead_code)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mooze_checkout::models::payment::{CardInput, CustomerInfo, ServiceCredentials};
use mooze_checkout::services::checkout::Checkout;
use mooze_checkout::settings::PaymentProfile;

pub const TOKEN_PATH: &str = "/auth/oauth/v2/token";
pub const TOKENIZE_PATH: &str = "/v1/tokens/card";
pub const PAYMENT_PATH: &str = "/v1/payments/credit";

pub fn profile() -> PaymentProfile {
    PaymentProfile {
        amount_in_cents: 1990,
        currency: "BRL".to_string(),
        product_type: "digital_content".to_string(),
        transaction_type: "FULL".to_string(),
        soft_descriptor: "MOOZE*PREMIUM".to_string(),
        category_code: "5815".to_string(),
        sales_tax: 0,
        positive_statuses: vec![
            "approved".to_string(),
            "authorized".to_string(),
            "confirmed".to_string(),
        ],
        max_installments: 12,
    }
}

pub fn credentials() -> ServiceCredentials {
    ServiceCredentials::new(
        "id".to_string(),
        SecretString::from("secret".to_string()),
        "seller-1".to_string(),
    )
    .expect("valid credentials")
}

pub fn checkout(server: &MockServer) -> Checkout {
    checkout_with_timeout(server, Duration::from_secs(5))
}

pub fn checkout_with_timeout(server: &MockServer, timeout: Duration) -> Checkout {
    Checkout::new(server.uri(), timeout, profile()).expect("checkout")
}

pub fn card() -> CardInput {
    CardInput {
        cardholder_name: "JOAO DA SILVA".to_string(),
        number: SecretString::from("4111 1111 1111 1111".to_string()),
        exp_month: "12".to_string(),
        exp_year: "28".to_string(),
        security_code: SecretString::from("123".to_string()),
        brand: "Visa".to_string(),
    }
}

pub fn customer(document_number: Option<&str>) -> CustomerInfo {
    CustomerInfo {
        name: "Joao da Silva".to_string(),
        email: "joao@example.com".to_string(),
        document_number: document_number.map(str::to_string),
        phone_number: None,
    }
}

pub async fn mount_token_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-123",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "oob"
        })))
        .mount(server)
        .await;
}

pub async fn mount_tokenize_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKENIZE_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number_token": "tok-abc"
        })))
        .mount(server)
        .await;
}

pub async fn mount_payment(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(PAYMENT_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Paths the mock gateway was called with, in arrival order.
pub async fn called_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

pub async fn payment_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == PAYMENT_PATH)
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect()
}
