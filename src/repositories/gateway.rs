use std::time::Duration;

use chrono::Utc;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{AuthFailureReason, CheckoutError, GatewayFailure};
use crate::models::payment::{
    normalize_card_number, BearerCredential, NumberToken, ServiceCredentials, TransactionRequest,
};

pub mod probe;

const TOKEN_PATH: &str = "/auth/oauth/v2/token";
const TOKENIZE_PATH: &str = "/v1/tokens/card";
const PAYMENT_PATH: &str = "/v1/payments/credit";

const SCOPE: &str = "oob";

#[derive(Serialize)]
struct TokenizeCard<'a> {
    card_number: &'a str,
    customer_id: &'a str,
}

pub struct GatewayApi {
    url: String,
    client: reqwest::Client,
}

impl GatewayApi {
    pub fn new(url: String, timeout: Duration) -> Result<Self, CheckoutError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// OAuth2 client-credentials exchange.
    pub async fn access_token(
        &self,
        credentials: &ServiceCredentials,
    ) -> Result<BearerCredential, CheckoutError> {
        let response = self
            .client
            .post(format!("{}{}", self.url, TOKEN_PATH))
            .basic_auth(
                credentials.client_id(),
                Some(credentials.client_secret().expose_secret()),
            )
            .form(&[("grant_type", "client_credentials"), ("scope", SCOPE)])
            .send()
            .await
            .map_err(|e| CheckoutError::AuthFailure(AuthFailureReason::Transport(e.to_string())))?;

        let status = response.status();
        let body = read_json(response).await;

        if !status.is_success() {
            log::warn!("Gateway token endpoint answered {}", status);
            return Err(CheckoutError::AuthFailure(AuthFailureReason::Rejected(
                failure(status, &body),
            )));
        }

        let access_token = probe::first_non_empty(&body, probe::ACCESS_TOKEN_FIELDS)
            .ok_or(CheckoutError::AuthFailure(AuthFailureReason::MissingToken))?;

        Ok(BearerCredential {
            access_token: SecretString::from(access_token.to_string()),
            scope: body["scope"].as_str().map(str::to_string),
            expires_in: body["expires_in"].as_u64(),
            issued_at: Utc::now(),
        })
    }

    /// Exchanges the card number for a single-use number token. The number is
    /// consumed so it cannot outlive this call.
    pub async fn tokenize_card(
        &self,
        bearer: &BearerCredential,
        card_number: SecretString,
        customer_id: &str,
    ) -> Result<NumberToken, CheckoutError> {
        let normalized = SecretString::from(normalize_card_number(card_number.expose_secret()));
        drop(card_number);

        let response = self
            .client
            .post(format!("{}{}", self.url, TOKENIZE_PATH))
            .bearer_auth(bearer.access_token.expose_secret())
            .json(&TokenizeCard {
                card_number: normalized.expose_secret(),
                customer_id,
            })
            .send()
            .await
            .map_err(|e| {
                log::warn!("Gateway tokenization request failed: {}", e);
                CheckoutError::TokenizeFailure(GatewayFailure::default())
            })?;

        let status = response.status();
        let body = read_json(response).await;

        if !status.is_success() {
            log::warn!("Gateway tokenization answered {}", status);
            return Err(CheckoutError::TokenizeFailure(failure(status, &body)));
        }

        match probe::first_non_empty(&body, probe::NUMBER_TOKEN_FIELDS) {
            Some(token) => Ok(NumberToken::new(token.to_string())),
            None => {
                log::warn!("Gateway tokenization response has no number token");
                Err(CheckoutError::TokenizeFailure(failure(status, &body)))
            }
        }
    }

    /// Submits the authorization request and returns the gateway's body.
    pub async fn authorize(
        &self,
        bearer: &BearerCredential,
        request: &TransactionRequest,
    ) -> Result<Value, CheckoutError> {
        let response = self
            .client
            .post(format!("{}{}", self.url, PAYMENT_PATH))
            .bearer_auth(bearer.access_token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::warn!("Gateway payment request failed: {}", e);
                CheckoutError::PaymentFailure(GatewayFailure::default())
            })?;

        let status = response.status();
        let body = read_json(response).await;

        if !status.is_success() {
            log::warn!(
                "Gateway payment endpoint answered {} for order {}",
                status,
                request.order_id()
            );
            return Err(CheckoutError::PaymentFailure(failure(status, &body)));
        }

        Ok(body)
    }
}

/// Unreadable or empty bodies become `Null`.
async fn read_json(response: Response) -> Value {
    match response.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
        Err(e) => {
            log::debug!("Could not read gateway response body: {}", e);
            Value::Null
        }
    }
}

fn failure(status: StatusCode, body: &Value) -> GatewayFailure {
    GatewayFailure::new(
        Some(status.as_u16()),
        probe::first_non_empty(body, probe::MESSAGE_FIELDS).map(str::to_string),
    )
}
