use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use super::{session_from_headers, unauthorized, AppState};
use crate::errors::CheckoutError;
use crate::models::payment::{CardInput, CustomerInfo, TransactionOutcome};
use crate::services::checkout::CheckoutRequest;

const APPROVED_MESSAGE: &str = "Payment approved.";
const PENDING_MESSAGE: &str = "Payment submitted, awaiting confirmation.";
const GENERIC_FAILURE: &str = "We could not process your payment. Please try again.";

#[derive(Deserialize)]
pub struct PaymentForm {
    card: CardInput,
    customer: CustomerInfo,
    #[serde(default = "single_installment")]
    installments: u32,
}

fn single_installment() -> u32 {
    1
}

fn status_for(error: &CheckoutError) -> StatusCode {
    match error {
        CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CheckoutError::AttemptInFlight => StatusCode::CONFLICT,
        CheckoutError::AuthFailure(_)
        | CheckoutError::TokenizeFailure(_)
        | CheckoutError::PaymentFailure(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Text shown to the user. Local errors are shown as they are; gateway
/// failures show the gateway's message when there is one.
fn failure_message(error: &CheckoutError) -> String {
    match error {
        CheckoutError::Validation(msg) => msg.clone(),
        CheckoutError::AttemptInFlight => error.to_string(),
        CheckoutError::Configuration(_) => GENERIC_FAILURE.to_string(),
        _ => error
            .gateway_message()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
    }
}

pub(super) async fn submit_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<PaymentForm>,
) -> impl IntoResponse {
    let session = match session_from_headers(&headers) {
        Some(session) => session,
        None => return unauthorized(),
    };

    let (checkout_tx, checkout_rx) = oneshot::channel();

    let send_result = state
        .checkout_channel
        .send(CheckoutRequest::SubmitPayment {
            session,
            card: form.card,
            customer: form.customer,
            installments: form.installments,
            response: checkout_tx,
        })
        .await;

    if let Err(e) = send_result {
        log::error!("Checkout service unavailable: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "failed", "message": GENERIC_FAILURE})),
        );
    }

    let outcome = match checkout_rx.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            let status = status_for(&e);
            let message = failure_message(&e);
            if !e.is_local() {
                log::warn!("Payment attempt failed: {}", e);
            }
            return (
                status,
                Json(json!({"status": "failed", "message": message})),
            );
        }
        Err(e) => TransactionOutcome::Failed(e.to_string()),
    };

    match outcome {
        TransactionOutcome::Approved(receipt) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "approved",
                "order_id": receipt.order_id,
                "payment_id": receipt.payment_id,
                "message": APPROVED_MESSAGE,
            })),
        ),
        TransactionOutcome::Pending(receipt) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "pending",
                "order_id": receipt.order_id,
                "payment_id": receipt.payment_id,
                "message": PENDING_MESSAGE,
            })),
        ),
        TransactionOutcome::Failed(reason) => {
            log::error!("Checkout service dropped the attempt: {}", reason);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "failed", "message": GENERIC_FAILURE})),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AuthFailureReason, GatewayFailure};

    #[test]
    fn gateway_message_is_preferred() {
        let error = CheckoutError::PaymentFailure(GatewayFailure::new(
            Some(402),
            Some("Saldo insuficiente".to_string()),
        ));
        assert_eq!(failure_message(&error), "Saldo insuficiente");
        assert_eq!(status_for(&error), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn generic_message_without_gateway_text() {
        let error = CheckoutError::AuthFailure(AuthFailureReason::Rejected(
            GatewayFailure::new(Some(401), None),
        ));
        assert_eq!(failure_message(&error), GENERIC_FAILURE);

        let error = CheckoutError::AuthFailure(AuthFailureReason::MissingToken);
        assert_eq!(failure_message(&error), GENERIC_FAILURE);

        let error = CheckoutError::Configuration("missing seller id".to_string());
        assert_eq!(failure_message(&error), GENERIC_FAILURE);
        assert_eq!(status_for(&error), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_rejection_shows_gateway_text() {
        let error = CheckoutError::AuthFailure(AuthFailureReason::Rejected(
            GatewayFailure::new(Some(401), Some("Client credentials are invalid".to_string())),
        ));
        assert_eq!(failure_message(&error), "Client credentials are invalid");
        assert_eq!(status_for(&error), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_is_shown_inline() {
        let error = CheckoutError::Validation("card number is required".to_string());
        assert_eq!(failure_message(&error), "card number is required");
        assert_eq!(status_for(&error), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
