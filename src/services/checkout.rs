use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{RequestHandler, Service};

use crate::errors::CheckoutError;
use crate::models::payment::{
    CardInput, CustomerInfo, PaymentReceipt, ServiceCredentials, TransactionOutcome,
    TransactionRequest,
};
use crate::models::session::SessionContext;
use crate::repositories::gateway::probe::{PaymentStatus, StatusClassifier};
use crate::repositories::gateway::GatewayApi;
use crate::settings::PaymentProfile;

pub enum CheckoutRequest {
    SubmitPayment {
        session: SessionContext,
        card: CardInput,
        customer: CustomerInfo,
        installments: u32,
        response: oneshot::Sender<Result<TransactionOutcome, CheckoutError>>,
    },
}

/// Step an attempt is in. Only used to label debug log lines; callers see
/// the final `TransactionOutcome` or `CheckoutError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    AcquiringCredential,
    Tokenizing,
    Submitting,
    Approved,
    Pending,
    Failed,
}

struct Attempt {
    order_id: String,
    state: CheckoutState,
}

impl Attempt {
    fn new() -> Self {
        Attempt {
            order_id: Uuid::new_v4().hyphenated().to_string(),
            state: CheckoutState::Idle,
        }
    }

    fn advance(&mut self, next: CheckoutState) {
        log::debug!("Order {}: {:?} -> {:?}", self.order_id, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: CheckoutError) -> CheckoutError {
        log::warn!(
            "Order {} failed while {:?}: {}",
            self.order_id,
            self.state,
            error
        );
        self.advance(CheckoutState::Failed);
        error
    }
}

/// Marks a session as having an attempt in flight until dropped.
struct InFlight {
    sessions: Arc<DashSet<String>>,
    key: String,
}

impl InFlight {
    fn acquire(sessions: &Arc<DashSet<String>>, key: String) -> Option<Self> {
        if !sessions.insert(key.clone()) {
            return None;
        }

        Some(InFlight {
            sessions: sessions.clone(),
            key,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.sessions.remove(&self.key);
    }
}

/// Runs one payment attempt: access token, card token, authorization.
pub struct Checkout {
    gateway: GatewayApi,
    profile: PaymentProfile,
    classifier: StatusClassifier,
    in_flight: Arc<DashSet<String>>,
}

impl Checkout {
    pub fn new(
        gateway_url: String,
        timeout: Duration,
        profile: PaymentProfile,
    ) -> Result<Self, CheckoutError> {
        let gateway = GatewayApi::new(gateway_url, timeout)?;
        let classifier = StatusClassifier::new(&profile.positive_statuses);

        Ok(Checkout {
            gateway,
            profile,
            classifier,
            in_flight: Arc::new(DashSet::new()),
        })
    }

    pub async fn submit_payment(
        &self,
        credentials: &ServiceCredentials,
        session: &SessionContext,
        card: CardInput,
        customer: CustomerInfo,
        installments: u32,
    ) -> Result<TransactionOutcome, CheckoutError> {
        card.validate()?;
        customer.validate()?;
        if installments == 0 || installments > self.profile.max_installments {
            return Err(CheckoutError::Validation(format!(
                "installments must be between 1 and {}",
                self.profile.max_installments
            )));
        }

        let _guard = InFlight::acquire(&self.in_flight, session.key())
            .ok_or(CheckoutError::AttemptInFlight)?;

        let mut attempt = Attempt::new();
        log::info!(
            "Starting payment attempt, order {} with {} installment(s)",
            attempt.order_id,
            installments
        );

        attempt.advance(CheckoutState::AcquiringCredential);
        let bearer = self
            .gateway
            .access_token(credentials)
            .await
            .map_err(|e| attempt.fail(e))?;

        attempt.advance(CheckoutState::Tokenizing);
        let (card_number, card) = card.into_parts();
        let token = self
            .gateway
            .tokenize_card(&bearer, card_number, customer.email.trim())
            .await
            .map_err(|e| attempt.fail(e))?;

        attempt.advance(CheckoutState::Submitting);
        let request = TransactionRequest::build(
            &self.profile,
            credentials.seller_id(),
            attempt.order_id.clone(),
            token,
            card,
            &customer,
            installments,
        );
        let body = self
            .gateway
            .authorize(&bearer, &request)
            .await
            .map_err(|e| attempt.fail(e))?;
        drop(bearer);

        let (status, raw_status) = self.classifier.classify(&body);
        let receipt = PaymentReceipt {
            order_id: attempt.order_id.clone(),
            payment_id: body["payment_id"].as_str().map(str::to_string),
            status: raw_status,
        };

        match status {
            PaymentStatus::Approved => {
                attempt.advance(CheckoutState::Approved);
                log::info!("Order {} approved", receipt.order_id);
                Ok(TransactionOutcome::Approved(receipt))
            }
            PaymentStatus::Pending => {
                attempt.advance(CheckoutState::Pending);
                log::info!(
                    "Order {} pending with status '{}'",
                    receipt.order_id,
                    receipt.status
                );
                Ok(TransactionOutcome::Pending(receipt))
            }
        }
    }
}

#[derive(Clone)]
pub struct CheckoutRequestHandler {
    checkout: Arc<Checkout>,
    credentials: Arc<ServiceCredentials>,
}

impl CheckoutRequestHandler {
    pub fn new(checkout: Checkout, credentials: ServiceCredentials) -> Self {
        CheckoutRequestHandler {
            checkout: Arc::new(checkout),
            credentials: Arc::new(credentials),
        }
    }
}

#[async_trait]
impl RequestHandler<CheckoutRequest> for CheckoutRequestHandler {
    async fn handle_request(&self, request: CheckoutRequest) {
        match request {
            CheckoutRequest::SubmitPayment {
                session,
                card,
                customer,
                installments,
                mut response,
            } => {
                let attempt = self.checkout.submit_payment(
                    &self.credentials,
                    &session,
                    card,
                    customer,
                    installments,
                );

                let result = tokio::select! {
                    result = attempt => Some(result),
                    _ = response.closed() => None,
                };

                match result {
                    Some(result) => {
                        let _ = response.send(result);
                    }
                    None => log::warn!("Caller went away, abandoning payment attempt."),
                }
            }
        }
    }
}

pub struct CheckoutService;

impl CheckoutService {
    pub fn new() -> Self {
        CheckoutService {}
    }
}

#[async_trait]
impl Service<CheckoutRequest, CheckoutRequestHandler> for CheckoutService {}
