use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::settings::Settings;

pub mod checkout;
pub mod http;

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Spawns the checkout service and returns the channel that feeds it.
pub fn start_checkout_service(
    handler: checkout::CheckoutRequestHandler,
) -> mpsc::Sender<checkout::CheckoutRequest> {
    let (checkout_tx, mut checkout_rx) = mpsc::channel(512);
    let mut checkout_service = checkout::CheckoutService::new();

    tokio::spawn(async move {
        checkout_service.run(handler, &mut checkout_rx).await;
    });

    checkout_tx
}

pub async fn start_services(settings: Settings, listen: &str) -> Result<(), anyhow::Error> {
    let credentials = settings.gateway.service_credentials()?;
    let base_url = settings.gateway.base_url();

    log::info!(
        "Using gateway at {} with seller {}",
        base_url,
        credentials.seller_id()
    );

    let checkout = checkout::Checkout::new(
        base_url,
        Duration::from_secs(settings.gateway.timeout_secs),
        settings.payment,
    )?;

    log::info!("Starting checkout service.");
    let checkout_tx =
        start_checkout_service(checkout::CheckoutRequestHandler::new(checkout, credentials));

    log::info!("Starting HTTP server.");
    http::start_http_server(listen, checkout_tx).await
}
