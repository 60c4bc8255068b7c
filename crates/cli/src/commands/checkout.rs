//! Order placement from the terminal.

use std::sync::{Arc, Mutex};

use soko_core::SessionContext;
use soko_storefront::cart::CartStore;
use soko_storefront::checkout::{
    CheckoutError, CheckoutHandoff, CheckoutSubmitter, OrderApi, OrderConfirmation,
};
use soko_storefront::visit::Visit;

/// Submit the cart in `store` for `session`.
///
/// On success the persisted cart is cleared and the handoff is logged.
///
/// # Errors
///
/// Returns the checkout failure; the persisted cart is untouched.
pub async fn run<A: OrderApi>(
    submitter: &CheckoutSubmitter<A>,
    session: Option<SessionContext>,
    store: CartStore,
) -> Result<OrderConfirmation, CheckoutError> {
    let visit = Arc::new(Mutex::new(Visit::new(session, store)));

    let confirmation = submitter.place_order(&Arc::downgrade(&visit)).await?;

    tracing::info!(
        "Order {} placed: {} items, total {}",
        confirmation.order_id,
        confirmation.items.len(),
        confirmation.total
    );
    match &confirmation.handoff {
        CheckoutHandoff::Redirect { url } => tracing::info!("Continue on WhatsApp: {url}"),
        CheckoutHandoff::ParentMessage { message } => {
            tracing::info!("Parent frame message: {message}");
        }
    }

    Ok(confirmation)
}
