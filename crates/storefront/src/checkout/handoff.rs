//! What happens after an order is confirmed.

use serde::Serialize;
use serde_json::{Value, json};
use soko_core::{CartLine, CurrencyCode, OrderId, Price};

/// A confirmed order, as seen by handoff strategies.
#[derive(Debug, Clone)]
pub struct ConfirmedOrder {
    pub order_id: OrderId,
    /// Lines as submitted (not the live cart).
    pub lines: Vec<CartLine>,
    pub total: Price,
}

/// Instruction returned to the client after a confirmed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutHandoff {
    /// Navigate to `url`.
    Redirect { url: String },
    /// Post `message` to the parent frame.
    ParentMessage { message: Value },
}

/// Strategy invoked once per confirmed order.
pub trait OnOrderConfirmed: Send + Sync {
    fn on_order_confirmed(&self, order: &ConfirmedOrder) -> CheckoutHandoff;
}

/// Opens a WhatsApp chat with the store, pre-filled with an order summary.
#[derive(Debug, Clone)]
pub struct WhatsAppRedirect {
    contact: String,
    currency: CurrencyCode,
}

impl WhatsAppRedirect {
    /// `contact` is an international number, digits only.
    #[must_use]
    pub fn new(contact: impl Into<String>, currency: CurrencyCode) -> Self {
        Self {
            contact: contact.into(),
            currency,
        }
    }

    fn summary(&self, order: &ConfirmedOrder) -> String {
        let mut message = format!("Hello! I just placed order #{}:\n", order.order_id);
        for line in &order.lines {
            message.push_str(&format!(
                "- {} x {} ({})\n",
                line.quantity,
                line.product.name,
                self.currency.format(line.line_total()),
            ));
        }
        message.push_str(&format!("Total: {}", self.currency.format(order.total)));
        message
    }
}

impl OnOrderConfirmed for WhatsAppRedirect {
    fn on_order_confirmed(&self, order: &ConfirmedOrder) -> CheckoutHandoff {
        let text = self.summary(order);
        CheckoutHandoff::Redirect {
            url: format!(
                "https://wa.me/{}?text={}",
                self.contact,
                urlencoding::encode(&text)
            ),
        }
    }
}

/// Hands the order to an embedding page via `window.parent.postMessage`.
#[derive(Debug, Clone, Default)]
pub struct ParentFrameMessage {
    currency: CurrencyCode,
}

impl ParentFrameMessage {
    #[must_use]
    pub const fn new(currency: CurrencyCode) -> Self {
        Self { currency }
    }
}

impl OnOrderConfirmed for ParentFrameMessage {
    fn on_order_confirmed(&self, order: &ConfirmedOrder) -> CheckoutHandoff {
        let items: Vec<Value> = order
            .lines
            .iter()
            .map(|line| {
                json!({
                    "product_id": line.product.id,
                    "name": line.product.name,
                    "quantity": line.quantity.get(),
                    "line_total": line.line_total(),
                })
            })
            .collect();

        CheckoutHandoff::ParentMessage {
            message: json!({
                "type": "order_confirmed",
                "order_id": order.order_id,
                "items": items,
                "total": order.total,
                "currency": self.currency.code(),
            }),
        }
    }
}
