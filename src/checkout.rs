//! Checkout: validate the customer's details, snapshot the cart into the
//! order payload and hand it to the order-creation endpoint.

use std::path::Path;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use reqwest::blocking::{multipart, Client};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::cart::{CartLineItem, CartStore};
use crate::catalog::{ExtraOption, SelectedChoiceGroup, SelectedSize};
use crate::error::{CheckoutError, ConfigError};
use crate::orders::PaymentMethod;
use crate::util::{non_empty, strip_whitespace};

pub const DEFAULT_PHONE_PATTERN: &str = r"^(76|78|79)\d{6}$";

const GENERIC_FAILURE: &str = "Failed to place order. Please try again.";

// ── Input ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CheckoutDetails {
    pub payment_method: Option<PaymentMethod>,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub notes: Option<String>,
}

/// An uploaded proof-of-payment attachment.
#[derive(Debug, Clone)]
pub struct ProofOfPayment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ProofOfPayment {
    pub fn from_path(path: &Path) -> Result<Self, CheckoutError> {
        let bytes = std::fs::read(path).map_err(|source| CheckoutError::Proof {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "payment-proof".to_string());
        let mime = mime_for(path).to_string();
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Accepted customer phone numbers. Spaces are ignored.
#[derive(Debug, Clone)]
pub struct PhoneRule {
    pattern: Regex,
}

impl PhoneRule {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|err| ConfigError::Invalid {
            name: "phone_pattern".to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self { pattern })
    }

    pub fn accepts(&self, phone: &str) -> bool {
        self.pattern.is_match(&strip_whitespace(phone))
    }
}

// ── Payload ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraSnapshot {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: Decimal,
}

impl From<&ExtraOption> for ExtraSnapshot {
    fn from(extra: &ExtraOption) -> Self {
        Self {
            id: extra.id.clone(),
            name: extra.name.clone(),
            price: extra.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub item_id: String,
    pub meal_id: String,
    pub name: String,
    pub base_price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<SelectedSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_choices: Option<Vec<SelectedChoiceGroup>>,
    /// One list per unit.
    pub selected_extras: Vec<Vec<ExtraSnapshot>>,
}

impl From<&CartLineItem> for CheckoutLine {
    fn from(item: &CartLineItem) -> Self {
        Self {
            item_id: item.config_key.clone(),
            meal_id: item.catalog_item_id.clone(),
            name: item.display_name.clone(),
            base_price: item.base_price,
            quantity: item.quantity(),
            selected_size: item.selected_size.clone(),
            selected_choices: item.selected_choices.clone(),
            selected_extras: item
                .selected_extras()
                .into_iter()
                .map(|extras| extras.iter().map(ExtraSnapshot::from).collect())
                .collect(),
        }
    }
}

/// The `orderData` document posted to the order-creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub cart_items: Vec<CheckoutLine>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub customer_phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub order_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    pub order_number: String,
    pub total: Decimal,
}

// ── Gateway ──────────────────────────────────────────────────────────────

/// The order-creation endpoint.
pub trait OrderGateway {
    fn submit(
        &self,
        payload: &CheckoutPayload,
        proof: Option<&ProofOfPayment>,
    ) -> Result<String, CheckoutError>;
}

/// Posts the order as a multipart form: the JSON document in `orderData`
/// and the optional attachment in `paymentProof`.
pub struct HttpGateway {
    client: Client,
    url: String,
}

impl HttpGateway {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CheckoutError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckoutError::Transport(format!("client build error: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl OrderGateway for HttpGateway {
    fn submit(
        &self,
        payload: &CheckoutPayload,
        proof: Option<&ProofOfPayment>,
    ) -> Result<String, CheckoutError> {
        let mut form = multipart::Form::new().text("orderData", serde_json::to_string(payload)?);
        if let Some(proof) = proof {
            form = form.part(
                "paymentProof",
                multipart::Part::bytes(proof.bytes.clone())
                    .file_name(proof.file_name.clone())
                    .mime_str(&proof.mime)
                    .map_err(|e| CheckoutError::Transport(format!("proof upload prepare error: {e}")))?,
            );
        }

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().unwrap_or(Value::Null);
        if status.is_success() {
            return order_number(&body).ok_or_else(|| CheckoutError::Rejected {
                status: status.as_u16(),
                message: GENERIC_FAILURE.to_string(),
            });
        }

        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(GENERIC_FAILURE)
            .to_string();
        Err(CheckoutError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// `orderNumber` from a success body, sent either as a string or a number.
fn order_number(body: &Value) -> Option<String> {
    match body.get("orderNumber")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Flow ─────────────────────────────────────────────────────────────────

pub struct Checkout<G> {
    gateway: G,
    phone: PhoneRule,
}

impl<G: OrderGateway> Checkout<G> {
    pub fn new(gateway: G, phone: PhoneRule) -> Self {
        Self { gateway, phone }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Checks run in the order the customer sees them: cart, payment,
    /// proof, phone.
    pub fn validate(
        &self,
        cart: &CartStore,
        details: &CheckoutDetails,
        proof: Option<&ProofOfPayment>,
    ) -> Result<PaymentMethod, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::Validation("Your cart is empty.".to_string()));
        }
        let Some(method) = details.payment_method else {
            return Err(CheckoutError::Validation(
                "Please select a payment method.".to_string(),
            ));
        };
        if method.requires_proof() && proof.is_none() {
            return Err(CheckoutError::Validation(
                "Please upload proof of payment.".to_string(),
            ));
        }
        if details.phone.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "Please enter your phone number.".to_string(),
            ));
        }
        if !self.phone.accepts(&details.phone) {
            return Err(CheckoutError::Validation(
                "Please enter a valid 8-digit Swazi phone number starting with 76, 78, or 79."
                    .to_string(),
            ));
        }
        Ok(method)
    }

    pub fn payload(
        &self,
        cart: &CartStore,
        details: &CheckoutDetails,
        method: PaymentMethod,
    ) -> CheckoutPayload {
        CheckoutPayload {
            cart_items: cart.items().iter().map(CheckoutLine::from).collect(),
            total: cart.cart_total(),
            payment_method: method,
            customer_phone_number: strip_whitespace(&details.phone),
            whatsapp_number: non_empty(details.whatsapp.as_deref()),
            customer_name: non_empty(details.name.as_deref()),
            customer_email: non_empty(details.email.as_deref()),
            notes: non_empty(details.notes.as_deref()),
            order_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Place the order. The cart is cleared and closed only once the
    /// endpoint confirms; on any failure it is left as it was.
    pub fn submit(
        &mut self,
        cart: &mut CartStore,
        details: &CheckoutDetails,
        proof: Option<&ProofOfPayment>,
    ) -> Result<OrderReceipt, CheckoutError> {
        let method = self.validate(cart, details, proof)?;
        let payload = self.payload(cart, details, method);
        info!(
            lines = payload.cart_items.len(),
            total = %payload.total,
            method = %method,
            "submitting order"
        );

        match self.gateway.submit(&payload, proof) {
            Ok(order_number) => {
                info!(order = %order_number, "order placed");
                cart.clear_cart();
                cart.close_cart();
                Ok(OrderReceipt {
                    order_number,
                    total: payload.total,
                })
            }
            Err(err) => {
                warn!(error = %err, "checkout failed; cart kept");
                Err(err)
            }
        }
    }
}
