//! Order documents as stored by the CMS, and the operations dashboard board.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::ImageRef;
use crate::checkout::CheckoutPayload;
use crate::error::OrderError;
use crate::util::write_atomic;

// ── Enumerations ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Received,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Preparing => "Preparing",
            Self::Ready => "Ready for Pickup",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Forward moves along the kitchen flow, or cancellation of an open order.
    pub fn can_move_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Received, Self::Preparing)
            | (Self::Preparing, Self::Ready)
            | (Self::Ready, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// The status the dashboard's primary action moves an order to.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            Self::Received => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "received" => Ok(Self::Received),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Ewallet,
    Momo,
    #[default]
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ewallet => "ewallet",
            Self::Momo => "momo",
            Self::Cash => "cash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ewallet => "eWallet",
            Self::Momo => "MoMo",
            Self::Cash => "Cash on Collection",
        }
    }

    /// Mobile money methods are paid up front and need a proof upload.
    pub fn requires_proof(&self) -> bool {
        matches!(self, Self::Ewallet | Self::Momo)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ewallet" | "e-wallet" => Ok(Self::Ewallet),
            "momo" => Ok(Self::Momo),
            "cash" => Ok(Self::Cash),
            other => Err(format!("unknown payment method `{other}` (ewallet, momo, cash)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

// ── Documents ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub id: String,
    #[serde(rename = "_type", default = "reference_type")]
    pub kind: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: reference_type(),
        }
    }
}

fn reference_type() -> String {
    "reference".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Reference>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Zero-based unit the extra was picked for.
    #[serde(default)]
    pub quantity_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Reference>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub price_at_purchase: Option<Decimal>,
    #[serde(default)]
    pub name_at_purchase: Option<String>,
    #[serde(default)]
    pub selected_extras: Vec<OrderExtra>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_ready: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof: Option<ImageRef>,
}

impl Order {
    /// The order document the order-creation endpoint derives from a
    /// checkout payload.
    pub fn from_checkout(
        id: impl Into<String>,
        order_number: impl Into<String>,
        payload: &CheckoutPayload,
    ) -> Self {
        let items = payload
            .cart_items
            .iter()
            .map(|line| {
                let choices: Decimal = line
                    .selected_choices
                    .iter()
                    .flatten()
                    .flat_map(|group| group.selected_options.iter())
                    .map(|option| option.price_delta)
                    .sum();
                let selected_extras = line
                    .selected_extras
                    .iter()
                    .enumerate()
                    .flat_map(|(unit, extras)| {
                        extras.iter().map(move |extra| OrderExtra {
                            extra: Some(Reference::to(extra.id.clone())),
                            name: Some(extra.name.clone()),
                            price: Some(extra.price),
                            quantity_index: unit as u32,
                        })
                    })
                    .collect();
                OrderItem {
                    product: Some(Reference::to(line.meal_id.clone())),
                    quantity: line.quantity,
                    price_at_purchase: Some(line.base_price + choices),
                    name_at_purchase: Some(line.name.clone()),
                    selected_extras,
                    image: None,
                }
            })
            .collect();

        Self {
            id: id.into(),
            order_number: Some(order_number.into()),
            customer: Customer {
                name: payload.customer_name.clone(),
                phone: Some(payload.customer_phone_number.clone()),
                email: payload.customer_email.clone(),
                whatsapp: payload.whatsapp_number.clone(),
            },
            items,
            status: OrderStatus::Received,
            payment_method: payload.payment_method,
            payment_status: PaymentStatus::Pending,
            total_amount: Some(payload.total),
            notes: payload.notes.clone(),
            order_date: Some(payload.order_date.clone()),
            estimated_ready: None,
            payment_proof: None,
        }
    }

    pub fn display_number(&self) -> &str {
        self.order_number.as_deref().unwrap_or(&self.id)
    }

    /// Move the order to `next`, rejecting moves the kitchen flow does not
    /// allow. Completing an order marks it paid.
    pub fn advance(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_move_to(next) {
            return Err(OrderError::Transition {
                order: self.display_number().to_string(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        info!(order = %self.display_number(), from = %self.status, to = %next, "order status updated");
        self.status = next;
        if next == OrderStatus::Completed {
            self.payment_status = PaymentStatus::Paid;
        }
        Ok(())
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    fn placed_at(&self) -> Option<DateTime<FixedOffset>> {
        self.order_date
            .as_deref()
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
    }
}

// ── Board ────────────────────────────────────────────────────────────────

/// Kanban columns of the operations dashboard. Each column is newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Board {
    pub received: Vec<Order>,
    pub preparing: Vec<Order>,
    pub ready: Vec<Order>,
    pub completed: Vec<Order>,
    pub cancelled: Vec<Order>,
}

impl Board {
    pub fn from_orders(orders: Vec<Order>) -> Self {
        let mut board = Self::default();
        for order in orders {
            board.column_mut(order.status).push(order);
        }
        for status in [
            OrderStatus::Received,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            // Undated orders sink to the bottom of their column.
            board
                .column_mut(status)
                .sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
        }
        board
    }

    pub fn column(&self, status: OrderStatus) -> &[Order] {
        match status {
            OrderStatus::Received => &self.received,
            OrderStatus::Preparing => &self.preparing,
            OrderStatus::Ready => &self.ready,
            OrderStatus::Completed => &self.completed,
            OrderStatus::Cancelled => &self.cancelled,
        }
    }

    fn column_mut(&mut self, status: OrderStatus) -> &mut Vec<Order> {
        match status {
            OrderStatus::Received => &mut self.received,
            OrderStatus::Preparing => &mut self.preparing,
            OrderStatus::Ready => &mut self.ready,
            OrderStatus::Completed => &mut self.completed,
            OrderStatus::Cancelled => &mut self.cancelled,
        }
    }
}

// ── Files ────────────────────────────────────────────────────────────────

pub fn load_orders(path: &Path) -> Result<Vec<Order>, OrderError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(OrderError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&data).map_err(|source| OrderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_orders(path: &Path, orders: &[Order]) -> Result<(), OrderError> {
    let json = serde_json::to_string_pretty(orders).map_err(|source| OrderError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes()).map_err(|source| OrderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Look an order up by document id or order number.
pub fn find_order_mut<'a>(orders: &'a mut [Order], id: &str) -> Result<&'a mut Order, OrderError> {
    orders
        .iter_mut()
        .find(|order| order.id == id || order.order_number.as_deref() == Some(id))
        .ok_or_else(|| OrderError::NotFound(id.to_string()))
}

/// Patch the status of one order in `orders`.
pub fn set_status(orders: &mut [Order], id: &str, next: OrderStatus) -> Result<(), OrderError> {
    find_order_mut(orders, id)?.advance(next)
}
