//! Drift shopping cart: catalog normalization, configured cart line items
//! with per-unit extras, pricing, local persistence, checkout and the
//! order board.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod orders;
pub mod pricing;
pub mod selection;
pub mod storage;
pub mod types;
mod util;

pub use cart::{AddToCart, CartLineItem, CartStore, SlotId, UnitSlot};
pub use catalog::{CatalogItem, ExtraOption, load_catalog};
pub use checkout::{Checkout, CheckoutDetails, CheckoutPayload, HttpGateway, OrderGateway, ProofOfPayment};
pub use config::{AppConfig, StorageBackend};
pub use error::{Error, Result};
pub use identity::compute_config_key;
pub use orders::{Board, Order, OrderStatus, PaymentMethod};
pub use selection::Selection;
pub use storage::{CartStorage, FileStorage, MemoryStorage, SqliteStorage};

/// Install the stderr subscriber. `RUST_LOG` wins, then `level`, then `info`.
pub fn init_logging(level: &str) {
    let fallback = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
