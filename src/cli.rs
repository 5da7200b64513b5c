use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::StorageBackend;
use crate::orders::{OrderStatus, PaymentMethod};

#[derive(Parser)]
#[command(name = "drift")]
#[command(about = "Shopping cart, checkout and order board for the Drift menu", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Workspace directory holding config, catalog, orders and the cart.
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Cart storage backend: sqlite, file or memory.
    #[arg(long, global = true)]
    pub storage: Option<StorageBackend>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the catalog.
    Menu {
        #[arg(long)]
        json: bool,
    },

    /// Add a configured catalog item to the cart.
    Add {
        /// Catalog item id.
        item: String,
        /// Size key, required for sized items.
        #[arg(long)]
        size: Option<String>,
        /// Choice picks as group=option[,option] (repeatable).
        #[arg(long = "choice")]
        choices: Vec<String>,
        /// How many to add.
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },

    /// Remove a line item.
    Remove { key: String },

    /// Set the quantity of a line item. Zero or less removes it.
    Quantity {
        key: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Toggle an extra on one unit of a line item.
    Extra {
        key: String,
        /// Zero-based unit index.
        unit: usize,
        /// Extra id.
        extra: String,
    },

    /// Show the cart.
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Empty the cart.
    Clear,

    /// Place the order.
    Checkout {
        #[arg(long)]
        payment: Option<PaymentMethod>,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        whatsapp: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Proof-of-payment file for eWallet and MoMo.
        #[arg(long)]
        proof: Option<PathBuf>,
    },

    /// Show orders grouped by status.
    Board {
        #[arg(long)]
        json: bool,
        /// Include completed orders.
        #[arg(long)]
        all: bool,
    },

    /// Move an order to its next status, or to `--to`.
    Advance {
        /// Order id or order number.
        order: String,
        #[arg(long)]
        to: Option<OrderStatus>,
    },
}
