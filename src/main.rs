use clap::Parser;
use tracing::debug;

use drift_cart::catalog::{find_item, load_catalog, Pricing};
use drift_cart::checkout::{Checkout, CheckoutDetails, ProofOfPayment};
use drift_cart::cli::{Cli, Command};
use drift_cart::config::{AppConfig, Overrides};
use drift_cart::orders::{find_order_mut, load_orders, save_orders, Board, OrderStatus};
use drift_cart::pricing::{format_amount, line_total};
use drift_cart::selection::Selection;
use drift_cart::types::{CartView, MenuEntry};
use drift_cart::cart::MAX_QUANTITY;
use drift_cart::{init_logging, CartLineItem, CartStore, Error, Result};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        workspace: cli.workspace,
        storage: cli.storage,
    };
    let lookup = |name: &str| std::env::var(name).ok();
    let config = AppConfig::load(&overrides, &lookup)?;
    init_logging(&config.log);
    debug!(workspace = %config.workspace.display(), storage = %config.storage, "config resolved");

    match cli.command {
        Command::Menu { json } => {
            let items = load_catalog(&config.catalog)?;
            if json {
                let entries: Vec<MenuEntry> = items.iter().map(MenuEntry::from).collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            for item in &items {
                let marker = if item.available { "" } else { " (unavailable)" };
                println!(
                    "{:<20} {} from {}{marker}",
                    item.id,
                    item.name,
                    format_amount(item.starting_price(), &config.currency)
                );
                if let Pricing::Sized(sizes) = &item.pricing {
                    for size in sizes {
                        println!(
                            "    size {:<12} {} {}",
                            size.key,
                            size.label,
                            format_amount(size.price, &config.currency)
                        );
                    }
                }
                for group in &item.choices {
                    let options: Vec<&str> = group.options.iter().map(|o| o.key.as_str()).collect();
                    let rule = if group.required { "required" } else { "optional" };
                    println!(
                        "    choice {:<10} {rule}, up to {}: {}",
                        group.id,
                        group.max_selections,
                        options.join(", ")
                    );
                }
                for extra in item.offered_extras() {
                    println!(
                        "    extra {:<11} {} {}",
                        extra.id,
                        extra.name,
                        format_amount(extra.price, &config.currency)
                    );
                }
            }
            Ok(())
        }

        Command::Add {
            item,
            size,
            choices,
            quantity,
        } => {
            if quantity == 0 || quantity > MAX_QUANTITY {
                return Err(Error::Usage(format!(
                    "quantity must be between 1 and {MAX_QUANTITY}"
                )));
            }
            let catalog = load_catalog(&config.catalog)?;
            let entry = find_item(&catalog, &item)
                .ok_or_else(|| Error::Usage(format!("unknown catalog item `{item}`")))?;
            let mut selection = Selection::new(entry);
            if let Some(size) = size {
                selection = selection.size(size);
            }
            for pick in &choices {
                let (group, options) = pick.split_once('=').ok_or_else(|| {
                    Error::Usage(format!("choice `{pick}` must look like group=option[,option]"))
                })?;
                for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                    selection = selection.choose(group.trim(), option);
                }
            }
            let add = selection.build()?;

            let mut cart = CartStore::hydrate(config.open_storage()?);
            let key = add.config_key();
            let target = cart.item_quantity(&key) + quantity;
            if target > MAX_QUANTITY {
                return Err(Error::Usage(format!(
                    "{key} would reach {target} units; the limit is {MAX_QUANTITY}"
                )));
            }
            cart.add_to_cart(add.clone());
            if quantity > 1 {
                cart.update_quantity(&key, i64::from(target));
            }
            println!(
                "Added {quantity} x {} ({key}); {} in cart",
                add.display_name,
                cart.item_quantity(&key)
            );
            Ok(())
        }

        Command::Remove { key } => {
            let mut cart = CartStore::hydrate(config.open_storage()?);
            require_line(&cart, &key)?;
            cart.remove_from_cart(&key);
            println!("Removed {key}");
            Ok(())
        }

        Command::Quantity { key, quantity } => {
            if quantity > i64::from(MAX_QUANTITY) {
                return Err(Error::Usage(format!(
                    "quantity must be at most {MAX_QUANTITY}"
                )));
            }
            let mut cart = CartStore::hydrate(config.open_storage()?);
            require_line(&cart, &key)?;
            cart.update_quantity(&key, quantity);
            match cart.item_quantity(&key) {
                0 => println!("Removed {key}"),
                n => println!("{key}: quantity {n}"),
            }
            Ok(())
        }

        Command::Extra { key, unit, extra } => {
            let mut cart = CartStore::hydrate(config.open_storage()?);
            let line = require_line(&cart, &key)?;
            if unit >= line.quantity() as usize {
                return Err(Error::Usage(format!(
                    "unit {unit} is out of range; {key} has {} unit(s)",
                    line.quantity()
                )));
            }
            let option = line.available_extra(&extra).cloned().ok_or_else(|| {
                Error::Usage(format!("extra `{extra}` is not offered for {key}"))
            })?;
            cart.update_extra_selection(&key, unit, &option);
            let picked = cart
                .get(&key)
                .and_then(|line| line.units().get(unit))
                .is_some_and(|slot| slot.extras.iter().any(|e| e.id == option.id));
            let verb = if picked { "Added" } else { "Removed" };
            println!("{verb} {} on unit {unit} of {key}", option.name);
            Ok(())
        }

        Command::Show { json } => {
            let cart = CartStore::hydrate(config.open_storage()?);
            if json {
                println!("{}", serde_json::to_string_pretty(&CartView::from(&cart))?);
                return Ok(());
            }
            print_cart(&cart, &config.currency);
            Ok(())
        }

        Command::Clear => {
            let mut cart = CartStore::hydrate(config.open_storage()?);
            cart.clear_cart();
            println!("Cart cleared");
            Ok(())
        }

        Command::Checkout {
            payment,
            phone,
            name,
            email,
            whatsapp,
            notes,
            proof,
        } => {
            let mut cart = CartStore::hydrate(config.open_storage()?);
            let details = CheckoutDetails {
                payment_method: payment,
                phone,
                name,
                email,
                whatsapp,
                notes,
            };
            let proof = proof
                .as_deref()
                .map(ProofOfPayment::from_path)
                .transpose()?;
            let mut checkout = Checkout::new(config.gateway()?, config.phone_rule()?);
            let receipt = checkout.submit(&mut cart, &details, proof.as_ref())?;
            println!(
                "Order placed successfully! Your Order Number is: {} ({})",
                receipt.order_number,
                format_amount(receipt.total, &config.currency)
            );
            Ok(())
        }

        Command::Board { json, all } => {
            let board = Board::from_orders(load_orders(&config.orders)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
                return Ok(());
            }
            let mut columns = vec![OrderStatus::Received, OrderStatus::Preparing, OrderStatus::Ready];
            if all {
                columns.push(OrderStatus::Completed);
            }
            for status in columns {
                let orders = board.column(status);
                println!("{} ({})", status.label(), orders.len());
                for order in orders {
                    println!(
                        "  {:<14} {:<20} {} item(s) {} {}",
                        order.display_number(),
                        order.customer.name.as_deref().unwrap_or("-"),
                        order.item_count(),
                        format_amount(order.total_amount.unwrap_or_default(), &config.currency),
                        order.payment_method.label()
                    );
                }
            }
            if !board.cancelled.is_empty() {
                println!("Cancelled ({})", board.cancelled.len());
                for order in &board.cancelled {
                    println!("  {}", order.display_number());
                }
            }
            Ok(())
        }

        Command::Advance { order, to } => {
            let mut orders = load_orders(&config.orders)?;
            let found = find_order_mut(&mut orders, &order)?;
            let next = to.or_else(|| found.status.next()).ok_or_else(|| {
                Error::Usage(format!("order {order} is already {}", found.status.label()))
            })?;
            found.advance(next)?;
            let number = found.display_number().to_string();
            save_orders(&config.orders, &orders)?;
            println!("{number}: {}", next.label());
            Ok(())
        }
    }
}

fn require_line<'a>(cart: &'a CartStore, key: &str) -> Result<&'a CartLineItem> {
    cart.get(key)
        .ok_or_else(|| Error::Usage(format!("no line item `{key}` in the cart")))
}

fn print_cart(cart: &CartStore, currency: &str) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    println!("Your Order ({})", cart.total_items());
    for item in cart.items() {
        println!(
            "{} x {:<28} {:>10}   [{}]",
            item.quantity(),
            item.display_name,
            format_amount(line_total(item), currency),
            item.config_key
        );
        for group in item.selected_choices.iter().flatten() {
            let names: Vec<&str> = group
                .selected_options
                .iter()
                .map(|o| o.name.as_str())
                .collect();
            println!("    {}: {}", group.choice_name, names.join(", "));
        }
        for (index, extras) in item.selected_extras().iter().enumerate() {
            if extras.is_empty() {
                continue;
            }
            let names: Vec<&str> = extras.iter().map(|e| e.name.as_str()).collect();
            println!("    unit {}: {}", index + 1, names.join(", "));
        }
    }
    println!("Total: {}", format_amount(cart.cart_total(), currency));
}
