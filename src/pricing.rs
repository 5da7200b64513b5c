use rust_decimal::{Decimal, RoundingStrategy};

use crate::cart::CartLineItem;

/// Price delta of all picked choice options for one unit.
pub fn choice_add_on(item: &CartLineItem) -> Decimal {
    item.selected_choices
        .iter()
        .flatten()
        .flat_map(|group| group.selected_options.iter())
        .map(|option| option.price_delta)
        .sum()
}

pub fn unit_price(item: &CartLineItem) -> Decimal {
    item.base_price + choice_add_on(item)
}

/// Sum of the extras across every unit. Already per unit, so it is not
/// multiplied by the quantity again.
pub fn extras_total(item: &CartLineItem) -> Decimal {
    item.units()
        .iter()
        .flat_map(|unit| unit.extras.iter())
        .map(|extra| extra.price)
        .sum()
}

pub fn line_total(item: &CartLineItem) -> Decimal {
    unit_price(item) * Decimal::from(item.quantity()) + extras_total(item)
}

pub fn cart_total(items: &[CartLineItem]) -> Decimal {
    items.iter().map(line_total).sum()
}

/// Two decimal places with a currency prefix, e.g. `E110.00`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{currency}{rounded:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{AddToCart, CartStore};
    use crate::catalog::{ExtraOption, SelectedChoiceGroup, SelectedOption};
    use crate::storage::MemoryStorage;

    fn store() -> CartStore {
        CartStore::new(Box::new(MemoryStorage::default()))
    }

    fn cheese() -> ExtraOption {
        ExtraOption {
            id: "cheese".into(),
            name: "Cheese".into(),
            price: Decimal::from(10),
            available: true,
        }
    }

    fn plain(price: Decimal) -> AddToCart {
        AddToCart {
            catalog_item_id: "burger".into(),
            display_name: "Burger".into(),
            base_price: price,
            selected_size: None,
            selected_choices: None,
            available_extras: vec![cheese()],
            image: None,
        }
    }

    #[test]
    fn extras_are_not_multiplied_by_quantity() {
        let mut cart = store();
        let key = cart.add_to_cart(plain(Decimal::from(50)));
        cart.update_quantity(&key, 2);
        cart.update_extra_selection(&key, 1, &cheese());

        let item = cart.get(&key).unwrap();
        assert_eq!(extras_total(item), Decimal::from(10));
        assert_eq!(line_total(item), Decimal::from(110));
    }

    #[test]
    fn choice_deltas_apply_per_unit() {
        let mut cart = store();
        let mut config = plain(Decimal::new(4550, 2));
        config.selected_choices = Some(vec![SelectedChoiceGroup {
            group_id: "sauce".into(),
            choice_name: "Sauce".into(),
            selected_options: vec![
                SelectedOption {
                    key: "hot".into(),
                    name: "Hot".into(),
                    price_delta: Decimal::new(250, 2),
                },
                SelectedOption {
                    key: "bbq".into(),
                    name: "BBQ".into(),
                    price_delta: Decimal::from(2),
                },
            ],
        }]);
        let key = cart.add_to_cart(config);
        cart.update_quantity(&key, 3);

        let item = cart.get(&key).unwrap();
        assert_eq!(choice_add_on(item), Decimal::new(450, 2));
        assert_eq!(unit_price(item), Decimal::from(50));
        assert_eq!(line_total(item), Decimal::from(150));
    }

    #[test]
    fn cart_total_sums_line_totals() {
        let mut cart = store();
        let a = cart.add_to_cart(plain(Decimal::from(30)));
        let mut other = plain(Decimal::from(12));
        other.catalog_item_id = "chips".into();
        let b = cart.add_to_cart(other);
        cart.update_quantity(&b, 2);
        cart.update_extra_selection(&a, 0, &cheese());

        let expected: Decimal = cart.items().iter().map(line_total).sum();
        assert_eq!(cart_total(cart.items()), expected);
        assert_eq!(expected, Decimal::from(64));
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(Decimal::from(110), "E"), "E110.00");
        assert_eq!(format_amount(Decimal::new(12345, 3), "R"), "R12.35");
    }
}
