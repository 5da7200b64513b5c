use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::{CartLineItem, CartStore, SlotId};
use crate::catalog::{CatalogItem, Pricing, SelectedChoiceGroup};
use crate::pricing::{line_total, unit_price};

#[derive(Debug, Serialize)]
pub struct UnitView {
    pub slot: SlotId,
    pub extras: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LineView {
    pub key: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<SelectedChoiceGroup>>,
    pub units: Vec<UnitView>,
}

impl From<&CartLineItem> for LineView {
    fn from(item: &CartLineItem) -> Self {
        Self {
            key: item.config_key.clone(),
            name: item.display_name.clone(),
            quantity: item.quantity(),
            unit_price: unit_price(item),
            line_total: line_total(item),
            choices: item.selected_choices.clone(),
            units: item
                .units()
                .iter()
                .map(|unit| UnitView {
                    slot: unit.id,
                    extras: unit.extras.iter().map(|extra| extra.id.clone()).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<LineView>,
    pub total_items: u64,
    pub total: Decimal,
}

impl From<&CartStore> for CartView {
    fn from(cart: &CartStore) -> Self {
        Self {
            items: cart.items().iter().map(LineView::from).collect(),
            total_items: cart.total_items(),
            total: cart.cart_total(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuEntry {
    pub id: String,
    pub name: String,
    pub from_price: Decimal,
    pub sizes: Vec<String>,
    pub choice_groups: Vec<String>,
    pub extras: Vec<String>,
    pub available: bool,
}

impl From<&CatalogItem> for MenuEntry {
    fn from(item: &CatalogItem) -> Self {
        let sizes = match &item.pricing {
            Pricing::Flat(_) => Vec::new(),
            Pricing::Sized(sizes) => sizes.iter().map(|size| size.key.clone()).collect(),
        };
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            from_price: item.starting_price(),
            sizes,
            choice_groups: item.choices.iter().map(|group| group.id.clone()).collect(),
            extras: item.offered_extras().into_iter().map(|extra| extra.id).collect(),
            available: item.available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::AddToCart;
    use crate::catalog::ExtraOption;
    use crate::storage::MemoryStorage;

    #[test]
    fn cart_view_reports_units_and_totals() {
        let fries = ExtraOption {
            id: "fries".into(),
            name: "Fries".into(),
            price: Decimal::from(15),
            available: true,
        };
        let mut cart = CartStore::new(Box::new(MemoryStorage::default()));
        let key = cart.add_to_cart(AddToCart {
            catalog_item_id: "burger".into(),
            display_name: "Burger".into(),
            base_price: Decimal::from(40),
            selected_size: None,
            selected_choices: None,
            available_extras: vec![fries.clone()],
            image: None,
        });
        cart.update_quantity(&key, 2);
        cart.update_extra_selection(&key, 0, &fries);

        let view = CartView::from(&cart);
        assert_eq!(view.total_items, 2);
        assert_eq!(view.total, Decimal::from(95));
        assert_eq!(view.items[0].units.len(), 2);
        assert_eq!(view.items[0].units[0].extras, ["fries"]);
        assert!(view.items[0].units[1].extras.is_empty());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["items"][0].get("choices").is_none());
    }
}
