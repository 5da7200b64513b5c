//! The cart store: configured line items, their per-unit extras and the
//! write-back to the local storage slot.
//!
//! Every public operation is total. Operations on a missing line item or an
//! out-of-range unit are logged and ignored; a failed write to the slot is
//! logged and the in-memory state stays authoritative for the session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::catalog::{ExtraOption, ImageRef, SelectedChoiceGroup, SelectedSize};
use crate::identity::compute_config_key;
use crate::pricing;
use crate::storage::CartStorage;

pub type SlotId = u64;

/// Most units one line item may hold. Larger quantities are rejected.
pub const MAX_QUANTITY: u32 = 999;

/// Stored slot ids above this are renumbered on hydration, so allocation
/// never runs out of ids.
const SLOT_ID_CEILING: SlotId = SlotId::MAX / 2;

/// Everything the store needs to add one unit of a configured item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCart {
    pub catalog_item_id: String,
    pub display_name: String,
    pub base_price: Decimal,
    pub selected_size: Option<SelectedSize>,
    pub selected_choices: Option<Vec<SelectedChoiceGroup>>,
    pub available_extras: Vec<ExtraOption>,
    pub image: Option<ImageRef>,
}

impl AddToCart {
    pub fn config_key(&self) -> String {
        compute_config_key(
            &self.catalog_item_id,
            self.selected_size.as_ref(),
            self.selected_choices.as_deref(),
        )
    }
}

/// One physical unit of a line item and the extras applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSlot {
    pub id: SlotId,
    #[serde(default)]
    pub extras: Vec<ExtraOption>,
}

impl UnitSlot {
    fn empty(id: SlotId) -> Self {
        Self {
            id,
            extras: Vec::new(),
        }
    }

    /// Add the extra if absent, remove it if present. An extra without an id
    /// or name is never added. Returns whether the unit changed.
    fn toggle(&mut self, extra: &ExtraOption) -> bool {
        if let Some(pos) = self.extras.iter().position(|e| e.id == extra.id) {
            self.extras.remove(pos);
            return true;
        }
        if extra.id.trim().is_empty() || extra.name.trim().is_empty() {
            warn!(slot = self.id, "attempted to add an incomplete extra");
            return false;
        }
        self.extras.push(extra.clone());
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub config_key: String,
    pub catalog_item_id: String,
    pub display_name: String,
    pub base_price: Decimal,
    quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<SelectedSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_choices: Option<Vec<SelectedChoiceGroup>>,
    #[serde(default)]
    pub available_extras: Vec<ExtraOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default)]
    units: Vec<UnitSlot>,
}

impl CartLineItem {
    fn new(config_key: String, config: AddToCart, first_slot: SlotId) -> Self {
        Self {
            config_key,
            catalog_item_id: config.catalog_item_id,
            display_name: config.display_name,
            base_price: config.base_price,
            quantity: 1,
            selected_size: config.selected_size,
            selected_choices: config.selected_choices,
            available_extras: config.available_extras,
            image: config.image,
            units: vec![UnitSlot::empty(first_slot)],
        }
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn units(&self) -> &[UnitSlot] {
        &self.units
    }

    /// Extras per unit, index-aligned with the units (`len() == quantity`).
    pub fn selected_extras(&self) -> Vec<&[ExtraOption]> {
        self.units.iter().map(|unit| unit.extras.as_slice()).collect()
    }

    pub fn available_extra(&self, id: &str) -> Option<&ExtraOption> {
        self.available_extras.iter().find(|extra| extra.id == id)
    }

    fn unit_index_of(&self, slot: SlotId) -> Option<usize> {
        self.units.iter().position(|unit| unit.id == slot)
    }

    /// Resize to `quantity` units: growing appends empty units, shrinking
    /// drops trailing units. Leading units keep their extras.
    fn resize(&mut self, quantity: u32, mut next_slot: impl FnMut() -> SlotId) {
        let target = quantity as usize;
        if target < self.units.len() {
            self.units.truncate(target);
        }
        while self.units.len() < target {
            self.units.push(UnitSlot::empty(next_slot()));
        }
        self.quantity = quantity;
    }

    /// Bring a line item read back from storage in line with the invariants.
    fn repair(&mut self, mut next_slot: impl FnMut() -> SlotId) {
        for unit in &mut self.units {
            let mut seen = std::collections::HashSet::new();
            unit.extras.retain(|extra| seen.insert(extra.id.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        for unit in &mut self.units {
            if !seen.insert(unit.id) {
                unit.id = next_slot();
            }
        }
        let quantity = self.quantity;
        self.resize(quantity, next_slot);
    }
}

/// The shopping cart. Owned by the composition root and passed by reference
/// to whatever needs it.
pub struct CartStore {
    items: Vec<CartLineItem>,
    is_open: bool,
    next_slot: SlotId,
    storage: Box<dyn CartStorage>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("is_open", &self.is_open)
            .field("slot", &self.storage.slot())
            .finish()
    }
}

impl CartStore {
    /// Empty cart writing to `storage`. Does not read the slot.
    pub fn new(storage: Box<dyn CartStorage>) -> Self {
        Self {
            items: Vec::new(),
            is_open: false,
            next_slot: 1,
            storage,
        }
    }

    /// Cart hydrated from the slot. Missing, unreadable or corrupt data gives
    /// an empty cart.
    pub fn hydrate(storage: Box<dyn CartStorage>) -> Self {
        let mut store = Self::new(storage);
        let raw = match store.storage.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return store,
            Err(err) => {
                warn!(slot = store.storage.slot(), error = %err, "failed to read cart; starting empty");
                return store;
            }
        };
        let items: Vec<CartLineItem> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(err) => {
                warn!(slot = store.storage.slot(), error = %err, "failed to parse cart; starting empty");
                return store;
            }
        };

        let renumber = match items
            .iter()
            .flat_map(|item| item.units.iter().map(|unit| unit.id))
            .max()
        {
            Some(max) if max >= SLOT_ID_CEILING => {
                warn!(slot = store.storage.slot(), max, "stored unit ids out of range; renumbering");
                true
            }
            Some(max) => {
                store.next_slot = max + 1;
                false
            }
            None => false,
        };

        let mut seen = std::collections::HashSet::new();
        for mut item in items {
            if item.quantity == 0 {
                debug!(key = %item.config_key, "dropping zero-quantity line item");
                continue;
            }
            if item.quantity > MAX_QUANTITY {
                warn!(key = %item.config_key, quantity = item.quantity, "line item over the quantity limit dropped");
                continue;
            }
            if !seen.insert(item.config_key.clone()) {
                warn!(key = %item.config_key, "duplicate line item in stored cart dropped");
                continue;
            }
            let mut next = store.next_slot;
            if renumber {
                for unit in &mut item.units {
                    unit.id = next;
                    next += 1;
                }
            }
            item.repair(|| {
                let id = next;
                next += 1;
                id
            });
            store.next_slot = next;
            store.items.push(item);
        }
        store
    }

    fn allocate_slot(&mut self) -> SlotId {
        let id = self.next_slot;
        self.next_slot += 1;
        id
    }

    fn persist(&self) {
        let payload = match serde_json::to_string(&self.items) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "failed to encode cart");
                return;
            }
        };
        if let Err(err) = self.storage.save(&payload) {
            error!(slot = self.storage.slot(), error = %err, "failed to save cart");
        }
    }

    fn position(&self, config_key: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.config_key == config_key)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Add one unit of the configured item and return its configuration key.
    pub fn add_to_cart(&mut self, config: AddToCart) -> String {
        let key = config.config_key();
        match self.position(&key) {
            Some(idx) => {
                if self.items[idx].quantity >= MAX_QUANTITY {
                    error!(key = %key, max = MAX_QUANTITY, "line item is at the quantity limit");
                    return key;
                }
                let slot = self.allocate_slot();
                let item = &mut self.items[idx];
                item.quantity += 1;
                item.units.push(UnitSlot::empty(slot));
                debug!(key = %key, quantity = item.quantity, "merged into existing line item");
            }
            None => {
                let slot = self.allocate_slot();
                self.items.push(CartLineItem::new(key.clone(), config, slot));
                debug!(key = %key, "new line item");
            }
        }
        self.persist();
        key
    }

    pub fn remove_from_cart(&mut self, config_key: &str) {
        let before = self.items.len();
        self.items.retain(|item| item.config_key != config_key);
        if self.items.len() != before {
            self.persist();
        }
    }

    pub fn update_quantity(&mut self, config_key: &str, new_quantity: i64) {
        let Some(idx) = self.position(config_key) else {
            warn!(key = config_key, "attempted to update quantity for non-existent item");
            return;
        };
        if new_quantity <= 0 {
            self.items.remove(idx);
            self.persist();
            return;
        }
        let Some(quantity) = u32::try_from(new_quantity)
            .ok()
            .filter(|quantity| *quantity <= MAX_QUANTITY)
        else {
            error!(key = config_key, quantity = new_quantity, max = MAX_QUANTITY, "quantity over the limit");
            return;
        };
        if quantity == self.items[idx].quantity {
            return;
        }
        let mut next = self.next_slot;
        self.items[idx].resize(quantity, || {
            let id = next;
            next += 1;
            id
        });
        self.next_slot = next;
        self.persist();
    }

    /// Toggle `extra` on the unit at `unit_index`. Positional adapter over
    /// [`CartStore::toggle_extra_on_slot`].
    pub fn update_extra_selection(&mut self, config_key: &str, unit_index: usize, extra: &ExtraOption) {
        let Some(item) = self.get(config_key) else {
            warn!(key = config_key, "attempted to update extra for non-existent item");
            return;
        };
        let Some(unit) = item.units.get(unit_index) else {
            error!(
                key = config_key,
                unit_index,
                quantity = item.quantity,
                "invalid unit index"
            );
            return;
        };
        let slot = unit.id;
        self.toggle_extra_on_slot(config_key, slot, extra);
    }

    /// Toggle `extra` on the unit identified by its stable slot id.
    pub fn toggle_extra_on_slot(&mut self, config_key: &str, slot: SlotId, extra: &ExtraOption) {
        let Some(idx) = self.position(config_key) else {
            warn!(key = config_key, "attempted to update extra for non-existent item");
            return;
        };
        let item = &mut self.items[idx];
        let Some(unit_idx) = item.unit_index_of(slot) else {
            error!(key = config_key, slot, "unknown unit slot");
            return;
        };
        if item.units[unit_idx].toggle(extra) {
            self.persist();
        }
    }

    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.persist();
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, config_key: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.config_key == config_key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn cart_total(&self) -> Decimal {
        pricing::cart_total(&self.items)
    }

    pub fn item_quantity(&self, config_key: &str) -> u32 {
        self.get(config_key).map_or(0, |item| item.quantity)
    }

    // ── Visibility flag (never persisted) ────────────────────────────────

    pub fn open_cart(&mut self) {
        self.is_open = true;
    }

    pub fn close_cart(&mut self) {
        self.is_open = false;
    }

    pub fn toggle_cart(&mut self) {
        self.is_open = !self.is_open;
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SelectedOption;
    use crate::storage::MemoryStorage;

    fn config(id: &str, price: i64) -> AddToCart {
        AddToCart {
            catalog_item_id: id.to_string(),
            display_name: id.to_uppercase(),
            base_price: Decimal::from(price),
            selected_size: None,
            selected_choices: None,
            available_extras: vec![extra("x", 5), extra("y", 7)],
            image: None,
        }
    }

    fn sized(id: &str, size_key: &str, price: i64) -> AddToCart {
        let mut cfg = config(id, price);
        cfg.selected_size = Some(SelectedSize {
            label: size_key.to_string(),
            price: Decimal::from(price),
            key: size_key.to_string(),
        });
        cfg.display_name = format!("{} ({size_key})", cfg.display_name);
        cfg
    }

    fn extra(id: &str, price: i64) -> ExtraOption {
        ExtraOption {
            id: id.to_string(),
            name: format!("Extra {id}"),
            price: Decimal::from(price),
            available: true,
        }
    }

    fn store() -> (CartStore, MemoryStorage) {
        let storage = MemoryStorage::default();
        (CartStore::new(Box::new(storage.clone())), storage)
    }

    fn extras_of(store: &CartStore, key: &str) -> Vec<Vec<String>> {
        store
            .get(key)
            .unwrap()
            .selected_extras()
            .iter()
            .map(|unit| unit.iter().map(|e| e.id.clone()).collect())
            .collect()
    }

    #[test]
    fn identical_adds_merge_into_one_line() {
        let (mut cart, _) = store();
        for _ in 0..3 {
            cart.add_to_cart(config("a", 30));
        }
        assert_eq!(cart.items().len(), 1);
        let item = &cart.items()[0];
        assert_eq!(item.quantity(), 3);
        assert_eq!(item.selected_extras().len(), 3);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn choice_click_order_does_not_split_lines() {
        let (mut cart, _) = store();
        let option = |key: &str| SelectedOption {
            key: key.to_string(),
            name: key.to_string(),
            price_delta: Decimal::ZERO,
        };
        let mut first = config("a", 30);
        first.selected_choices = Some(vec![SelectedChoiceGroup {
            group_id: "sauce".into(),
            choice_name: "Sauce".into(),
            selected_options: vec![option("bbq"), option("hot")],
        }]);
        let mut second = first.clone();
        second.selected_choices.as_mut().unwrap()[0]
            .selected_options
            .reverse();

        let k1 = cart.add_to_cart(first);
        let k2 = cart.add_to_cart(second);
        assert_eq!(k1, k2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_quantity(&k1), 2);
    }

    #[test]
    fn different_sizes_stay_separate() {
        let (mut cart, _) = store();
        let large = cart.add_to_cart(sized("a", "large", 60));
        let small = cart.add_to_cart(sized("a", "small", 40));
        assert_ne!(large, small);
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.cart_total(), Decimal::from(100));
    }

    #[test]
    fn quantity_zero_removes_line() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_quantity(&key, 0);
        assert!(cart.is_empty());
        assert_eq!(cart.item_quantity(&key), 0);

        let key = cart.add_to_cart(config("a", 30));
        cart.update_quantity(&key, -3);
        assert!(cart.get(&key).is_none());
    }

    #[test]
    fn growing_quantity_keeps_leading_extras() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_quantity(&key, 2);
        cart.update_extra_selection(&key, 1, &extra("x", 5));

        cart.update_quantity(&key, 4);
        assert_eq!(
            extras_of(&cart, &key),
            vec![vec![], vec!["x".to_string()], vec![], vec![]]
        );
    }

    #[test]
    fn shrinking_quantity_drops_trailing_units() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_quantity(&key, 3);
        cart.update_extra_selection(&key, 0, &extra("x", 5));
        cart.update_extra_selection(&key, 2, &extra("y", 7));

        cart.update_quantity(&key, 2);
        assert_eq!(extras_of(&cart, &key), vec![vec!["x".to_string()], vec![]]);
        assert_eq!(cart.get(&key).unwrap().quantity(), 2);
    }

    #[test]
    fn new_unit_from_add_starts_without_extras() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_extra_selection(&key, 0, &extra("x", 5));
        cart.add_to_cart(config("a", 30));
        assert_eq!(extras_of(&cart, &key), vec![vec!["x".to_string()], vec![]]);
    }

    #[test]
    fn double_toggle_restores_unit() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_extra_selection(&key, 0, &extra("y", 7));
        let before = extras_of(&cart, &key);
        cart.update_extra_selection(&key, 0, &extra("x", 5));
        cart.update_extra_selection(&key, 0, &extra("x", 5));
        assert_eq!(extras_of(&cart, &key), before);
    }

    #[test]
    fn extra_appears_at_most_once_per_unit() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        let mut renamed = extra("x", 5);
        cart.update_extra_selection(&key, 0, &renamed);
        renamed.name = "Renamed".into();
        cart.update_extra_selection(&key, 0, &renamed);
        assert!(cart.get(&key).unwrap().selected_extras()[0].is_empty());
    }

    #[test]
    fn invalid_operations_are_no_ops() {
        let (mut cart, storage) = store();
        let key = cart.add_to_cart(config("a", 30));
        let writes = storage.write_count();

        cart.update_extra_selection(&key, 1, &extra("x", 5));
        cart.update_extra_selection("missing", 0, &extra("x", 5));
        cart.update_extra_selection(&key, 0, &extra("", 5));
        let mut nameless = extra("z", 1);
        nameless.name = String::new();
        cart.update_extra_selection(&key, 0, &nameless);
        cart.update_quantity("missing", 3);
        cart.remove_from_cart("missing");

        assert_eq!(storage.write_count(), writes);
        assert_eq!(extras_of(&cart, &key), vec![Vec::<String>::new()]);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn slot_ids_survive_quantity_changes() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_quantity(&key, 3);
        let slot = cart.get(&key).unwrap().units()[1].id;
        cart.toggle_extra_on_slot(&key, slot, &extra("x", 5));
        cart.update_quantity(&key, 2);
        let item = cart.get(&key).unwrap();
        assert_eq!(item.units()[1].id, slot);
        assert_eq!(item.units()[1].extras.len(), 1);

        let ids: std::collections::HashSet<_> = item.units().iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn end_to_end_totals() {
        let (mut cart, _) = store();
        let key = cart.add_to_cart(config("a", 30));
        assert_eq!(cart.cart_total(), Decimal::from(30));
        cart.add_to_cart(config("a", 30));
        assert_eq!(cart.item_quantity(&key), 2);
        assert_eq!(cart.cart_total(), Decimal::from(60));
        cart.update_extra_selection(&key, 0, &extra("x", 5));
        assert_eq!(cart.cart_total(), Decimal::from(65));
        cart.remove_from_cart(&key);
        assert!(cart.is_empty());
        assert_eq!(cart.cart_total(), Decimal::ZERO);
    }

    #[test]
    fn every_mutation_is_written_back() {
        let (mut cart, storage) = store();
        let key = cart.add_to_cart(config("a", 30));
        cart.update_quantity(&key, 2);
        cart.update_extra_selection(&key, 1, &extra("x", 5));
        assert_eq!(storage.write_count(), 3);

        let saved: Vec<CartLineItem> = serde_json::from_str(&storage.contents().unwrap()).unwrap();
        assert_eq!(saved, cart.items().to_vec());

        cart.clear_cart();
        assert_eq!(storage.contents().as_deref(), Some("[]"));
    }

    #[test]
    fn failed_writes_do_not_lose_state() {
        let (mut cart, storage) = store();
        storage.fail_writes(true);
        let key = cart.add_to_cart(config("a", 30));
        cart.add_to_cart(config("a", 30));
        assert_eq!(cart.item_quantity(&key), 2);
        assert!(storage.contents().is_none());
    }

    #[test]
    fn hydrate_restores_and_repairs() {
        let storage = MemoryStorage::default();
        {
            let mut cart = CartStore::new(Box::new(storage.clone()));
            let key = cart.add_to_cart(config("a", 30));
            cart.update_quantity(&key, 2);
            cart.update_extra_selection(&key, 1, &extra("x", 5));
            cart.open_cart();
        }
        let cart = CartStore::hydrate(Box::new(storage.clone()));
        assert!(!cart.is_open());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.cart_total(), Decimal::from(65));

        storage.set_contents(
            r#"[{"configKey":"a","catalogItemId":"a","displayName":"A","basePrice":10,
                 "quantity":3,"units":[{"id":1,"extras":[]}]},
                {"configKey":"b","catalogItemId":"b","displayName":"B","basePrice":10,
                 "quantity":0,"units":[]}]"#,
        );
        let cart = CartStore::hydrate(Box::new(storage));
        assert_eq!(cart.items().len(), 1);
        let item = cart.get("a").unwrap();
        assert_eq!(item.selected_extras().len(), 3);
        let ids: std::collections::HashSet<_> = item.units().iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn hydrate_treats_garbage_as_empty() {
        let storage = MemoryStorage::default();
        storage.set_contents("{not json");
        let cart = CartStore::hydrate(Box::new(storage));
        assert!(cart.is_empty());
    }

    #[test]
    fn hydrate_renumbers_exhausted_slot_ids() {
        let storage = MemoryStorage::default();
        storage.set_contents(
            r#"[{"configKey":"a","catalogItemId":"a","displayName":"A","basePrice":10,
                 "quantity":2,"units":[{"id":18446744073709551615,"extras":[]},
                                       {"id":18446744073709551614,"extras":[]}]}]"#,
        );
        let mut cart = CartStore::hydrate(Box::new(storage));
        let ids: Vec<_> = cart.get("a").unwrap().units().iter().map(|u| u.id).collect();
        assert_eq!(ids, [1, 2]);

        cart.update_quantity("a", 3);
        cart.add_to_cart(config("b", 5));
        let mut all: Vec<_> = cart
            .items()
            .iter()
            .flat_map(|item| item.units().iter().map(|u| u.id))
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn quantity_above_limit_is_rejected() {
        let (mut cart, storage) = store();
        let key = cart.add_to_cart(config("a", 30));
        let writes = storage.write_count();

        cart.update_quantity(&key, i64::from(MAX_QUANTITY) + 1);
        cart.update_quantity(&key, i64::MAX);
        assert_eq!(cart.item_quantity(&key), 1);
        assert_eq!(storage.write_count(), writes);

        cart.update_quantity(&key, i64::from(MAX_QUANTITY));
        assert_eq!(cart.get(&key).unwrap().units().len(), MAX_QUANTITY as usize);
        cart.add_to_cart(config("a", 30));
        assert_eq!(cart.item_quantity(&key), MAX_QUANTITY);
    }

    #[test]
    fn hydrate_drops_lines_over_the_limit() {
        let storage = MemoryStorage::default();
        storage.set_contents(
            r#"[{"configKey":"a","catalogItemId":"a","displayName":"A","basePrice":10,
                 "quantity":4000000000,"units":[]},
                {"configKey":"b","catalogItemId":"b","displayName":"B","basePrice":10,
                 "quantity":1,"units":[{"id":1,"extras":[]}]}]"#,
        );
        let cart = CartStore::hydrate(Box::new(storage));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_quantity("b"), 1);
    }

    #[test]
    fn incomplete_extra_from_storage_can_be_removed() {
        let storage = MemoryStorage::default();
        storage.set_contents(
            r#"[{"configKey":"a","catalogItemId":"a","displayName":"A","basePrice":10,
                 "quantity":1,"units":[{"id":1,"extras":[
                    {"_id":"z","name":"","price":2}]}]}]"#,
        );
        let mut cart = CartStore::hydrate(Box::new(storage.clone()));
        assert_eq!(extras_of(&cart, "a"), vec![vec!["z".to_string()]]);

        let mut nameless = extra("z", 2);
        nameless.name = String::new();
        cart.update_extra_selection("a", 0, &nameless);
        assert_eq!(extras_of(&cart, "a"), vec![Vec::<String>::new()]);
        assert_eq!(storage.write_count(), 1);

        cart.update_extra_selection("a", 0, &nameless);
        assert_eq!(extras_of(&cart, "a"), vec![Vec::<String>::new()]);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn visibility_flag_toggles() {
        let (mut cart, storage) = store();
        cart.toggle_cart();
        assert!(cart.is_open());
        cart.close_cart();
        assert!(!cart.is_open());
        cart.open_cart();
        assert!(cart.is_open());
        assert_eq!(storage.write_count(), 0);
    }
}
