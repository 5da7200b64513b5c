use std::collections::BTreeMap;

use crate::cart::AddToCart;
use crate::catalog::{CatalogItem, Pricing, SelectedChoiceGroup, SelectedOption, SelectedSize};
use crate::error::SelectionError;

/// A customer's picks for one catalog item, turned into an [`AddToCart`]
/// once validated against the item.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    item: &'a CatalogItem,
    size: Option<String>,
    choices: BTreeMap<String, Vec<String>>,
}

impl<'a> Selection<'a> {
    pub fn new(item: &'a CatalogItem) -> Self {
        Self {
            item,
            size: None,
            choices: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn size(mut self, key: impl Into<String>) -> Self {
        self.size = Some(key.into());
        self
    }

    /// Pick `option` in choice group `group`. Picking the same option twice
    /// counts once.
    #[must_use]
    pub fn choose(mut self, group: impl Into<String>, option: impl Into<String>) -> Self {
        let option = option.into();
        let picks = self.choices.entry(group.into()).or_default();
        if !picks.contains(&option) {
            picks.push(option);
        }
        self
    }

    pub fn build(self) -> Result<AddToCart, SelectionError> {
        let item = self.item;
        if !item.available {
            return Err(SelectionError::Unavailable {
                item: item.name.clone(),
            });
        }

        let (base_price, selected_size) = match (&item.pricing, self.size.as_deref()) {
            (Pricing::Flat(price), None) => (*price, None),
            (Pricing::Flat(_), Some(_)) => {
                return Err(SelectionError::SizeNotOffered {
                    item: item.name.clone(),
                });
            }
            (Pricing::Sized(_), None) => {
                return Err(SelectionError::SizeRequired {
                    item: item.name.clone(),
                });
            }
            (Pricing::Sized(_), Some(key)) => {
                let size = item.size(key).ok_or_else(|| SelectionError::UnknownSize {
                    item: item.name.clone(),
                    key: key.to_string(),
                })?;
                (size.price, Some(SelectedSize::from(size)))
            }
        };

        if let Some(group) = self
            .choices
            .keys()
            .find(|group| item.choice_group(group).is_none())
        {
            return Err(SelectionError::UnknownGroup {
                item: item.name.clone(),
                group: group.clone(),
            });
        }

        let mut selected_choices = Vec::new();
        for group in &item.choices {
            let picks = self.choices.get(&group.id).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(unknown) = picks.iter().find(|key| group.option(key).is_none()) {
                return Err(SelectionError::UnknownOption {
                    group: group.name.clone(),
                    option: unknown.clone(),
                });
            }
            if picks.is_empty() {
                if group.required {
                    return Err(SelectionError::ChoiceRequired {
                        group: group.name.clone(),
                    });
                }
                continue;
            }
            if picks.len() > group.max_selections as usize {
                return Err(SelectionError::TooManyChoices {
                    group: group.name.clone(),
                    max: group.max_selections,
                    got: picks.len(),
                });
            }
            selected_choices.push(SelectedChoiceGroup {
                group_id: group.id.clone(),
                choice_name: group.name.clone(),
                selected_options: group
                    .options
                    .iter()
                    .filter(|option| picks.contains(&option.key))
                    .map(SelectedOption::from)
                    .collect(),
            });
        }

        let display_name = match &selected_size {
            Some(size) => format!("{} ({})", item.name, size.label),
            None => item.name.clone(),
        };

        Ok(AddToCart {
            catalog_item_id: item.id.clone(),
            display_name,
            base_price,
            selected_size,
            selected_choices: (!selected_choices.is_empty()).then_some(selected_choices),
            available_extras: item.offered_extras(),
            image: item.image.clone(),
        })
    }
}
