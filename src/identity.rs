use crate::catalog::{SelectedChoiceGroup, SelectedSize};

/// Derive the configuration key of a line item.
///
/// Two additions of the same item with the same size and the same set of
/// choice options produce the same key no matter in which order the options
/// were picked. A bare item keys to its own id.
pub fn compute_config_key(
    catalog_item_id: &str,
    selected_size: Option<&SelectedSize>,
    selected_choices: Option<&[SelectedChoiceGroup]>,
) -> String {
    let mut key = catalog_item_id.to_string();

    if let Some(size) = selected_size {
        if !size.key.is_empty() {
            key.push_str("_size-");
            key.push_str(&size.key);
        }
    }

    let Some(groups) = selected_choices.filter(|groups| !groups.is_empty()) else {
        return key;
    };

    let mut sorted: Vec<&SelectedChoiceGroup> = groups.iter().collect();
    sorted.sort_by(|a, b| a.group_id.cmp(&b.group_id));

    for group in sorted {
        key.push_str("_choice-");
        key.push_str(&group.group_id);
        if group.selected_options.is_empty() {
            continue;
        }
        let mut option_keys: Vec<&str> = group
            .selected_options
            .iter()
            .map(|option| option.key.as_str())
            .collect();
        option_keys.sort_unstable();
        key.push('-');
        key.push_str(&option_keys.join(","));
    }

    key
}
