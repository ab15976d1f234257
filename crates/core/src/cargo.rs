//! Inventory classification for the cargo tab.
//!
//! Pure, deterministic grouping of the vehicle's loose items; the sheet
//! renders the result as-is.

use std::collections::BTreeMap;

use crate::host::ItemDoc;

/// Item kinds the cargo view never lists; they have dedicated tabs or
/// make no sense in a vehicle hold.
pub const EXCLUDED_KINDS: &[&str] = &[
    "weapon",
    "armor",
    "skill",
    "role",
    "criticalInjury",
    "cyberware",
    "cyberdeck",
    "netarch",
    "program",
];

/// A display group of cargo items.
#[derive(Debug, Clone)]
pub struct CargoCategory {
    /// Capitalised kind label.
    pub label: String,
    /// Items of this kind, alphabetical by name.
    pub items: Vec<ItemDoc>,
}

/// Everything that counts as cargo: items of any non-excluded kind.
pub fn cargo_items(items: &[ItemDoc]) -> Vec<ItemDoc> {
    items
        .iter()
        .filter(|item| !EXCLUDED_KINDS.contains(&item.kind.as_str()))
        .cloned()
        .collect()
}

/// Group items by kind: categories alphabetical by label, items
/// alphabetical by name, labels capitalised for display. Empty input
/// yields an empty result.
pub fn classify(items: &[ItemDoc]) -> Vec<CargoCategory> {
    let mut grouped: BTreeMap<&str, Vec<ItemDoc>> = BTreeMap::new();
    for item in items {
        grouped.entry(item.kind.as_str()).or_default().push(item.clone());
    }

    grouped
        .into_iter()
        .map(|(kind, mut items)| {
            items.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.name.cmp(&b.name))
            });
            CargoCategory {
                label: capitalize(kind),
                items,
            }
        })
        .collect()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;

    fn item(kind: &str, name: &str) -> ItemDoc {
        ItemDoc {
            id: ItemId::new(format!("Item.{kind}.{name}")),
            name: name.to_string(),
            kind: kind.to_string(),
            img: None,
            description: String::new(),
            mounted_position: None,
            mounted: false,
        }
    }

    #[test]
    fn groups_sort_and_capitalise() {
        let items = vec![item("ammo", "B"), item("ammo", "A"), item("tool", "Z")];
        let categories = classify(&items);

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].label, "Ammo");
        assert_eq!(
            categories[0]
                .items
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert_eq!(categories[1].label, "Tool");
        assert_eq!(categories[1].items[0].name, "Z");
    }

    #[test]
    fn item_sort_ignores_case() {
        let items = vec![item("gear", "rope"), item("gear", "Flashlight")];
        let categories = classify(&items);
        assert_eq!(categories[0].items[0].name, "Flashlight");
        assert_eq!(categories[0].items[1].name, "rope");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(classify(&[]).is_empty());
    }

    #[test]
    fn excluded_kinds_never_reach_the_hold() {
        let items = vec![
            item("weapon", "Mounted MG"),
            item("armor", "Plating"),
            item("ammo", "7.62mm"),
            item("program", "Sword"),
        ];
        let cargo = cargo_items(&items);
        assert_eq!(cargo.len(), 1);
        assert_eq!(cargo[0].name, "7.62mm");
    }
}
