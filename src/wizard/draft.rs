use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::WizardError;

/// One entry of a repeatable list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatableItem {
    pub id: u64,
    /// The default entry of its list; removal is refused.
    #[serde(default)]
    pub protected: bool,
    pub values: BTreeMap<String, String>,
}

impl RepeatableItem {
    /// Value of `field`, or the empty string when unset.
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Ordered list of uniquely identified items.
///
/// Every mutation returns a new list; the draft swaps the whole list in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatableItemList {
    items: Vec<RepeatableItem>,
    next_id: u64,
}

impl RepeatableItemList {
    pub fn items(&self) -> &[RepeatableItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&RepeatableItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Copy of this list with a new item appended; returns the new item id.
    pub fn with_item(&self, values: BTreeMap<String, String>, protected: bool) -> (Self, u64) {
        let id = self.next_id + 1;
        let mut items = self.items.clone();
        items.push(RepeatableItem {
            id,
            protected,
            values,
        });
        (
            Self {
                items,
                next_id: id,
            },
            id,
        )
    }

    /// Copy of this list without the item `id`.
    ///
    /// `list` is only used to name the list in errors.
    pub fn without(&self, list: &str, id: u64) -> Result<Self, WizardError> {
        let item = self.get(id).ok_or_else(|| WizardError::UnknownItem {
            list: list.to_string(),
            id,
        })?;
        if item.protected {
            return Err(WizardError::ProtectedItem {
                list: list.to_string(),
                id,
            });
        }
        Ok(Self {
            items: self.items.iter().filter(|i| i.id != id).cloned().collect(),
            next_id: self.next_id,
        })
    }

    /// Copy of this list with one field of item `id` replaced.
    pub fn with_value(&self, list: &str, id: u64, field: &str, value: &str) -> Result<Self, WizardError> {
        if self.get(id).is_none() {
            return Err(WizardError::UnknownItem {
                list: list.to_string(),
                id,
            });
        }
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.id != id {
                    return item.clone();
                }
                let mut updated = item.clone();
                if value.is_empty() {
                    updated.values.remove(field);
                } else {
                    updated.values.insert(field.to_string(), value.to_string());
                }
                updated
            })
            .collect();
        Ok(Self {
            items,
            next_id: self.next_id,
        })
    }
}

/// The user's in-progress selections for one creation flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDraft {
    #[serde(default)]
    fields: BTreeMap<String, String>,
    #[serde(default)]
    lists: BTreeMap<String, RepeatableItemList>,
}

impl ConfigurationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, or the empty string when unset.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn is_set(&self, field: &str) -> bool {
        !self.get(field).trim().is_empty()
    }

    /// Store `value`; an empty value unsets the field.
    pub fn set(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value.to_string());
        }
    }

    pub fn clear(&mut self, field: &str) {
        self.fields.remove(field);
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn list(&self, name: &str) -> Option<&RepeatableItemList> {
        self.lists.get(name)
    }

    pub fn lists(&self) -> &BTreeMap<String, RepeatableItemList> {
        &self.lists
    }

    pub fn replace_list(&mut self, name: &str, list: RepeatableItemList) {
        self.lists.insert(name.to_string(), list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_mutations_leave_original_untouched() {
        let empty = RepeatableItemList::default();
        let (one, id) = empty.with_item(BTreeMap::new(), false);
        let edited = one.with_value("pools", id, "name", "workers").unwrap();
        assert!(empty.is_empty());
        assert_eq!(one.get(id).unwrap().get("name"), "");
        assert_eq!(edited.get(id).unwrap().get("name"), "workers");
    }

    #[test]
    fn ids_are_never_reused() {
        let (list, first) = RepeatableItemList::default().with_item(BTreeMap::new(), false);
        let list = list.without("pools", first).unwrap();
        let (_, second) = list.with_item(BTreeMap::new(), false);
        assert_ne!(first, second);
    }

    #[test]
    fn protected_item_cannot_be_removed() {
        let (list, id) = RepeatableItemList::default().with_item(BTreeMap::new(), true);
        assert_eq!(
            list.without("pools", id),
            Err(WizardError::ProtectedItem { list: "pools".into(), id })
        );
    }

    #[test]
    fn setting_empty_unsets() {
        let mut draft = ConfigurationDraft::new();
        draft.set("region", "eu-west-1");
        assert!(draft.is_set("region"));
        draft.set("region", "");
        assert!(!draft.is_set("region"));
        assert!(draft.fields().is_empty());
    }
}
