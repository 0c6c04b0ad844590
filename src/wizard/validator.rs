use serde::Serialize;
use std::collections::BTreeMap;

use super::dependency::OptionCatalog;
use super::draft::{ConfigurationDraft, RepeatableItem};
use super::error::WizardError;
use super::schema::{FieldRule, FieldSpec, ListSpec, Step, WizardSchema};

/// Message used for every empty mandatory field.
pub const REQUIRED: &str = "Required";

/// Outcome of checking one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Field key to message. Item fields use `list.id.field`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.insert(key.into(), message.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.0.retain(|k, _| !k.starts_with(prefix));
    }
}

/// Error key for a field of a list item.
pub fn item_key(list: &str, id: u64, field: &str) -> String {
    format!("{}.{}.{}", list, id, field)
}

/// Error key for the min/desired/max invariant of a list item.
pub fn counts_key(list: &str, id: u64) -> String {
    item_key(list, id, "counts")
}

/// `true` for an IPv4 network such as `10.244.0.0/16`.
///
/// Every octet must be an integer in `0..=255` and the prefix length in `0..=32`.
pub fn is_valid_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };
    let numeric = |s: &str, max_digits: usize| -> Option<u32> {
        if s.is_empty() || s.len() > max_digits || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u32>().ok()
    };
    match numeric(prefix, 2) {
        Some(p) if p <= 32 => {}
        _ => return false,
    }
    let octets: Vec<&str> = address.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| matches!(numeric(o, 3), Some(n) if n <= 255))
}

/// `true` when `value` only holds letters, digits, `-` and `_`.
pub fn is_valid_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse a whole number, ignoring surrounding whitespace.
pub fn parse_count(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Autoscaling invariant: `0 < min <= desired <= max`.
pub fn check_node_counts(min: i64, desired: i64, max: i64) -> bool {
    0 < min && min <= desired && desired <= max
}

/// Applies [`FieldRule`]s declared by a schema to draft values.
pub struct FieldValidator<'a> {
    schema: &'a WizardSchema,
}

impl<'a> FieldValidator<'a> {
    pub fn new(schema: &'a WizardSchema) -> Self {
        Self { schema }
    }

    /// Validate a scalar field value in the context of `draft`.
    pub fn validate(&self, field: &str, value: &str, draft: &ConfigurationDraft) -> ValidationResult {
        match self.schema.field_spec(field) {
            Some(spec) => check_value(spec, field, value, draft, &self.schema.catalog),
            None => ValidationResult::Invalid(WizardError::UnknownField(field.to_string()).to_string()),
        }
    }

    /// Validate one field of a list item.
    pub fn validate_item_field(
        &self,
        list: &ListSpec,
        field: &str,
        value: &str,
        draft: &ConfigurationDraft,
    ) -> ValidationResult {
        match list.field_spec(field) {
            Some(spec) => {
                let key = format!("{}.{}", list.name, field);
                check_value(spec, &key, value, draft, &self.schema.catalog)
            }
            None => ValidationResult::Invalid(WizardError::UnknownField(field.to_string()).to_string()),
        }
    }

    /// Cross-field count check for an item; `Valid` when the list has no
    /// count triple or one of the counts is not a number yet.
    pub fn validate_counts(&self, list: &ListSpec, item: &RepeatableItem) -> ValidationResult {
        let Some(triple) = &list.counts else {
            return ValidationResult::Valid;
        };
        let (Some(min), Some(desired), Some(max)) = (
            parse_count(item.get(&triple.min)),
            parse_count(item.get(&triple.desired)),
            parse_count(item.get(&triple.max)),
        ) else {
            return ValidationResult::Valid;
        };
        if check_node_counts(min, desired, max) {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid("Counts must satisfy 0 < minimum ≤ desired ≤ maximum".into())
        }
    }

    /// Every failing scalar field of `step`.
    pub fn validate_step(&self, step: Step, draft: &ConfigurationDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for spec in self.schema.fields_for_step(step) {
            if let ValidationResult::Invalid(reason) = self.validate(&spec.name, draft.get(&spec.name), draft) {
                errors.insert(spec.name.clone(), reason);
            }
        }
        errors
    }

    /// Every failing item field, count invariant and minimum item count.
    pub fn validate_lists(&self, draft: &ConfigurationDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for list in &self.schema.lists {
            let items = draft.list(&list.name).map(|l| l.items()).unwrap_or(&[]);
            if items.len() < list.min_items {
                errors.insert(
                    list.name.clone(),
                    format!("At least {} {} required", list.min_items, list.label.to_lowercase()),
                );
            }
            for item in items {
                errors.extend(self.validate_item(list, item, draft));
            }
        }
        errors
    }

    /// Every failing field of a single item plus its count invariant.
    pub fn validate_item(&self, list: &ListSpec, item: &RepeatableItem, draft: &ConfigurationDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for spec in &list.fields {
            if let ValidationResult::Invalid(reason) =
                self.validate_item_field(list, &spec.name, item.get(&spec.name), draft)
            {
                errors.insert(item_key(&list.name, item.id, &spec.name), reason);
            }
        }
        if let ValidationResult::Invalid(reason) = self.validate_counts(list, item) {
            errors.insert(counts_key(&list.name, item.id), reason);
        }
        errors
    }

    /// Full recomputation across both steps and all lists.
    pub fn validate_all(&self, draft: &ConfigurationDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for step in Step::all() {
            errors.extend(self.validate_step(step, draft));
        }
        errors.extend(self.validate_lists(draft));
        errors
    }
}

fn check_value(
    spec: &FieldSpec,
    catalog_key: &str,
    value: &str,
    draft: &ConfigurationDraft,
    catalog: &OptionCatalog,
) -> ValidationResult {
    let value = value.trim();
    if value.is_empty() {
        return if spec.required {
            ValidationResult::Invalid(REQUIRED.into())
        } else {
            ValidationResult::Valid
        };
    }
    for rule in &spec.rules {
        let failure = match rule {
            FieldRule::Cidr => (!is_valid_cidr(value))
                .then(|| "Enter a valid IPv4 CIDR block, e.g. 10.0.0.0/16".to_string()),
            FieldRule::Range { min, max } => match parse_count(value) {
                None => Some("Must be a whole number".to_string()),
                Some(n) if n < *min || n > *max => Some(format!("Must be between {} and {}", min, max)),
                Some(_) => None,
            },
            FieldRule::Name { max_len } => {
                if !is_valid_name(value) {
                    Some("Only letters, numbers, hyphens and underscores are allowed".to_string())
                } else if value.chars().count() > *max_len {
                    Some(format!("Must be at most {} characters", max_len))
                } else {
                    None
                }
            }
            FieldRule::Choice => match catalog.prerequisite_of(catalog_key) {
                // user input can arrive out of order (deep links, prefill)
                Some(prerequisite) if !draft.is_set(prerequisite) => Some(format!("Select {} first", prerequisite)),
                _ => check_choice(catalog, catalog_key, value, draft),
            },
        };
        if let Some(reason) = failure {
            return ValidationResult::Invalid(reason);
        }
    }
    ValidationResult::Valid
}

fn check_choice(catalog: &OptionCatalog, key: &str, value: &str, draft: &ConfigurationDraft) -> Option<String> {
    match catalog.options_for(key, draft) {
        Ok(options) => (!options.iter().any(|o| o == value)).then(|| format!("'{}' is not available", value)),
        Err(WizardError::DependencyViolation { prerequisite, .. }) => Some(format!("Select {} first", prerequisite)),
        Err(_) => None,
    }
}
