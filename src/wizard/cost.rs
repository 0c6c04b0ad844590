use serde::Serialize;
use std::collections::BTreeMap;

use super::draft::ConfigurationDraft;

/// Billing month used for estimates: 24 hours times 30 days.
pub const HOURS_PER_MONTH: f64 = 720.0;

/// Where a price rule reads its values from.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceScope {
    /// The scalar fields of the draft; produces at most one line.
    Draft,
    /// Every item of a repeatable list; one line per item.
    EachItem { list: String },
}

/// Hourly unit rate of a component.
#[derive(Debug, Clone, PartialEq)]
pub enum Rate {
    Fixed(f64),
    /// Rate chosen by the value selected in `field` (instance type, tier, ...).
    Lookup { field: String, rates: BTreeMap<String, f64> },
}

/// One priced component of a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRule {
    pub component: String,
    pub scope: PriceScope,
    pub rate: Rate,
    /// Fields multiplied together to form the quantity; none means 1.
    pub quantity: Vec<String>,
    /// Item field used to name per-item lines.
    pub title_field: Option<String>,
}

impl PriceRule {
    pub fn flat(component: impl Into<String>, hourly: f64) -> Self {
        Self {
            component: component.into(),
            scope: PriceScope::Draft,
            rate: Rate::Fixed(hourly),
            quantity: Vec::new(),
            title_field: None,
        }
    }

    pub fn lookup(component: impl Into<String>, field: &str, rates: &[(&str, f64)]) -> Self {
        Self {
            component: component.into(),
            scope: PriceScope::Draft,
            rate: Rate::Lookup {
                field: field.to_string(),
                rates: rates.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            },
            quantity: Vec::new(),
            title_field: None,
        }
    }

    pub fn per_item(mut self, list: &str) -> Self {
        self.scope = PriceScope::EachItem {
            list: list.to_string(),
        };
        self
    }

    pub fn times(mut self, field: &str) -> Self {
        self.quantity.push(field.to_string());
        self
    }

    pub fn titled_by(mut self, field: &str) -> Self {
        self.title_field = Some(field.to_string());
        self
    }

    /// Price one set of values. `None` when a rate or quantity input is
    /// missing or not a number, which makes the component absent.
    fn hourly_for(&self, lookup: impl Fn(&str) -> String) -> Option<f64> {
        let rate = match &self.rate {
            Rate::Fixed(r) => *r,
            Rate::Lookup { field, rates } => *rates.get(lookup(field).trim())?,
        };
        let mut quantity = 1.0;
        for field in &self.quantity {
            let n: f64 = lookup(field).trim().parse().ok()?;
            if !n.is_finite() || n < 0.0 {
                return None;
            }
            quantity *= n;
        }
        Some(rate * quantity)
    }
}

/// Ordered set of price rules for a flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingTable {
    rules: Vec<PriceRule>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: PriceRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[PriceRule] {
        &self.rules
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub component: String,
    pub hourly: f64,
    pub monthly: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostTotal {
    pub hourly: f64,
    pub monthly: f64,
}

/// Derived price of a draft. Values are unrounded; see [`format_money`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub lines: Vec<LineItem>,
    pub total: CostTotal,
}

/// Pure mapping from a draft to its [`CostBreakdown`].
pub struct CostEstimator<'a> {
    pricing: &'a PricingTable,
}

impl<'a> CostEstimator<'a> {
    pub fn new(pricing: &'a PricingTable) -> Self {
        Self { pricing }
    }

    /// Lines follow rule declaration order, then item order within a list.
    pub fn estimate(&self, draft: &ConfigurationDraft) -> CostBreakdown {
        let mut lines = Vec::new();
        for rule in self.pricing.rules() {
            match &rule.scope {
                PriceScope::Draft => {
                    if let Some(hourly) = rule.hourly_for(|f| draft.get(f).to_string()) {
                        lines.push(line(rule.component.clone(), hourly));
                    }
                }
                PriceScope::EachItem { list } => {
                    let Some(items) = draft.list(list) else {
                        continue;
                    };
                    for item in items.items() {
                        let lookup = |f: &str| {
                            let own = item.get(f);
                            if own.is_empty() {
                                draft.get(f).to_string()
                            } else {
                                own.to_string()
                            }
                        };
                        if let Some(hourly) = rule.hourly_for(lookup) {
                            let title = rule
                                .title_field
                                .as_deref()
                                .map(|f| item.get(f))
                                .filter(|t| !t.is_empty())
                                .map(str::to_string)
                                .unwrap_or_else(|| format!("#{}", item.id));
                            lines.push(line(format!("{} ({})", rule.component, title), hourly));
                        }
                    }
                }
            }
        }
        let total = CostTotal {
            hourly: lines.iter().map(|l| l.hourly).sum(),
            monthly: lines.iter().map(|l| l.monthly).sum(),
        };
        CostBreakdown { lines, total }
    }
}

fn line(component: String, hourly: f64) -> LineItem {
    LineItem {
        component,
        hourly,
        monthly: hourly * HOURS_PER_MONTH,
    }
}

/// Display form of a money amount, rounded to cents.
pub fn format_money(amount: f64) -> String {
    format!("${:.2}", amount)
}
