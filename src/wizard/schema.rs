use serde::{Deserialize, Serialize};

use super::cost::PricingTable;
use super::dependency::{DependencyGraph, OptionCatalog, OptionSource};
use super::error::WizardError;

/// Steps every creation flow walks through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Region, network and base parameters of the resource.
    Configuration,
    /// Node pools, listeners, tags and optional add-ons.
    ResourcesAndAddons,
}

impl Step {
    pub fn all() -> [Step; 2] {
        [Step::Configuration, Step::ResourcesAndAddons]
    }

    /// The step `advance` moves to, if any.
    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Configuration => Some(Step::ResourcesAndAddons),
            Step::ResourcesAndAddons => None,
        }
    }

    /// The step `back` returns to, if any.
    pub fn previous(&self) -> Option<Step> {
        match self {
            Step::Configuration => None,
            Step::ResourcesAndAddons => Some(Step::Configuration),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::Configuration => "Configuration",
            Step::ResourcesAndAddons => "Resources & Add-ons",
        }
    }
}

/// Format rules a field value must satisfy once it is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// Dotted-quad IPv4 network with a prefix length, e.g. `10.244.0.0/16`.
    Cidr,
    /// Integer within `min..=max`.
    Range { min: i64, max: i64 },
    /// Letters, digits, hyphens and underscores only, at most `max_len` chars.
    Name { max_len: usize },
    /// Value must be one of the options the catalog offers for this field.
    Choice,
}

/// Declaration of a single input field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub step: Step,
    pub required: bool,
    pub rules: Vec<FieldRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, step: Step) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            step,
            required: false,
            rules: Vec::new(),
            default: None,
            help: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }
}

/// Names of the three fields holding an autoscaling range on an item.
///
/// The item is valid only when `0 < min <= desired <= max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountTriple {
    pub min: String,
    pub desired: String,
    pub max: String,
}

impl CountTriple {
    pub fn new(min: impl Into<String>, desired: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            desired: desired.into(),
            max: max.into(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.min == field || self.desired == field || self.max == field
    }
}

/// Declaration of a repeatable list (node pools, listeners, tags, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSpec {
    pub name: String,
    pub label: String,
    pub fields: Vec<FieldSpec>,
    /// Field used to name an item in cost lines and summaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_field: Option<String>,
    /// Number of items a submittable draft must hold.
    pub min_items: usize,
    /// Number of items a fresh draft starts with.
    pub initial_items: usize,
    /// The first item created for a fresh draft can never be removed.
    pub protect_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<CountTriple>,
}

impl ListSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            fields: Vec::new(),
            title_field: None,
            min_items: 0,
            initial_items: 0,
            protect_default: false,
            counts: None,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn title_field(mut self, name: impl Into<String>) -> Self {
        self.title_field = Some(name.into());
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = min;
        self
    }

    pub fn initial_items(mut self, count: usize) -> Self {
        self.initial_items = count;
        self
    }

    pub fn protect_default(mut self) -> Self {
        self.protect_default = true;
        self
    }

    pub fn counts(mut self, triple: CountTriple) -> Self {
        self.counts = Some(triple);
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A complete creation flow: fields, lists, dependencies, options and prices.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSchema {
    pub flow: String,
    pub title: String,
    /// Console section the flow lives in; navigation inside it is never guarded.
    pub section: String,
    pub fields: Vec<FieldSpec>,
    pub lists: Vec<ListSpec>,
    #[serde(skip)]
    pub dependencies: DependencyGraph,
    #[serde(skip)]
    pub catalog: OptionCatalog,
    #[serde(skip)]
    pub pricing: PricingTable,
}

impl WizardSchema {
    pub fn builder(flow: impl Into<String>, title: impl Into<String>) -> WizardSchemaBuilder {
        let flow = flow.into();
        WizardSchemaBuilder {
            section: format!("/{}", flow),
            flow,
            title: title.into(),
            fields: Vec::new(),
            lists: Vec::new(),
            edges: Vec::new(),
            catalog: OptionCatalog::default(),
            pricing: PricingTable::default(),
        }
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn list_spec(&self, name: &str) -> Option<&ListSpec> {
        self.lists.iter().find(|l| l.name == name)
    }

    /// Fields shown on `step`, in declaration order.
    pub fn fields_for_step(&self, step: Step) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |f| f.step == step)
    }
}

pub struct WizardSchemaBuilder {
    flow: String,
    title: String,
    section: String,
    fields: Vec<FieldSpec>,
    lists: Vec<ListSpec>,
    edges: Vec<(String, Vec<String>)>,
    catalog: OptionCatalog,
    pricing: PricingTable,
}

impl WizardSchemaBuilder {
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn list(mut self, spec: ListSpec) -> Self {
        self.lists.push(spec);
        self
    }

    /// Declare that changing `source` resets every field in `dependents`.
    pub fn depends(mut self, source: &str, dependents: &[&str]) -> Self {
        self.edges.push((
            source.to_string(),
            dependents.iter().map(|d| d.to_string()).collect(),
        ));
        self
    }

    /// Register the option source for a scalar field or a `list.field` key.
    pub fn options(mut self, field: &str, source: OptionSource) -> Self {
        self.catalog.insert(field, source);
        self
    }

    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// Validate the declarations and produce the schema.
    ///
    /// Fails when a dependency edge names an undeclared field or when the
    /// dependency graph contains a cycle.
    pub fn build(self) -> Result<WizardSchema, WizardError> {
        for (source, dependents) in &self.edges {
            for name in std::iter::once(source).chain(dependents.iter()) {
                if !self.fields.iter().any(|f| &f.name == name) {
                    return Err(WizardError::UndeclaredDependency(name.clone()));
                }
            }
        }
        let dependencies = DependencyGraph::new(self.edges)?;
        Ok(WizardSchema {
            flow: self.flow,
            title: self.title,
            section: self.section,
            fields: self.fields,
            lists: self.lists,
            dependencies,
            catalog: self.catalog,
            pricing: self.pricing,
        })
    }
}
