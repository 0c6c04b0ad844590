use std::collections::{BTreeMap, HashSet, VecDeque};

use super::draft::ConfigurationDraft;
use super::error::WizardError;

/// Static "changing X resets Y" edges between fields.
///
/// Construction rejects cycles, so a transitive reset always terminates.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new<I>(edges: I) -> Result<Self, WizardError>
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (source, dependents) in edges {
            let entry = merged.entry(source).or_default();
            for d in dependents {
                if !entry.contains(&d) {
                    entry.push(d);
                }
            }
        }
        let graph = Self { edges: merged };
        if let Some(path) = graph.find_cycle() {
            return Err(WizardError::DependencyCycle { path });
        }
        Ok(graph)
    }

    /// Direct dependents of `field`, in declaration order.
    pub fn dependents_of(&self, field: &str) -> &[String] {
        self.edges.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every field reachable from `field`, breadth first, without duplicates.
    pub fn transitive_dependents(&self, field: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        seen.insert(field);
        queue.push_back(field);
        while let Some(current) = queue.pop_front() {
            for dep in self.dependents_of(current) {
                if seen.insert(dep.as_str()) {
                    out.push(dep.clone());
                    queue.push_back(dep.as_str());
                }
            }
        }
        out
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            graph: &'a DependencyGraph,
            node: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(node) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                    path.push(node.to_string());
                    return Some(path);
                }
                None => {}
            }
            marks.insert(node, Mark::Visiting);
            stack.push(node);
            for dep in graph.dependents_of(node) {
                if let Some(path) = visit(graph, dep, marks, stack) {
                    return Some(path);
                }
            }
            stack.pop();
            marks.insert(node, Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        let mut stack = Vec::new();
        for source in self.edges.keys() {
            if let Some(path) = visit(self, source, &mut marks, &mut stack) {
                return Some(path);
            }
        }
        None
    }
}

/// Computes the draft that results from a single field change.
pub struct DependencyResolver<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Apply `field = value` and clear everything that transitively depends on
    /// `field`.
    ///
    /// Resets are keyed on which field changed, never on values: clearing a
    /// dependent does not start a second wave of its own.
    pub fn on_field_change(
        &self,
        field: &str,
        value: &str,
        draft: &ConfigurationDraft,
    ) -> (ConfigurationDraft, Vec<String>) {
        let mut updated = draft.clone();
        updated.set(field, value);
        let reset = self.graph.transitive_dependents(field);
        for dep in &reset {
            updated.clear(dep);
        }
        (updated, reset)
    }
}

/// Where the selectable values of a field come from.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSource {
    /// Always the same list.
    Static(Vec<String>),
    /// Depends on the value currently selected in `prerequisite`.
    Keyed {
        prerequisite: String,
        options: BTreeMap<String, Vec<String>>,
    },
}

impl OptionSource {
    pub fn fixed<S: AsRef<str>>(values: &[S]) -> Self {
        OptionSource::Static(values.iter().map(|v| v.as_ref().to_string()).collect())
    }

    pub fn keyed<S: AsRef<str>>(prerequisite: &str, options: &[(&str, &[S])]) -> Self {
        OptionSource::Keyed {
            prerequisite: prerequisite.to_string(),
            options: options
                .iter()
                .map(|(key, values)| {
                    (
                        key.to_string(),
                        values.iter().map(|v| v.as_ref().to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

/// Option lists keyed by field name (`list.field` for item fields).
#[derive(Debug, Clone, Default)]
pub struct OptionCatalog {
    sources: BTreeMap<String, OptionSource>,
}

impl OptionCatalog {
    pub fn insert(&mut self, field: &str, source: OptionSource) {
        self.sources.insert(field.to_string(), source);
    }

    pub fn has_options(&self, field: &str) -> bool {
        self.sources.contains_key(field)
    }

    pub fn prerequisite_of(&self, field: &str) -> Option<&str> {
        match self.sources.get(field)? {
            OptionSource::Keyed { prerequisite, .. } => Some(prerequisite.as_str()),
            OptionSource::Static(_) => None,
        }
    }

    /// Options currently available for `field`.
    ///
    /// Asking for a keyed field before its prerequisite is selected is a
    /// programming error in the caller and yields `DependencyViolation`.
    pub fn options_for(&self, field: &str, draft: &ConfigurationDraft) -> Result<Vec<String>, WizardError> {
        match self.sources.get(field) {
            None => Err(WizardError::UnknownField(field.to_string())),
            Some(OptionSource::Static(values)) => Ok(values.clone()),
            Some(OptionSource::Keyed { prerequisite, options }) => {
                if !draft.is_set(prerequisite) {
                    tracing::error!(field, prerequisite = %prerequisite, "Options requested before prerequisite was set");
                    return Err(WizardError::DependencyViolation {
                        field: field.to_string(),
                        prerequisite: prerequisite.clone(),
                    });
                }
                Ok(options.get(draft.get(prerequisite)).cloned().unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(list: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
        list.iter()
            .map(|(s, d)| (s.to_string(), d.iter().map(|x| x.to_string()).collect()))
            .collect()
    }

    #[test]
    fn transitive_dependents_follow_chain() {
        let graph = DependencyGraph::new(edges(&[("region", &["vpc"]), ("vpc", &["subnet"])])).unwrap();
        assert_eq!(graph.transitive_dependents("region"), vec!["vpc", "subnet"]);
        assert_eq!(graph.transitive_dependents("subnet"), Vec::<String>::new());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let graph = DependencyGraph::new(edges(&[
            ("a", &["b", "c"]),
            ("b", &["d"]),
            ("c", &["d"]),
        ]))
        .unwrap();
        assert_eq!(graph.transitive_dependents("a"), vec!["b", "c", "d"]);
    }

    #[test]
    fn self_loop_is_rejected() {
        let err = DependencyGraph::new(edges(&[("a", &["a"])])).unwrap_err();
        assert_eq!(
            err,
            WizardError::DependencyCycle {
                path: vec!["a".into(), "a".into()]
            }
        );
    }

    #[test]
    fn keyed_options_require_prerequisite() {
        let mut catalog = OptionCatalog::default();
        catalog.insert("vpc", OptionSource::keyed("region", &[("eu", &["vpc-1"])]));
        let mut draft = ConfigurationDraft::new();
        assert!(matches!(
            catalog.options_for("vpc", &draft),
            Err(WizardError::DependencyViolation { .. })
        ));
        draft.set("region", "eu");
        assert_eq!(catalog.options_for("vpc", &draft).unwrap(), vec!["vpc-1"]);
        draft.set("region", "us");
        assert!(catalog.options_for("vpc", &draft).unwrap().is_empty());
    }
}
