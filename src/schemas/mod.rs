//! Built-in creation flows offered by the console.

mod cluster;
mod load_balancer;
mod volume;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::wizard::{OptionSource, WizardError, WizardSchema};

pub use cluster::kubernetes_cluster;
pub use load_balancer::load_balancer;
pub use volume::volume;

pub const REGIONS: &[&str] = &["ap-south-1", "us-east-1", "eu-west-1"];

const VPCS_BY_REGION: &[(&str, &[&str])] = &[
    ("ap-south-1", &["vpc-1", "vpc-2"]),
    ("us-east-1", &["vpc-3"]),
    ("eu-west-1", &["vpc-4", "vpc-5"]),
];

const SUBNETS_BY_VPC: &[(&str, &[&str])] = &[
    ("vpc-1", &["subnet-1", "subnet-2"]),
    ("vpc-2", &["subnet-3"]),
    ("vpc-3", &["subnet-4", "subnet-5"]),
    ("vpc-4", &["subnet-6"]),
    ("vpc-5", &["subnet-7", "subnet-8"]),
];

const ZONES_BY_REGION: &[(&str, &[&str])] = &[
    ("ap-south-1", &["ap-south-1a", "ap-south-1b"]),
    ("us-east-1", &["us-east-1a", "us-east-1b", "us-east-1c"]),
    ("eu-west-1", &["eu-west-1a", "eu-west-1b"]),
];

pub(crate) fn regions() -> OptionSource {
    OptionSource::fixed(REGIONS)
}

pub(crate) fn vpcs() -> OptionSource {
    OptionSource::keyed("region", VPCS_BY_REGION)
}

pub(crate) fn subnets() -> OptionSource {
    OptionSource::keyed("vpc", SUBNETS_BY_VPC)
}

pub(crate) fn zones() -> OptionSource {
    OptionSource::keyed("region", ZONES_BY_REGION)
}

/// All built-in flows keyed by flow name.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    flows: BTreeMap<String, Arc<WizardSchema>>,
}

impl SchemaRegistry {
    pub fn builtin() -> Result<Self, WizardError> {
        let mut flows = BTreeMap::new();
        for schema in [kubernetes_cluster()?, load_balancer()?, volume()?] {
            flows.insert(schema.flow.clone(), Arc::new(schema));
        }
        Ok(Self { flows })
    }

    pub fn get(&self, flow: &str) -> Option<Arc<WizardSchema>> {
        self.flows.get(flow).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WizardSchema>> {
        self.flows.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.flows.keys().cloned().collect()
    }
}
