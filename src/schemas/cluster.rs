use crate::wizard::{
    CountTriple, FieldRule, FieldSpec, ListSpec, OptionSource, PriceRule, PricingTable, Step, WizardError,
    WizardSchema,
};

const INSTANCE_TYPES: &[(&str, f64)] = &[
    ("s-2vcpu-4gb", 0.03),
    ("s-4vcpu-8gb", 0.06),
    ("s-8vcpu-16gb", 0.12),
    ("c-16vcpu-32gb", 0.34),
];

/// Kubernetes cluster creation: network placement first, node pools second.
pub fn kubernetes_cluster() -> Result<WizardSchema, WizardError> {
    let instance_names: Vec<&str> = INSTANCE_TYPES.iter().map(|(n, _)| *n).collect();
    let counts = |name: &str, label: &str, default: &str| {
        FieldSpec::new(name, label, Step::ResourcesAndAddons)
            .required()
            .rule(FieldRule::Range { min: 1, max: 100 })
            .default_value(default)
    };

    WizardSchema::builder("kubernetes", "Kubernetes cluster")
        .field(
            FieldSpec::new("name", "Cluster name", Step::Configuration)
                .rule(FieldRule::Name { max_len: 40 })
                .help("Only alphanumeric characters, hyphens and underscores. Leave empty to generate one."),
        )
        .field(FieldSpec::new("region", "Region", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("vpc", "VPC", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("subnet", "Subnet", Step::Configuration).required().rule(FieldRule::Choice))
        .field(
            FieldSpec::new("version", "Kubernetes version", Step::Configuration)
                .required()
                .rule(FieldRule::Choice),
        )
        .field(
            FieldSpec::new("pod_cidr", "Pod CIDR", Step::Configuration)
                .rule(FieldRule::Cidr)
                .help("Defaults to 10.244.0.0/16"),
        )
        .field(
            FieldSpec::new("service_cidr", "Service CIDR", Step::Configuration)
                .rule(FieldRule::Cidr)
                .help("Defaults to 10.96.0.0/12"),
        )
        .field(FieldSpec::new("monitoring", "Monitoring add-on", Step::ResourcesAndAddons).rule(FieldRule::Choice))
        .field(
            FieldSpec::new("ingress", "Ingress controller", Step::ResourcesAndAddons).rule(FieldRule::Choice),
        )
        .list(
            ListSpec::new("node_pools", "Node pools")
                .field(
                    FieldSpec::new("name", "Pool name", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Name { max_len: 40 }),
                )
                .field(
                    FieldSpec::new("instance_type", "Instance type", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Choice)
                        .default_value("s-2vcpu-4gb"),
                )
                .field(counts("min_count", "Minimum nodes", "1"))
                .field(counts("desired_count", "Desired nodes", "2"))
                .field(counts("max_count", "Maximum nodes", "3"))
                .field(
                    FieldSpec::new("disk_size_gb", "Disk size (GB)", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Range { min: 20, max: 2000 })
                        .default_value("50"),
                )
                .title_field("name")
                .min_items(1)
                .initial_items(1)
                .protect_default()
                .counts(CountTriple::new("min_count", "desired_count", "max_count")),
        )
        .list(
            ListSpec::new("labels", "Labels")
                .field(
                    FieldSpec::new("key", "Key", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Name { max_len: 63 }),
                )
                .field(FieldSpec::new("value", "Value", Step::ResourcesAndAddons).rule(FieldRule::Name { max_len: 63 })),
        )
        .list(
            ListSpec::new("taints", "Taints")
                .field(
                    FieldSpec::new("key", "Key", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Name { max_len: 63 }),
                )
                .field(FieldSpec::new("value", "Value", Step::ResourcesAndAddons).rule(FieldRule::Name { max_len: 63 }))
                .field(
                    FieldSpec::new("effect", "Effect", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Choice)
                        .default_value("NoSchedule"),
                ),
        )
        .depends("region", &["vpc"])
        .depends("vpc", &["subnet"])
        .options("region", super::regions())
        .options("vpc", super::vpcs())
        .options("subnet", super::subnets())
        .options("version", OptionSource::fixed(&["1.27", "1.28", "1.29", "1.30"]))
        .options("monitoring", OptionSource::fixed(&["enabled", "disabled"]))
        .options("ingress", OptionSource::fixed(&["none", "nginx", "traefik"]))
        .options("node_pools.instance_type", OptionSource::fixed(&instance_names))
        .options("taints.effect", OptionSource::fixed(&["NoSchedule", "PreferNoSchedule", "NoExecute"]))
        .pricing(
            PricingTable::new()
                .rule(PriceRule::flat("Control plane", 0.10))
                .rule(
                    PriceRule::lookup("Node pool", "instance_type", INSTANCE_TYPES)
                        .per_item("node_pools")
                        .times("desired_count")
                        .titled_by("name"),
                )
                .rule(
                    PriceRule::flat("Node storage", 0.0001)
                        .per_item("node_pools")
                        .times("disk_size_gb")
                        .times("desired_count")
                        .titled_by("name"),
                )
                .rule(PriceRule::lookup("Monitoring", "monitoring", &[("enabled", 0.02)])),
        )
        .build()
}
