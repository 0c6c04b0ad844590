use crate::wizard::{
    FieldRule, FieldSpec, ListSpec, OptionSource, PriceRule, PricingTable, Step, WizardError, WizardSchema,
};

fn port(name: &str, label: &str) -> FieldSpec {
    FieldSpec::new(name, label, Step::ResourcesAndAddons)
        .required()
        .rule(FieldRule::Range { min: 1, max: 65535 })
}

/// Load balancer creation: placement and scheme, then listeners and pools.
pub fn load_balancer() -> Result<WizardSchema, WizardError> {
    WizardSchema::builder("load-balancers", "Load balancer")
        .field(
            FieldSpec::new("name", "Name", Step::Configuration)
                .required()
                .rule(FieldRule::Name { max_len: 32 })
                .help("Only alphanumeric characters, hyphens and underscores."),
        )
        .field(FieldSpec::new("region", "Region", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("vpc", "VPC", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("subnet", "Subnet", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("scheme", "Scheme", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("lb_type", "Type", Step::Configuration).required().rule(FieldRule::Choice))
        .list(
            ListSpec::new("listeners", "Listeners")
                .field(
                    FieldSpec::new("protocol", "Protocol", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Choice)
                        .default_value("HTTP"),
                )
                .field(port("port", "Port").default_value("80"))
                .field(port("target_port", "Target port").default_value("8080"))
                .title_field("port")
                .min_items(1)
                .initial_items(1)
                .protect_default(),
        )
        .list(
            ListSpec::new("target_pools", "Target pools")
                .field(
                    FieldSpec::new("name", "Pool name", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Name { max_len: 32 }),
                )
                .field(
                    FieldSpec::new("algorithm", "Algorithm", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Choice)
                        .default_value("round_robin"),
                )
                .field(FieldSpec::new("health_check_path", "Health check path", Step::ResourcesAndAddons))
                .title_field("name"),
        )
        .list(
            ListSpec::new("tags", "Tags")
                .field(
                    FieldSpec::new("key", "Key", Step::ResourcesAndAddons)
                        .required()
                        .rule(FieldRule::Name { max_len: 63 }),
                )
                .field(FieldSpec::new("value", "Value", Step::ResourcesAndAddons)),
        )
        .depends("region", &["vpc"])
        .depends("vpc", &["subnet"])
        .options("region", super::regions())
        .options("vpc", super::vpcs())
        .options("subnet", super::subnets())
        .options("scheme", OptionSource::fixed(&["internet-facing", "internal"]))
        .options("lb_type", OptionSource::fixed(&["application", "network"]))
        .options("listeners.protocol", OptionSource::fixed(&["HTTP", "HTTPS", "TCP", "UDP"]))
        .options("target_pools.algorithm", OptionSource::fixed(&["round_robin", "least_connections"]))
        .pricing(
            PricingTable::new()
                .rule(PriceRule::lookup(
                    "Load balancer",
                    "lb_type",
                    &[("application", 0.025), ("network", 0.02)],
                ))
                .rule(PriceRule::flat("Listener", 0.005).per_item("listeners").titled_by("port")),
        )
        .build()
}
