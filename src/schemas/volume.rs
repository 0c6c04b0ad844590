use crate::wizard::{
    FieldRule, FieldSpec, ListSpec, OptionSource, PriceRule, PricingTable, Step, WizardError, WizardSchema,
};

/// Hourly price per GB by volume type.
const GB_HOUR_RATES: &[(&str, f64)] = &[("standard", 0.00006), ("ssd", 0.00014), ("nvme", 0.0002)];

/// Block-storage volume creation.
pub fn volume() -> Result<WizardSchema, WizardError> {
    WizardSchema::builder("volumes", "Volume")
        .field(
            FieldSpec::new("name", "Name", Step::Configuration)
                .required()
                .rule(FieldRule::Name { max_len: 64 }),
        )
        .field(FieldSpec::new("region", "Region", Step::Configuration).required().rule(FieldRule::Choice))
        .field(FieldSpec::new("zone", "Availability zone", Step::Configuration).required().rule(FieldRule::Choice))
        .field(
            FieldSpec::new("volume_type", "Volume type", Step::Configuration)
                .required()
                .rule(FieldRule::Choice)
                .default_value("ssd"),
        )
        .field(
            FieldSpec::new("size_gb", "Size (GB)", Step::Configuration)
                .required()
                .rule(FieldRule::Range { min: 1, max: 16384 }),
        )
        .field(
            FieldSpec::new("snapshot_schedule", "Snapshot schedule", Step::ResourcesAndAddons)
                .rule(FieldRule::Choice),
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
        .depends("region", &["zone"])
        .options("region", super::regions())
        .options("zone", super::zones())
        .options("volume_type", OptionSource::fixed(&["standard", "ssd", "nvme"]))
        .options("snapshot_schedule", OptionSource::fixed(&["none", "daily", "weekly"]))
        .pricing(
            PricingTable::new()
                .rule(PriceRule::lookup("Volume", "volume_type", GB_HOUR_RATES).times("size_gb"))
                .rule(PriceRule::lookup(
                    "Snapshots",
                    "snapshot_schedule",
                    &[("daily", 0.01), ("weekly", 0.004)],
                )),
        )
        .build()
}
