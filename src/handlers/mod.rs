pub mod helpers;
pub mod resources;
pub mod wizard;

pub use resources::{delete_volume, list_flows, list_resources, list_volumes};
pub use wizard::{
    abandon_wizard, add_item, advance_step, change_field, create_wizard, dismiss_notification, field_options,
    get_wizard, go_back, navigate, navigate_leave, navigate_stay, new_wizard_from_query, remove_item,
    submit_wizard, update_item,
};
