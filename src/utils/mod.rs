// Query-string utilities
pub mod query_string;

pub use query_string::{build_query_string, parse_assignment};
