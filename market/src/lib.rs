pub mod commodity_ids;
pub mod errors;
pub mod preferences;
pub mod query;
pub mod selection;
pub mod source;
pub mod types;
