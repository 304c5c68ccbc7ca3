pub mod log_builder;
pub mod lookups;
