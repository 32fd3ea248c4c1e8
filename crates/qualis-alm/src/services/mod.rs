pub mod alm_integration;
pub mod client;
pub mod types;
