pub mod api;
pub mod core;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod settings;
