// Infrastructure module - External dependencies and adapters
pub mod config;
pub mod detect;
pub mod link;
pub mod logging;
