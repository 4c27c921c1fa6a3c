pub mod cli;
pub mod commands;
pub mod context;
pub mod credentials;
pub mod error;
pub mod logging;
