pub mod app;
pub mod cli;
pub mod config;
pub mod flow;
pub mod logging;
pub mod queue;
pub mod server;
