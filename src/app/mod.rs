//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{
    load_configuration,
    configure_logging,
    resolve_queue_settings,
    resolve_address
};
pub use execution::{
    run_demo,
    run_server,
    run_client,
    DemoOutcome
};
