//! External interfaces and ambient infrastructure shared by the `solver`
//! binary: configuration (`arguments`), numeric helpers (`fixed_point`,
//! `conversions`), the collaborator contracts the core depends on (`rpc`,
//! `router`, `oracle`, `registry`, `task_compiler`, `encoder`, `gas_price`,
//! `indexer`, `receipts`), a concrete wallet pool (`wallet`), the telemetry
//! wire format (`telemetry`), and process bootstrap (`logging`, `metrics`).

pub mod arguments;
pub mod conversions;
pub mod encoder;
pub mod fixed_point;
pub mod gas_price;
pub mod indexer;
pub mod logging;
pub mod metrics;
pub mod oracle;
pub mod receipts;
pub mod registry;
pub mod router;
pub mod rpc;
pub mod task_compiler;
pub mod telemetry;
pub mod wallet;
