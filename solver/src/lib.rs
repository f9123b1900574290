//! The RainSolver core (spec §1-§5): order bookkeeping (`order_manager`),
//! counterparty selection (`counterparty`), profit estimation (`profit`),
//! the trade-simulator state machine and its three variants
//! (`trade_simulator`), per-order gas probing (`dryrun`), the error taxonomy
//! (`errors`), telemetry assembly (`telemetry_assembler`), round
//! orchestration (`round_scheduler`), and transaction submission/settlement
//! (`transaction_pipeline`). External interfaces and ambient infrastructure
//! live in the `shared` crate; this crate only depends on their traits.

pub mod counterparty;
pub mod dryrun;
pub mod errors;
pub mod ingestion;
pub mod order_manager;
pub mod profit;
pub mod round_scheduler;
pub mod telemetry_assembler;
pub mod trade_simulator;
pub mod transaction_pipeline;
