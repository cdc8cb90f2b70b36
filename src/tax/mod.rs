pub mod fifo;
pub mod fund;
pub mod gains;
pub mod lots;
pub mod portfolio;
pub mod transaction;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use fifo::KEST_CUTOFF;
pub use fund::ReportRow;
pub use gains::GainAggregator;
pub use lots::Lot;
pub use portfolio::{process, Portfolio};
pub use transaction::Transaction;
