/// Ledger operations over the session's store
pub mod ledger;
/// Dashboard text formatting
pub mod report;
/// Derived budget figures
pub mod totals;

pub use totals::Totals;
