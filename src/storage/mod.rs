//! Customer tables read from and written to CSV.

mod table;

pub use table::{AtRiskCustomer, CustomerTable, ScoredTable, PROBABILITY_COLUMN, TIER_COLUMN};
