pub mod achievement;
pub mod ledger;
