//! Monthly performance ledger core for the OI task dashboard.
//!
//! Reconciles a task's yearly target against twelve independently editable
//! monthly slots: metric/status label normalization, cumulative actual and
//! achievement-rate computation under three metric semantics, and a
//! per-session ledger that keeps unsaved edits consistent with
//! server-fetched truth while the user moves between months.

pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
