pub mod activity;
pub mod metric;
pub mod task;
