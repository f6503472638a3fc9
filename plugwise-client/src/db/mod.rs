pub mod record_queries;

pub use record_queries::{
    all_daily_records, all_interval_records, appliances, daily_records_for,
    interval_records_for,
};
