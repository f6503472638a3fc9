pub mod appliance;
pub mod daily_record;
pub mod interval_record;
pub mod yield_aggregate;

pub use appliance::{resolve_appliances, Appliance};
pub use daily_record::RawDailyRecord;
pub use interval_record::{RawIntervalRecord, SLOTS_PER_HOUR, SLOT_WIDTH};
pub use yield_aggregate::YieldAggregate;
