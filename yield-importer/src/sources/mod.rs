pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordSource;
pub use postgres::PgRecordSource;
