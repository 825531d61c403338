pub mod storage;
pub mod trips;
