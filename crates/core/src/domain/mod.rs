pub mod conversation;
pub mod performance;
pub mod stock;
