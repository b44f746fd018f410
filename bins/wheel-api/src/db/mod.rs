//! Database layer for the prize wheel service.

mod models;
mod pool;
mod queries;

pub use models::{NewUser, PrizeRow, SpinHistoryRow, UserRow};
pub use pool::create_pool;
pub use queries::{
    count_spins_by_user, get_user_by_telegram_id, list_active_prizes, list_spins_by_user,
    upsert_user,
};
