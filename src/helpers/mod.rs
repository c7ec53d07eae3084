pub mod context;
pub mod time;
