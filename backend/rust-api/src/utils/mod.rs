pub mod normalize;
pub mod retry;
pub mod time;
