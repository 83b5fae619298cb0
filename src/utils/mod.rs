pub mod dirs;
pub mod pool;
pub mod progress;
