pub mod matcher;
pub mod scheduler;
pub mod timer;
