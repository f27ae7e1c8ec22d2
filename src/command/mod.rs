mod boot;
mod logs;
mod status;

pub use boot::run_boot;
pub use logs::run_logs;
pub use status::run_status;
