pub mod fsx;
pub mod log;
