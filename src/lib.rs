pub mod device_connection;
pub mod mtp;

// 重导出常用模块
pub use device_connection::*;
pub use mtp::*;
