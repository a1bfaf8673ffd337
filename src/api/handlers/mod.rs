pub mod device;
pub mod files;
pub mod measurement;
pub mod session;
