pub mod init;
pub mod sync;
pub mod update;
pub mod mirror;
pub mod deactivate;
pub mod status;
