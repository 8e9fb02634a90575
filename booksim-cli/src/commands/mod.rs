pub mod backups;
pub mod config;
pub mod sync;
