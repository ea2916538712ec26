pub mod capability;
pub mod error;
pub mod file;
pub mod http;
pub mod profile;
pub mod sql;
