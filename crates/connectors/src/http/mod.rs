pub mod client;
pub mod fetcher;
pub mod source;
