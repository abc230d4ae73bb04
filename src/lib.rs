pub mod app;
pub mod config;
pub mod decisions;
pub mod domain;
pub mod error;
pub mod fault;
pub mod feed;
pub mod output;
pub mod remote;
pub mod score;
pub mod store;
