pub mod api;
pub mod config;
pub mod dataset;
pub mod download;
pub mod inspect;
pub mod links;
