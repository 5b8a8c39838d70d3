pub mod app;
pub mod canvas;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod store;
pub mod summary;
