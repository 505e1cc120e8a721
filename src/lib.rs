pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod ledger;
pub mod prompt;
pub mod rename;
pub mod workspace;
