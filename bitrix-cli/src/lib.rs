//! Bitrix24 CRM REST connector
//!
//! Translates per-record parameters into Bitrix24 REST calls and normalises
//! the responses into a flat item stream.

pub mod api;
pub mod cli;
pub mod config;
pub mod runner;
