//! Core types for beacon — protocol frame formats and configuration.

pub mod config;
pub mod frame;
