//! Certificate monitoring service: TLS inspection, state classification,
//! refresh and sweep orchestration, plus the HTTP surface on top.

pub mod app;
pub mod config;
pub mod logging;
pub mod monitor;
pub mod state;
