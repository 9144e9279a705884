//! Wallet top-up console: balance, gateway hand-off and payment reconciliation
//! in front of the finance REST API.

pub mod api;
pub mod config;
pub mod error;
pub mod finance;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod pages;
pub mod services;
