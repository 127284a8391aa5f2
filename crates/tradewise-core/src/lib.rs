// Library root: re-exports all modules so the binary and integration tests
// can reach the engine's public API.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod repository;
pub mod service;
pub mod trade;
pub mod valuation;
pub mod weakness;

#[cfg(test)]
pub(crate) mod fixtures;
