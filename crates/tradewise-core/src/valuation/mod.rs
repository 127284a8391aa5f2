// Valuation engine: conversion rates, replacement levels, recent form, and
// the four-component player price.

pub mod conversion;
pub mod engine;
pub mod performance;
pub mod replacement;

pub use engine::{
    compute_league_valuations, compute_valuation, LeagueContext, LeagueValuations, PlayerPrice,
    PriceComponents, PriceRange, Valuation, ValuationMetadata,
};

/// Round to one decimal place (currency granularity for prices).
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Round to two decimal places (components, deltas, and scores).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
