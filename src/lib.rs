//! IP Vietnam record acquisition.
//!
//! [`runner::ScrapeService`] fetches WIPO Publish detail pages with a pool of
//! workers, validates and extracts them into [`models::Row`]s and appends
//! them to per-type files under a dated run directory. [`vntm::VntmService`]
//! is the sequential companion that searches vietnamtrademark.net.

pub mod cli;
pub mod config;
pub mod extract;
pub mod models;
pub mod output;
pub mod runner;
pub mod scrapers;
pub mod vntm;
