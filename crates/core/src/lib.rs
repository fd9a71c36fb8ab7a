//! Domain building blocks shared by the Gatehouse crates.
//!
//! - [`types`] -- primary key and timestamp aliases.
//! - [`validation`] -- schema checks for registration and login payloads.

pub mod types;
pub mod validation;
