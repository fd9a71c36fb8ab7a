//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and the DTO used to insert it.

pub mod session;
pub mod user;
