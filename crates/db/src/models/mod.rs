//! Row structs for each table.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where rows are written in bulk, an insert DTO.

pub mod event;
pub mod guild;
pub mod profile;
pub mod user;
