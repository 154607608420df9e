//! Read back the caller's security context from inside the database.

pub mod handlers;
