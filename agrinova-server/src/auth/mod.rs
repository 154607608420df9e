//! Auth endpoints and bearer middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
