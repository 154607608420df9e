//! Auth domain: aggregates, ports, and the services built on them.

pub mod aggregates;
pub mod claims;
pub mod repositories;
pub mod services;
pub mod value_objects;
