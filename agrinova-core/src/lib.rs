//! Authentication and session-security core for the Agrinova platform.
//!
//! The crate owns the credential verifier, the token service (access,
//! refresh, and offline tokens), the device binding registry, and the
//! row-level security context propagator, plus the orchestrator that
//! composes them into login, refresh, renew, and logout flows.
//!
//! Storage is abstracted behind async repository traits. Postgres adapters
//! live behind the `database` feature together with the SQL migrations that
//! define the schema, the five context functions, and the default-deny
//! policies built on them.
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub mod auth;
pub mod rls;

pub use agrinova_model as model;
pub use auth::{AuthError, AuthResult};
