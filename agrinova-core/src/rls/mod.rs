//! Row-level security context propagation.
//!
//! Each authenticated request gets an [`RlsContext`] computed from the user
//! record and assignment chain. With the `database` feature, [`RlsSession`]
//! installs it on a transaction of a pooled connection and guarantees it is
//! gone before the connection is reused.

mod context;
mod policy;
mod resolver;
#[cfg(feature = "database")]
mod session;

pub use context::RlsContext;
pub use policy::{RecordScope, ScopePolicy};
pub use resolver::ScopeResolver;
#[cfg(feature = "database")]
pub use session::{
    DEFAULT_DATA_ROLE, RlsOptions, RlsSession, current_company_ids, current_division_ids,
    current_estate_ids, current_role, current_user_id, with_rls_context,
};
