//! Account and grant redistribution
//!
//! A server-wide account export (`CREATE USER` / `GRANT` lines) is split into
//! minimal, idempotent SQL fragments, one per database, so that each archive
//! can recreate exactly the accounts that need it.
//!
//! - `token`: tokenizer for the four identifier forms and clause finders
//! - `parser`: line scanner building one `UserRecord` per account name
//! - `redistribute`: per-database fragment construction

pub mod parser;
pub mod redistribute;
pub mod token;

pub use parser::{parse_accounts, GrantLine, UserRecord};
pub use redistribute::{redistribute, Redistribution};
