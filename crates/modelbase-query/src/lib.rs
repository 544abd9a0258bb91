//! Dynamic finders for modelbase.
//!
//! `modelbase-query` is the **lookup layer**. It parses finder names such as
//! `find_all_by_name_and_value`, pairs them with arguments, and resolves them
//! against records supplied by a [`CandidateSource`].
//!
//! # Role In The Architecture
//!
//! - **Parsing**: [`parse`] turns a finder token into a [`FinderRequest`].
//! - **Filtering**: [`Filters`] compare coerced attribute values.
//! - **Resolution**: [`resolve_by_attributes`] and [`resolve_by_id`] scan
//!   candidates in the order the source produced them.
//!
//! Candidate production belongs to the host. Most users reach these through
//! the `modelbase` facade crate.

pub mod filter;
pub mod finder;
pub mod resolve;

pub use filter::{FilterValue, Filters, coerce_for};
pub use finder::{FinderKind, FinderRequest, parse, parse_token};
pub use resolve::{CandidateSource, Found, IdLookup, resolve, resolve_by_attributes, resolve_by_id};
