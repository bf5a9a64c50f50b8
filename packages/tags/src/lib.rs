#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OSM tag classification.
//!
//! - [`expression`]: the compact boolean tag-expression language used to
//!   describe which entities are venues, addresses, stations or streets.
//! - [`filter`]: flat key/value deny-lists.
//! - [`schema`]: name and address key tables embedded at compile time.
//! - [`features`]: the compiled feature expressions shared by the importer.

pub mod expression;
pub mod features;
pub mod filter;
pub mod schema;

pub use expression::{ExpressionError, TagExpression, matches};
pub use filter::{DenyFilter, passes_filter};
