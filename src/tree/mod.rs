//! Nested value model and subtree reconstruction.
//!
//! The registry hands back either a flat, sorted `(key, value)` listing or a
//! recursive node; both are rebuilt here into a [`ConfigValue`] rooted at the
//! queried key, with the query root's own prefix stripped from every
//! descendant path.

mod builder;
mod value;
pub use builder::*;
pub use value::*;

#[cfg(test)]
mod builder_test;
