//! TKML Node Model
//!
//! A parsed page is a [`Tree`]: an arena that owns every node top-down.
//! Children are held as ordered [`NodeId`] lists, the upward `parent` link
//! is a plain index used only for lookups.
//!
//! Structural rules live in [`KindSpec`] descriptors, collected once into a
//! [`KindRegistry`] and shared read-only afterwards.

mod ident;
mod kind;
mod node;
mod registry;

pub use ident::{sanitize_id, IdGenerator};
pub use kind::{KindSpec, ROOT_TAG};
pub use node::{DetachedNode, Node, NodeId, NodeKind, Tree};
pub use registry::KindRegistry;
