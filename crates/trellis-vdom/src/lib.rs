#![forbid(unsafe_code)]

//! Virtual-tree diffing over an abstract host.
//!
//! # Role in Trellis
//! `trellis-vdom` turns successive immutable render trees into a minimal
//! stream of physical operations against a [`Host`] backend: create, insert,
//! move, remove, text and attribute updates.
//!
//! # Primary responsibilities
//! - **VNode**: tagged render-tree nodes (text, comment, fragment, element,
//!   component) with optional sibling keys.
//! - **Host**: the physical backend seam, plus [`RecordingHost`], an
//!   in-memory arena that logs every operation for assertions.
//! - **Patcher**: the diff engine; keyed reconciliation uses a two-ended
//!   walk and a longest-increasing-subsequence move plan.
//! - **RenderRoot**: a reactive render loop built on `trellis-reactive`,
//!   coalescing state writes into one diff per flush.
//!
//! # How it fits in the system
//! State lives in `trellis-reactive`; a mounted [`RenderRoot`] re-runs its
//! render function when that state changes and feeds old and new trees to
//! the [`Patcher`], which talks only to the [`Host`] trait.

pub mod host;
pub mod lis;
pub mod node;
pub mod patch;
pub mod render_loop;

pub use host::{Host, HostHandle, HostOp, RecordingHost};
pub use node::{Children, Component, Key, NodeKind, PropMap, VNode};
pub use patch::Patcher;
pub use render_loop::RenderRoot;
