//! Scene management module
//!
//! Provides the node arena (scene graph), per-frame transform propagation,
//! and the frustum visibility filter.

mod node;
mod scene_graph;

pub use node::{Node, NodeFlags, NodeKey, Renderable};
pub use scene_graph::SceneGraph;
