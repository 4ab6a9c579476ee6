//! Condition trees: JSON rule definitions compiled to expression text.
//!
//! Shape:
//!   {"connector": "AND" | "OR" | "NOT" | "", "children": [node, ...]}
//!   {"op": "EQ" | "NE" | "GT" | "LT" | "GE" | "LE" | "ADD" | "SUB" | "MUL" | "QUO",
//!    "field": "age", "value": 43}
//!
//! A node is a leaf iff it has no `children` key.

mod compile;
mod tree;

pub use compile::{compile, compile_str, export_fields};
pub use tree::{ConditionNode, Connector, LeafOp, MAX_DEPTH};
