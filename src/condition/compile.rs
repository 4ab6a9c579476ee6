//! Lowering condition trees to expression text.

use super::tree::{ConditionNode, Connector};
use crate::dsl::MAX_NESTING;
use crate::error::CompileError;

/// Compile a JSON condition tree into expression text.
///
/// Trees whose text would nest deeper than the parser accepts are rejected,
/// so every compiled expression can be evaluated.
pub fn compile(tree: &serde_json::Value) -> Result<String, CompileError> {
    let node = ConditionNode::from_json(tree)?;
    let fragment = node.render();
    if fragment.depth > MAX_NESTING {
        return Err(CompileError::TooDeep {
            path: "root".to_string(),
        });
    }
    tracing::debug!(expression = %fragment.text, "compiled condition tree");
    Ok(fragment.text)
}

/// Parse JSON text and compile it.
pub fn compile_str(json: &str) -> Result<String, CompileError> {
    let tree: serde_json::Value = serde_json::from_str(json)?;
    compile(&tree)
}

/// Fields referenced by the leaves of a JSON condition tree, deduplicated in
/// order of first occurrence.
pub fn export_fields(tree: &serde_json::Value) -> Result<Vec<String>, CompileError> {
    Ok(ConditionNode::from_json(tree)?.fields())
}

/// Rendered expression text, whether it can be negated without
/// parentheses, and the nesting the parser reaches reading it.
struct Fragment {
    text: String,
    grouped: bool,
    depth: usize,
}

impl Fragment {
    fn negated(self) -> Fragment {
        if self.grouped {
            Fragment {
                text: format!("!{}", self.text),
                grouped: true,
                depth: self.depth + 1,
            }
        } else {
            Fragment {
                text: format!("!({})", self.text),
                grouped: true,
                depth: self.depth + 2,
            }
        }
    }
}

impl ConditionNode {
    /// Render the tree as expression text.
    ///
    /// Children are folded left to right: the first becomes the accumulator,
    /// each later one yields `(acc SYM child)`. Under NOT the accumulator is
    /// replaced by the negation of each child in turn, so only the last
    /// child's negation remains.
    pub fn to_expression(&self) -> String {
        self.render().text
    }

    fn render(&self) -> Fragment {
        match self {
            ConditionNode::Leaf { op, field, value } => Fragment {
                text: format!("{} {} {}", field, op, value),
                grouped: false,
                depth: 1,
            },
            ConditionNode::Group {
                connector,
                children,
            } => {
                let mut acc: Option<Fragment> = None;

                for child in children {
                    let part = child.render();
                    acc = Some(match (connector, acc) {
                        (Connector::Not, _) => part.negated(),
                        (_, None) => part,
                        (_, Some(prev)) => Fragment {
                            text: format!("({} {} {})", prev.text, connector.symbol(), part.text),
                            grouped: true,
                            depth: prev.depth.max(part.depth) + 1,
                        },
                    });
                }

                acc.unwrap_or(Fragment {
                    text: String::new(),
                    grouped: true,
                    depth: 0,
                })
            }
        }
    }

    /// Leaf fields in order of first occurrence, without duplicates.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut Vec<String>) {
        match self {
            ConditionNode::Leaf { field, .. } => {
                if !fields.contains(field) {
                    fields.push(field.clone());
                }
            }
            ConditionNode::Group { children, .. } => {
                for child in children {
                    child.collect_fields(fields);
                }
            }
        }
    }
}
