//! Condition tree model and its validating JSON reader.

use crate::error::CompileError;
use crate::value::Value;
use serde_json::Map;
use std::fmt;
use std::str::FromStr;

/// Deepest group nesting accepted when reading a tree.
pub const MAX_DEPTH: usize = 128;

/// Logical combinator applied to a group's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
    Not,
    /// Empty or unrecognized connector: children are joined without a symbol.
    None,
}

impl Connector {
    pub fn from_name(name: &str) -> Self {
        match name {
            "AND" => Connector::And,
            "OR" => Connector::Or,
            "NOT" => Connector::Not,
            _ => Connector::None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Connector::And => "&&",
            Connector::Or => "||",
            Connector::Not => "!",
            Connector::None => "",
        }
    }
}

/// Leaf operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Add,
    Sub,
    Mul,
    Quo,
}

impl FromStr for LeafOp {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "EQ" => Ok(LeafOp::Eq),
            "NE" => Ok(LeafOp::Ne),
            "GT" => Ok(LeafOp::Gt),
            "LT" => Ok(LeafOp::Lt),
            "GE" => Ok(LeafOp::Ge),
            "LE" => Ok(LeafOp::Le),
            "ADD" => Ok(LeafOp::Add),
            "SUB" => Ok(LeafOp::Sub),
            "MUL" => Ok(LeafOp::Mul),
            "QUO" => Ok(LeafOp::Quo),
            _ => Err(name.to_string()),
        }
    }
}

/// Expression symbol of the operator.
impl fmt::Display for LeafOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeafOp::Eq => "==",
            LeafOp::Ne => "!=",
            LeafOp::Gt => ">",
            LeafOp::Lt => "<",
            LeafOp::Ge => ">=",
            LeafOp::Le => "<=",
            LeafOp::Add => "+",
            LeafOp::Sub => "-",
            LeafOp::Mul => "*",
            LeafOp::Quo => "/",
        };
        write!(f, "{}", s)
    }
}

/// A node of a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Group {
        connector: Connector,
        children: Vec<ConditionNode>,
    },
    Leaf {
        op: LeafOp,
        field: String,
        value: Value,
    },
}

impl ConditionNode {
    pub fn group(connector: Connector, children: Vec<ConditionNode>) -> Self {
        ConditionNode::Group {
            connector,
            children,
        }
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        Self::group(Connector::And, children)
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        Self::group(Connector::Or, children)
    }

    pub fn not(children: Vec<ConditionNode>) -> Self {
        Self::group(Connector::Not, children)
    }

    pub fn leaf(op: LeafOp, field: impl Into<String>, value: impl Into<Value>) -> Self {
        ConditionNode::Leaf {
            op,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Read and validate a tree. The root must be a group.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CompileError> {
        parse_group(json, "root", 0)
    }
}

impl TryFrom<&serde_json::Value> for ConditionNode {
    type Error = CompileError;

    fn try_from(json: &serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json(json)
    }
}

fn parse_group(
    json: &serde_json::Value,
    path: &str,
    depth: usize,
) -> Result<ConditionNode, CompileError> {
    if depth > MAX_DEPTH {
        return Err(CompileError::TooDeep {
            path: path.to_string(),
        });
    }

    let map = json.as_object().ok_or_else(|| CompileError::InvalidNode {
        path: path.to_string(),
        reason: "expected an object".to_string(),
    })?;

    if map.len() < 2 {
        return Err(CompileError::InvalidNode {
            path: path.to_string(),
            reason: format!("expected at least 2 keys, found {}", map.len()),
        });
    }

    let children = map.get("children").ok_or_else(|| CompileError::MissingChildren {
        path: path.to_string(),
    })?;

    let children = children.as_array().ok_or_else(|| CompileError::ChildrenNotArray {
        path: path.to_string(),
    })?;

    if children.is_empty() {
        return Err(CompileError::EmptyChildren {
            path: path.to_string(),
        });
    }

    let connector = match map.get("connector") {
        None | Some(serde_json::Value::Null) => Connector::None,
        Some(serde_json::Value::String(name)) => Connector::from_name(name),
        Some(other) => {
            return Err(CompileError::InvalidNode {
                path: path.to_string(),
                reason: format!("connector must be a string, got {}", other),
            });
        }
    };

    let mut nodes = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        let child_path = format!("{}.children[{}]", path, i);
        let child_map = child.as_object().ok_or_else(|| CompileError::ChildNotObject {
            path: child_path.clone(),
        })?;

        if child_map.contains_key("children") {
            nodes.push(parse_group(child, &child_path, depth + 1)?);
        } else {
            nodes.push(parse_leaf(child_map, &child_path)?);
        }
    }

    Ok(ConditionNode::Group {
        connector,
        children: nodes,
    })
}

fn parse_leaf(
    map: &Map<String, serde_json::Value>,
    path: &str,
) -> Result<ConditionNode, CompileError> {
    let op = match map.get("op") {
        None | Some(serde_json::Value::Null) => {
            return Err(CompileError::MissingKey {
                path: path.to_string(),
                key: "op",
            });
        }
        Some(serde_json::Value::String(name)) => {
            name.parse::<LeafOp>().map_err(|op| CompileError::UnknownOperator {
                path: path.to_string(),
                op,
            })?
        }
        Some(other) => {
            return Err(CompileError::UnknownOperator {
                path: path.to_string(),
                op: other.to_string(),
            });
        }
    };

    let field = match map.get("field").and_then(|f| f.as_str()) {
        Some(field) if !field.is_empty() => field.to_string(),
        _ => {
            return Err(CompileError::MissingKey {
                path: path.to_string(),
                key: "field",
            });
        }
    };

    let raw = map.get("value").ok_or_else(|| CompileError::MissingKey {
        path: path.to_string(),
        key: "value",
    })?;

    let value = match raw {
        serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_) => {
            Value::from_json(raw).map_err(|e| CompileError::InvalidValue {
                path: path.to_string(),
                reason: e.to_string(),
            })?
        }
        other => {
            return Err(CompileError::InvalidValue {
                path: path.to_string(),
                reason: format!("expected a string, number or bool, got {}", other),
            });
        }
    };

    Ok(ConditionNode::Leaf { op, field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_nested_tree() {
        let tree = json!({
            "connector": "AND",
            "children": [
                {"op": "GT", "field": "age", "value": 43},
                {"connector": "OR", "children": [
                    {"op": "EQ", "field": "name", "value": "haha"},
                    {"op": "EQ", "field": "vip", "value": true}
                ]}
            ]
        });

        let node = ConditionNode::from_json(&tree).unwrap();
        assert_eq!(
            node,
            ConditionNode::and(vec![
                ConditionNode::leaf(LeafOp::Gt, "age", 43),
                ConditionNode::or(vec![
                    ConditionNode::leaf(LeafOp::Eq, "name", "haha"),
                    ConditionNode::leaf(LeafOp::Eq, "vip", true),
                ]),
            ])
        );
    }

    #[test]
    fn test_unknown_connector_has_no_symbol() {
        assert_eq!(Connector::from_name("XOR"), Connector::None);
        assert_eq!(Connector::from_name("").symbol(), "");
        let tree = json!({"children": [{"op": "EQ", "field": "a", "value": 1}], "note": "x"});
        let node = ConditionNode::from_json(&tree).unwrap();
        assert!(matches!(node, ConditionNode::Group { connector: Connector::None, .. }));
    }

    #[test]
    fn test_rejects_single_key() {
        let tree = json!({"children": [{"op": "EQ", "field": "a", "value": 1}]});
        assert!(matches!(
            ConditionNode::from_json(&tree),
            Err(CompileError::InvalidNode { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_children() {
        let missing = json!({"connector": "AND", "other": 1});
        assert!(matches!(
            ConditionNode::from_json(&missing),
            Err(CompileError::MissingChildren { .. })
        ));

        let not_array = json!({"connector": "AND", "children": {"op": "EQ"}});
        assert!(matches!(
            ConditionNode::from_json(&not_array),
            Err(CompileError::ChildrenNotArray { .. })
        ));

        let empty = json!({"connector": "AND", "children": []});
        assert!(matches!(
            ConditionNode::from_json(&empty),
            Err(CompileError::EmptyChildren { .. })
        ));

        let scalar_child = json!({"connector": "AND", "children": [1]});
        assert!(matches!(
            ConditionNode::from_json(&scalar_child),
            Err(CompileError::ChildNotObject { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_leaves() {
        let no_op = json!({"connector": "AND", "children": [{"field": "a", "value": 1}]});
        let err = ConditionNode::from_json(&no_op).unwrap_err();
        assert!(matches!(err, CompileError::MissingKey { key: "op", .. }));
        assert!(err.to_string().contains("root.children[0]"));

        let bad_op = json!({
            "connector": "AND",
            "children": [{"op": "LIKE", "field": "a", "value": 1}]
        });
        assert!(matches!(
            ConditionNode::from_json(&bad_op),
            Err(CompileError::UnknownOperator { .. })
        ));

        let no_field = json!({"connector": "AND", "children": [{"op": "EQ", "value": 1}]});
        assert!(matches!(
            ConditionNode::from_json(&no_field),
            Err(CompileError::MissingKey { key: "field", .. })
        ));

        let list_value = json!({
            "connector": "AND",
            "children": [{"op": "EQ", "field": "a", "value": [1]}]
        });
        assert!(matches!(
            ConditionNode::from_json(&list_value),
            Err(CompileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut tree = json!({
            "connector": "AND",
            "children": [{"op": "EQ", "field": "a", "value": 1}]
        });
        for _ in 0..=MAX_DEPTH {
            tree = json!({"connector": "AND", "children": [tree]});
        }
        assert!(matches!(
            ConditionNode::from_json(&tree),
            Err(CompileError::TooDeep { .. })
        ));
    }
}
