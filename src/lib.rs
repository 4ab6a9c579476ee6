//! Rule matching over flat records.
//!
//! Condition trees (JSON) are compiled to expression text, and expression
//! text is evaluated against a context of named values:
//!
//! ```
//! use exprule::{Context, Value, compile, matches};
//! use serde_json::json;
//!
//! let tree = json!({
//!     "connector": "AND",
//!     "children": [
//!         {"op": "GT", "field": "age", "value": 43},
//!         {"op": "EQ", "field": "name", "value": "haha"}
//!     ]
//! });
//! let expr = compile(&tree).unwrap();
//! assert_eq!(expr, r#"(age > 43 && name == "haha")"#);
//!
//! let mut ctx = Context::new();
//! ctx.insert("age".into(), Value::Int(44));
//! ctx.insert("name".into(), Value::from("haha"));
//! assert!(matches(&expr, Some(&ctx)).unwrap());
//! ```

pub mod condition;
pub mod config;
pub mod dsl;
pub mod error;
pub mod functions;
pub mod mapping;
pub mod value;

pub use condition::{ConditionNode, Connector, LeafOp, compile, compile_str, export_fields};
pub use config::{RuleConfig, RulesConfig};
pub use dsl::{Expr, evaluate, matches, parse_expression};
pub use error::{CastError, CompileError, EvalError, EvalResult};
pub use functions::{FunctionRegistry, register_function, registered_functions};
pub use mapping::{RuleSet, evaluate_rules_first};
pub use value::{Context, Kind, Value, cast, context_from_json};
