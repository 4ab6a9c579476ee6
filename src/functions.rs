//! Named functions callable from expression text.
//!
//! Functions receive their arguments unevaluated together with the context,
//! so each one decides how to interpret them. `in_array` relies on this to
//! read its second argument as a list literal rather than a value.
//!
//! The process-wide registry sits behind a read-write lock. Lookups clone the
//! function handle and release the lock before the call, so registering while
//! other threads evaluate is safe and functions may evaluate nested calls.

use crate::dsl::{Expr, eval};
use crate::error::{EvalError, EvalResult};
use crate::value::{Context, Kind, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Function signature: unevaluated argument nodes and the context in, value out.
pub type Function = Arc<dyn Fn(&[Expr], &Context) -> EvalResult<Value> + Send + Sync>;

static GLOBAL: LazyLock<RwLock<FunctionRegistry>> =
    LazyLock::new(|| RwLock::new(FunctionRegistry::new()));

/// Table of functions indexed by name.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    /// A registry seeded with the built-in functions.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("in_array", in_array);
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Add or replace a function.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Expr], &Context) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(func));
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Register a function for all subsequent evaluations. An existing function
/// with the same name is replaced.
pub fn register_function<F>(name: impl Into<String>, func: F)
where
    F: Fn(&[Expr], &Context) -> EvalResult<Value> + Send + Sync + 'static,
{
    let name = name.into();
    tracing::debug!(function = %name, "registering function");
    GLOBAL.write().register(name, func);
}

/// Names of the functions currently available to expressions.
pub fn registered_functions() -> Vec<String> {
    GLOBAL.read().names()
}

pub(crate) fn lookup(name: &str) -> Option<Function> {
    GLOBAL.read().get(name)
}

/// `in_array(needle, [a, b, ...])`: true if the needle equals any element.
///
/// Integer elements are compared against the needle as int64 and string
/// elements against the needle as a string. Other element kinds, and elements
/// the needle cannot be cast for, are skipped.
///
/// Only the argument shape is an error. A needle that fails to evaluate
/// yields false and elements that fail to evaluate are skipped.
pub fn in_array(args: &[Expr], ctx: &Context) -> EvalResult<Value> {
    let [needle, haystack] = args else {
        return Err(EvalError::InvalidArgument {
            function: "in_array".into(),
            reason: format!("expected 2 arguments, got {}", args.len()),
        });
    };

    let Expr::List(items) = haystack else {
        return Err(EvalError::InvalidArgument {
            function: "in_array".into(),
            reason: "second argument must be a list literal".into(),
        });
    };

    let needle = match eval(needle, ctx) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("in_array: needle failed to evaluate: {}", e);
            return Ok(Value::Bool(false));
        }
    };

    for item in items {
        let item = match eval(item, ctx) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("in_array: skipping element: {}", e);
                continue;
            }
        };
        let found = match item {
            Value::Int(i) => needle.cast(Kind::Int64).is_ok_and(|n| n == Value::Int(i)),
            Value::Str(s) => needle.cast(Kind::String).is_ok_and(|n| n == Value::Str(s)),
            _ => false,
        };
        if found {
            return Ok(Value::Bool(true));
        }
    }

    Ok(Value::Bool(false))
}
