//! Rule set definitions and evaluation.

use crate::condition::{compile, export_fields};
use crate::config::RulesConfig;
use crate::dsl::{matches, parse_expression};
use crate::value::Context;
use anyhow::{Result, anyhow, bail};

/// An ordered set of compiled rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub rules: Vec<CompiledRule>,
    pub default: Option<String>,
}

/// A rule lowered to expression text.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub expression: String,
    /// Context keys the expression reads.
    pub fields: Vec<String>,
    pub value: String,
}

impl CompiledRule {
    /// Errors are logged and treated as no match.
    pub fn is_match(&self, ctx: Option<&Context>) -> bool {
        match matches(&self.expression, ctx) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(rule = %self.name, "rule evaluation failed: {}", e);
                false
            }
        }
    }
}

impl RuleSet {
    /// Compile every rule in order, failing on the first invalid one.
    pub fn compile(config: &RulesConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());

        for (i, rule) in config.rules.iter().enumerate() {
            let (expression, fields) = match (&rule.expr, &rule.condition) {
                (Some(expr), None) => {
                    let ast = parse_expression(expr).map_err(|e| {
                        anyhow!("Error parsing rule {} ('{}'): {}", i + 1, rule.name, e)
                    })?;
                    (expr.clone(), ast.identifiers())
                }
                (None, Some(tree)) => {
                    let expression = compile(tree).map_err(|e| {
                        anyhow!("Error compiling rule {} ('{}'): {}", i + 1, rule.name, e)
                    })?;
                    let fields = export_fields(tree)?;
                    // Compiled text must also be accepted by the evaluator.
                    parse_expression(&expression).map_err(|e| {
                        anyhow!("Error parsing rule {} ('{}'): {}", i + 1, rule.name, e)
                    })?;
                    (expression, fields)
                }
                (Some(_), Some(_)) => bail!(
                    "Rule {} ('{}') has both 'expr' and 'condition'",
                    i + 1,
                    rule.name
                ),
                (None, None) => bail!(
                    "Rule {} ('{}') needs either 'expr' or 'condition'",
                    i + 1,
                    rule.name
                ),
            };

            tracing::debug!(rule = %rule.name, %expression, "compiled rule");

            rules.push(CompiledRule {
                name: rule.name.clone(),
                expression,
                fields,
                value: rule.value.clone().unwrap_or_else(|| rule.name.clone()),
            });
        }

        Ok(RuleSet {
            rules,
            default: config.default.clone(),
        })
    }

    /// Names of every rule that matches, in rule order.
    pub fn matching(&self, ctx: Option<&Context>) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.is_match(ctx))
            .map(|rule| rule.name.as_str())
            .collect()
    }

    /// Union of the fields read by all rules, in first-occurrence order.
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for field in self.rules.iter().flat_map(|r| &r.fields) {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        fields
    }
}

/// Evaluate a rule set against a context, returning the first matching value.
pub fn evaluate_rules_first(set: &RuleSet, ctx: Option<&Context>) -> Option<String> {
    for rule in &set.rules {
        if rule.is_match(ctx) {
            return Some(rule.value.clone());
        }
    }

    set.default.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::value::Value;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn expr_rule(name: &str, expr: &str, value: Option<&str>) -> RuleConfig {
        RuleConfig {
            name: name.into(),
            expr: Some(expr.into()),
            condition: None,
            value: value.map(Into::into),
        }
    }

    fn make_rules() -> RuleSet {
        let config = RulesConfig {
            rules: vec![
                expr_rule("senior", "age >= 65", Some("discount")),
                RuleConfig {
                    name: "haha".into(),
                    expr: None,
                    condition: Some(json!({
                        "connector": "AND",
                        "children": [
                            {"op": "GT", "field": "age", "value": 43},
                            {"op": "EQ", "field": "name", "value": "haha"}
                        ]
                    })),
                    value: None,
                },
                expr_rule("vip", "in_array(tier, [\"gold\", \"platinum\"])", Some("priority")),
            ],
            default: Some("regular".into()),
        };

        RuleSet::compile(&config).unwrap()
    }

    #[test]
    fn test_compiled_rules() {
        let set = make_rules();
        assert_eq!(set.rules[1].expression, "(age > 43 && name == \"haha\")");
        assert_eq!(set.rules[1].value, "haha");
        assert_eq!(set.rules[2].fields, vec!["tier"]);
        assert_eq!(set.fields(), vec!["age", "name", "tier"]);
    }

    #[test]
    fn test_first_match_wins() {
        let set = make_rules();

        let senior = ctx(&[("age", 70.into()), ("name", "haha".into())]);
        assert_eq!(evaluate_rules_first(&set, Some(&senior)), Some("discount".into()));

        let named = ctx(&[("age", 50.into()), ("name", "haha".into())]);
        assert_eq!(evaluate_rules_first(&set, Some(&named)), Some("haha".into()));
    }

    #[test]
    fn test_matching_lists_all() {
        let set = make_rules();
        let record = ctx(&[
            ("age", 70.into()),
            ("name", "haha".into()),
            ("tier", "gold".into()),
        ]);
        assert_eq!(set.matching(Some(&record)), vec!["senior", "haha", "vip"]);
    }

    #[test]
    fn test_default_and_absent_context() {
        let set = make_rules();
        let young = ctx(&[("age", 20.into())]);
        assert_eq!(evaluate_rules_first(&set, Some(&young)), Some("regular".into()));
        assert_eq!(evaluate_rules_first(&set, None), Some("regular".into()));
        assert!(set.matching(None).is_empty());
    }

    #[test]
    fn test_evaluation_error_is_no_match() {
        let config = RulesConfig {
            rules: vec![
                expr_rule("broken", "unknown_fn(a)", None),
                expr_rule("ok", "a == 1", None),
            ],
            default: None,
        };
        let set = RuleSet::compile(&config).unwrap();
        let record = ctx(&[("a", 1.into())]);
        assert_eq!(set.matching(Some(&record)), vec!["ok"]);
        assert_eq!(evaluate_rules_first(&set, Some(&record)), Some("ok".into()));
    }

    #[test]
    fn test_invalid_rules() {
        let both = RulesConfig {
            rules: vec![RuleConfig {
                name: "both".into(),
                expr: Some("a == 1".into()),
                condition: Some(json!({"connector": "AND", "children": []})),
                value: None,
            }],
            default: None,
        };
        assert!(RuleSet::compile(&both).is_err());

        let neither = RulesConfig {
            rules: vec![RuleConfig {
                name: "neither".into(),
                expr: None,
                condition: None,
                value: None,
            }],
            default: None,
        };
        assert!(RuleSet::compile(&neither).is_err());

        let bad_syntax = RulesConfig {
            rules: vec![expr_rule("bad", "a ==", None)],
            default: None,
        };
        let err = RuleSet::compile(&bad_syntax).unwrap_err();
        assert!(err.to_string().contains("'bad'"));
    }
}
