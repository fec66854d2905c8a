//! Substitution of `effect('<name>')('<name>')` expressions.
//!
//! An attribute fragment may carry such an expression in its `x` field. The
//! referenced effect control is looked up by name in the tree and its
//! authored value fragment replaces the attribute, tagged with
//! `"fromExpression": true`. Any other expression is left as authored.

use crate::node::{NodeKind, Tree};
use serde_json::Value;
use tracing::{debug, warn};

/// Splits a leading quoted string off `input`, returning it and the rest.
fn quoted(input: &str) -> Option<(&str, &str)> {
    let quote = input.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &input[1..];
    let end = body.find(quote)?;
    Some((&body[..end], &body[end + 1..]))
}

/// Parses `effect('A')('B')`, returning the effect and parameter names.
pub fn parse_effect_expression(expression: &str) -> Option<(String, String)> {
    let expression = expression.trim();
    let expression = expression.strip_suffix(';').unwrap_or(expression).trim_end();
    let rest = expression.strip_prefix("effect(")?;
    let (effect, rest) = quoted(rest)?;
    let rest = rest.strip_prefix(")(")?;
    let (param, rest) = quoted(rest)?;
    if rest != ")" {
        return None;
    }
    Some((effect.to_string(), param.to_string()))
}

fn lookup<'a>(tree: &'a Tree, effect: &str, param: &str) -> Option<&'a Value> {
    let effect_id = tree.find_child(tree.root(), effect)?;
    let param_id = tree.find_child(effect_id, param)?;
    match &tree.get(param_id)?.kind {
        NodeKind::Slider(slider) => Some(slider.authored()),
        _ => None,
    }
}

fn resolve(tree: &Tree, fragment: &Value) -> Option<Value> {
    let expression = fragment.as_object()?.get("x")?.as_str()?;
    let Some((effect, param)) = parse_effect_expression(expression) else {
        warn!(%expression, "Unsupported expression ignored");
        return None;
    };
    let Some(authored) = lookup(tree, &effect, &param) else {
        warn!(%effect, %param, "Expression target not found");
        return None;
    };
    debug!(%effect, %param, "Substituted expression");
    let mut replacement = authored.clone();
    if let Value::Object(map) = &mut replacement {
        map.insert("fromExpression".to_string(), Value::Bool(true));
    }
    Some(replacement)
}

fn substitute(tree: &Tree, fragment: &mut Value) {
    if let Some(replacement) = resolve(tree, fragment) {
        *fragment = replacement;
        return;
    }
    match fragment {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                // Effect definitions are the expression targets, not users.
                if key != "ef" {
                    substitute(tree, child);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute(tree, item);
            }
        }
        _ => {}
    }
}

/// Returns a copy of `fragment` with every supported expression replaced by
/// the value it references in `tree`.
pub fn resolve_expressions(tree: &Tree, fragment: &Value) -> Value {
    let mut resolved = fragment.clone();
    substitute(tree, &mut resolved);
    resolved
}
