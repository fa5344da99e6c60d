//! Canonical text rendering of query expressions.
//!
//! The output parses back to an equivalent expression as long as every
//! property and type name is a valid query identifier (see
//! [`CredentialsMatcher`](super::CredentialsMatcher), which checks this).
//! Each run of `&&` or `||` is parenthesized once, so the rendering never
//! depends on operator precedence and nests no deeper than the expression.

use std::fmt::Write;

use super::expression::{Literal, QueryExpression};

/// Renders an expression in its canonical query form.
pub fn describe_query(expression: &QueryExpression) -> String {
    let mut out = String::new();
    write_expression(&mut out, expression);
    out
}

fn write_expression(out: &mut String, expression: &QueryExpression) {
    match expression {
        QueryExpression::Always => out.push_str("true"),
        QueryExpression::Never => out.push_str("false"),
        QueryExpression::Not(inner) => {
            out.push('!');
            if inner.is_composite() {
                write_expression(out, inner);
            } else {
                out.push('(');
                write_expression(out, inner);
                out.push(')');
            }
        }
        QueryExpression::And(..) => write_chain(out, expression, " && "),
        QueryExpression::Or(..) => write_chain(out, expression, " || "),
        QueryExpression::InstanceOf(type_name) => {
            out.push_str("instanceof ");
            out.push_str(type_name);
        }
        QueryExpression::PropertyEquals { property, value } => match value {
            // NaN equals nothing, so the comparison can never match.
            Literal::Number(number) if number.is_nan() => out.push_str("false"),
            _ => {
                out.push_str(property);
                out.push_str(" == ");
                write_literal(out, value);
            }
        },
        QueryExpression::ScopeIn(scopes) if scopes.is_empty() => out.push_str("false"),
        QueryExpression::ScopeIn(scopes) => {
            out.push_str("scope in (");
            for (index, scope) in scopes.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(scope.as_str());
            }
            out.push(')');
        }
    }
}

/// Writes a left-nested operator run flat; the parser rebuilds the same nesting.
fn write_chain(out: &mut String, expression: &QueryExpression, separator: &str) {
    out.push('(');
    for (index, operand) in expression.chain_operands().into_iter().enumerate() {
        if index > 0 {
            out.push_str(separator);
        }
        write_expression(out, operand);
    }
    out.push(')');
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::String(value) => write_string_literal(out, value),
        Literal::Number(value) => write_number_literal(out, *value),
        Literal::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
    }
}

fn write_number_literal(out: &mut String, value: f64) {
    if value.is_infinite() {
        // Overflows to infinity when parsed back.
        out.push_str(if value > 0.0 { "1e999" } else { "-1e999" });
    } else {
        let _ = write!(out, "{value}");
    }
}

fn write_string_literal(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            ch if ch.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(ch));
            }
            ch => out.push(ch),
        }
    }
    out.push('"');
}
