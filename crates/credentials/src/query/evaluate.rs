//! Query evaluation logic for matching expressions against credentials.

use crate::credential::{CredentialView, PropertyValue};

use super::expression::QueryExpression;

const ID_PROPERTY: &str = "id";
const SCOPE_PROPERTY: &str = "scope";

/// Evaluates an expression against a single credential.
///
/// Evaluation is total: a property that cannot be read makes the enclosing
/// comparison false instead of failing the whole query.
pub fn evaluate<C: CredentialView + ?Sized>(expression: &QueryExpression, candidate: &C) -> bool {
    match expression {
        QueryExpression::Always => true,
        QueryExpression::Never => false,
        QueryExpression::Not(inner) => !evaluate(inner, candidate),
        // Long `&&`/`||` runs nest to the left; walk them without recursing per operand.
        QueryExpression::And(..) => expression
            .chain_operands()
            .into_iter()
            .all(|operand| evaluate(operand, candidate)),
        QueryExpression::Or(..) => expression
            .chain_operands()
            .into_iter()
            .any(|operand| evaluate(operand, candidate)),
        QueryExpression::InstanceOf(type_name) => candidate.is_instance_of(type_name),
        QueryExpression::PropertyEquals { property, value } => {
            resolve_property(candidate, property).is_some_and(|actual| value.matches(&actual))
        }
        QueryExpression::ScopeIn(scopes) => scopes.contains(&candidate.scope()),
    }
}

/// Keeps the candidates that match, preserving their relative order.
pub fn filter<I>(candidates: I, expression: &QueryExpression) -> Vec<I::Item>
where
    I: IntoIterator,
    I::Item: CredentialView,
{
    candidates
        .into_iter()
        .filter(|candidate| evaluate(expression, candidate))
        .collect()
}

fn resolve_property<C: CredentialView + ?Sized>(
    candidate: &C,
    property: &str,
) -> Option<PropertyValue> {
    match property {
        ID_PROPERTY => Some(PropertyValue::String(candidate.id().to_string())),
        SCOPE_PROPERTY => Some(PropertyValue::String(
            candidate.scope().as_str().to_string(),
        )),
        _ => match candidate.property(property) {
            Ok(value) => value,
            Err(error) => {
                log::trace!("treating unreadable property as absent: {error}");
                None
            }
        },
    }
}
