//! Type coercion between TVN tags.
//!
//! [`convert`] is total over the supported targets: unparseable input
//! degrades to a null value (numbers, resource references) or to the current
//! time (datetimes) rather than failing. Only targets with no conversion rule
//! (`null`, `attachment`, unknown tags) produce an error, and only when the
//! source value is non-null.

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    data::{datetime_from_millis, format_datetime, format_json_number, parse_datetime, parse_number},
    error::TvnError,
    resource::{ResourceKind, ResourceRegistry},
    summary::compare_row_keys,
    tvn::{
        TvnValue, TypeTag, TypedValue, TypedValueWrapper, to_type_value_notation,
        to_type_value_notation_wrapper,
    },
};

pub fn convert(
    value: &TypedValue,
    new_type: &TypeTag,
    registry: &ResourceRegistry,
) -> Result<TypedValue, TvnError> {
    convert_with_clock(value, new_type, registry, Utc::now)
}

/// [`convert`] with the clock used for the datetime fallback supplied.
pub fn convert_with_clock<F>(
    value: &TypedValue,
    new_type: &TypeTag,
    registry: &ResourceRegistry,
    now: F,
) -> Result<TypedValue, TvnError>
where
    F: Fn() -> DateTime<Utc>,
{
    if value.value.is_null() {
        return Ok(TypedValue::null(new_type.clone()));
    }
    let converted = match new_type {
        TypeTag::String => TypedValue::string(stringify(value)),
        TypeTag::Number => to_number(value),
        TypeTag::Boolean => TypedValue::boolean(is_truthy(&value.value)),
        TypeTag::Datetime => to_datetime(value, now),
        TypeTag::Object => to_object(value),
        TypeTag::Array => to_array(value),
        TypeTag::Resource(kind) => to_resource(value, *kind, registry),
        TypeTag::Null | TypeTag::Attachment | TypeTag::Other(_) => {
            return Err(TvnError::UnsupportedType(new_type.to_string()));
        }
    };
    Ok(converted)
}

/// New wrapper with the field at `key` converted.
pub fn convert_wrapper_field(
    wrapper: &TypedValueWrapper,
    key: &str,
    new_type: &TypeTag,
    registry: &ResourceRegistry,
) -> Result<TypedValueWrapper, TvnError> {
    let Some(current) = wrapper.get(key) else {
        return Err(TvnError::InvalidPath(format!("no member '{key}'")));
    };
    let converted = convert(current, new_type, registry)?;
    let mut updated = wrapper.clone();
    updated.insert(key.to_string(), converted);
    Ok(updated)
}

/// Compound values become JSON text; everything else its plain form.
pub fn stringify(value: &TypedValue) -> String {
    match &value.value {
        TvnValue::Null => "null".to_string(),
        TvnValue::Boolean(b) => b.to_string(),
        TvnValue::Number(n) => format_json_number(n),
        TvnValue::String(s) => s.clone(),
        compound @ (TvnValue::Array(_) | TvnValue::Object(_)) => compound.to_native().to_string(),
    }
}

fn to_number(value: &TypedValue) -> TypedValue {
    let parsed = match &value.value {
        TvnValue::Number(n) => {
            return TypedValue::new(TypeTag::Number, TvnValue::Number(n.clone()));
        }
        TvnValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        TvnValue::String(s) => parse_number(s),
        TvnValue::Null | TvnValue::Array(_) | TvnValue::Object(_) => None,
    };
    match parsed {
        Some(number) => TypedValue::number(number),
        None => TypedValue::null(TypeTag::Number),
    }
}

/// JavaScript truthiness: `"false"` is truthy.
pub fn is_truthy(value: &TvnValue) -> bool {
    match value {
        TvnValue::Null => false,
        TvnValue::Boolean(b) => *b,
        TvnValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        TvnValue::String(s) => !s.is_empty(),
        TvnValue::Array(_) | TvnValue::Object(_) => true,
    }
}

fn datetime_source(value: &TypedValue) -> Option<DateTime<Utc>> {
    match &value.value {
        TvnValue::String(s) => parse_datetime(s).ok(),
        TvnValue::Number(n) => n.as_f64().and_then(datetime_from_millis),
        TvnValue::Object(members) => members.values().next().and_then(datetime_source),
        TvnValue::Array(items) => items.first().and_then(datetime_source),
        TvnValue::Boolean(_) | TvnValue::Null => None,
    }
}

fn to_datetime<F>(value: &TypedValue, now: F) -> TypedValue
where
    F: Fn() -> DateTime<Utc>,
{
    let parsed = datetime_source(value).unwrap_or_else(|| {
        let fallback = now();
        warn!(
            "Could not read a datetime from {} value '{}'; using current time {}",
            value.tag,
            stringify(value),
            format_datetime(&fallback)
        );
        fallback
    });
    TypedValue::new(TypeTag::Datetime, TvnValue::String(format_datetime(&parsed)))
}

fn to_object(value: &TypedValue) -> TypedValue {
    match &value.value {
        TvnValue::Array(items) => {
            let members = items
                .iter()
                .enumerate()
                .map(|(idx, item)| (idx.to_string(), item.clone()))
                .collect();
            return TypedValue::object(members);
        }
        TvnValue::Object(members) => return TypedValue::object(members.clone()),
        TvnValue::String(s) if value.tag == TypeTag::String && s.starts_with('{') && s.ends_with('}') => {
            match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(parsed)) => {
                    return TypedValue::object(to_type_value_notation_wrapper(&parsed, None));
                }
                Ok(_) => {}
                Err(err) => warn!("Could not parse '{s}' as a JSON object: {err}"),
            }
        }
        _ => {}
    }
    let mut wrapped = TypedValueWrapper::new();
    wrapped.insert("0".to_string(), value.clone());
    TypedValue::object(wrapped)
}

fn to_array(value: &TypedValue) -> TypedValue {
    match &value.value {
        TvnValue::Array(items) => return TypedValue::array(items.clone()),
        TvnValue::Object(members) => {
            let mut entries: Vec<(&String, &TypedValue)> = members.iter().collect();
            entries.sort_by(|(a, _), (b, _)| compare_row_keys(a, b));
            return TypedValue::array(entries.into_iter().map(|(_, node)| node.clone()).collect());
        }
        TvnValue::String(s) if value.tag == TypeTag::String && s.starts_with('[') && s.ends_with(']') => {
            match serde_json::from_str::<Value>(s) {
                Ok(Value::Array(items)) => {
                    return TypedValue::array(
                        items
                            .iter()
                            .map(|item| to_type_value_notation(item, None))
                            .collect(),
                    );
                }
                Ok(_) => {}
                Err(err) => warn!("Could not parse '{s}' as a JSON array: {err}"),
            }
        }
        _ => {}
    }
    TypedValue::array(vec![value.clone()])
}

/// Lowercase hyphenated UUID, or a run of decimal digits.
pub fn looks_like_resource_id(candidate: &str) -> bool {
    let is_uuid = Uuid::try_parse(candidate)
        .is_ok_and(|uuid| uuid.hyphenated().to_string() == candidate);
    let is_integer = !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit());
    is_uuid || is_integer
}

fn to_resource(value: &TypedValue, kind: ResourceKind, registry: &ResourceRegistry) -> TypedValue {
    let current = stringify(value);
    let page = registry.list_url(kind);
    if current.starts_with(&page) {
        return TypedValue::resource(kind, current);
    }
    if looks_like_resource_id(&current) {
        return TypedValue::resource(kind, registry.resource_url(kind, &current));
    }
    TypedValue::null(TypeTag::Resource(kind))
}
