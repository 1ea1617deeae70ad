//! TypeValueNotation (TVN): a recursive `{type, value}` encoding that makes
//! the type of every API value explicit.
//!
//! Resources travel over the API as plain URL strings; TVN tags them
//! (`galv_CELL`, `galv_TEAM`, ...) so a generic editor can tell a cell
//! reference from free text. A whole resource encodes as a
//! [`TypedValueWrapper`], a map of field name to [`TypedValue`].
//!
//! ## Shape rules
//!
//! A node is a JSON object with exactly the keys `type` and `value`, where
//! `type` is a non-empty string.
//!
//! - array values must hold nodes; object values must be wrappers
//! - resource tags require a string (or null) value
//! - strict mode additionally requires the value's runtime type to match the
//!   tag (null is always accepted) and rejects unknown tags
//!
//! Validation failures carry a [`TvnDiagnostic`] with the path to the
//! offending node; the boolean checks [`is_tvn`] and [`is_tvn_wrapper`] log it
//! when asked to be verbose.

use std::{borrow::Cow, collections::BTreeMap, fmt};

use log::{error, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::{error::TvnError, resource::ResourceKind, schema::ResourceSchema};

const CANDIDATE_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Null,
    Datetime,
    Attachment,
    Object,
    Array,
    Resource(ResourceKind),
    /// Any other non-empty tag; tolerated by non-strict checks only.
    Other(String),
}

impl TypeTag {
    pub fn parse(token: &str) -> TypeTag {
        match token {
            "string" => TypeTag::String,
            "number" => TypeTag::Number,
            "boolean" => TypeTag::Boolean,
            "null" => TypeTag::Null,
            "datetime" => TypeTag::Datetime,
            "attachment" => TypeTag::Attachment,
            "object" => TypeTag::Object,
            "array" => TypeTag::Array,
            other => ResourceKind::from_tag(other)
                .map(TypeTag::Resource)
                .unwrap_or_else(|| TypeTag::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            TypeTag::String => Cow::Borrowed("string"),
            TypeTag::Number => Cow::Borrowed("number"),
            TypeTag::Boolean => Cow::Borrowed("boolean"),
            TypeTag::Null => Cow::Borrowed("null"),
            TypeTag::Datetime => Cow::Borrowed("datetime"),
            TypeTag::Attachment => Cow::Borrowed("attachment"),
            TypeTag::Object => Cow::Borrowed("object"),
            TypeTag::Array => Cow::Borrowed("array"),
            TypeTag::Resource(kind) => Cow::Owned(kind.tag()),
            TypeTag::Other(token) => Cow::Borrowed(token),
        }
    }

    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            TypeTag::Resource(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TypeTag::Other(_))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<&str> for TypeTag {
    fn from(value: &str) -> Self {
        TypeTag::parse(value)
    }
}

impl From<ResourceKind> for TypeTag {
    fn from(kind: ResourceKind) -> Self {
        TypeTag::Resource(kind)
    }
}

impl Serialize for TypeTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        if token.is_empty() {
            return Err(serde::de::Error::custom("type tag must not be empty"));
        }
        Ok(TypeTag::parse(&token))
    }
}

/// Field name to node; the root shape of an encoded resource.
pub type TypedValueWrapper = BTreeMap<String, TypedValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TvnValue {
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
    Array(Vec<TypedValue>),
    Object(TypedValueWrapper),
}

impl TvnValue {
    /// Integral values are stored as JSON integers.
    pub fn number(value: f64) -> TvnValue {
        if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
            return TvnValue::Number(Number::from(value as i64));
        }
        Number::from_f64(value)
            .map(TvnValue::Number)
            .unwrap_or(TvnValue::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TvnValue::Null)
    }

    pub fn to_native(&self) -> Value {
        match self {
            TvnValue::Null => Value::Null,
            TvnValue::Boolean(b) => Value::Bool(*b),
            TvnValue::Number(n) => Value::Number(n.clone()),
            TvnValue::String(s) => Value::String(s.clone()),
            TvnValue::Array(items) => Value::Array(items.iter().map(TypedValue::to_native).collect()),
            TvnValue::Object(members) => Value::Object(wrapper_to_native(members)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            TvnValue::Array(items) => Value::Array(items.iter().map(TypedValue::to_json).collect()),
            TvnValue::Object(members) => Value::Object(wrapper_to_json(members)),
            primitive => primitive.to_native(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub tag: TypeTag,
    pub value: TvnValue,
}

impl<'de> Deserialize<'de> for TypedValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        parse_node(&raw, false, &mut Vec::new()).map_err(serde::de::Error::custom)
    }
}

impl TypedValue {
    pub fn new(tag: impl Into<TypeTag>, value: TvnValue) -> Self {
        Self {
            tag: tag.into(),
            value,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(TypeTag::String, TvnValue::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::new(TypeTag::Number, TvnValue::number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(TypeTag::Boolean, TvnValue::Boolean(value))
    }

    pub fn null(tag: impl Into<TypeTag>) -> Self {
        Self::new(tag, TvnValue::Null)
    }

    pub fn array(items: Vec<TypedValue>) -> Self {
        Self::new(TypeTag::Array, TvnValue::Array(items))
    }

    pub fn object(members: TypedValueWrapper) -> Self {
        Self::new(TypeTag::Object, TvnValue::Object(members))
    }

    pub fn resource(kind: ResourceKind, url: impl Into<String>) -> Self {
        Self::new(TypeTag::Resource(kind), TvnValue::String(url.into()))
    }

    /// Parses a JSON node using the non-strict shape rules.
    pub fn from_json(value: &Value) -> Result<Self, TvnError> {
        parse_node(value, false, &mut Vec::new()).map_err(TvnError::InvalidTvn)
    }

    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert("type".to_string(), Value::String(self.tag.to_string()));
        node.insert("value".to_string(), self.value.to_json());
        Value::Object(node)
    }

    pub fn to_native(&self) -> Value {
        self.value.to_native()
    }

    /// New object node with `key` set to `node`.
    pub fn with_member(&self, key: &str, node: TypedValue) -> Result<TypedValue, TvnError> {
        let TvnValue::Object(members) = &self.value else {
            return Err(not_a_container(&self.tag, "with_member"));
        };
        let mut members = members.clone();
        members.insert(key.to_string(), node);
        Ok(TypedValue::new(self.tag.clone(), TvnValue::Object(members)))
    }

    pub fn without_member(&self, key: &str) -> Result<TypedValue, TvnError> {
        let TvnValue::Object(members) = &self.value else {
            return Err(not_a_container(&self.tag, "without_member"));
        };
        if !members.contains_key(key) {
            return Err(TvnError::InvalidPath(format!("no member '{key}'")));
        }
        let mut members = members.clone();
        members.remove(key);
        Ok(TypedValue::new(self.tag.clone(), TvnValue::Object(members)))
    }

    /// New array node with `index` replaced; `index == len` appends.
    pub fn with_element(&self, index: usize, node: TypedValue) -> Result<TypedValue, TvnError> {
        let TvnValue::Array(items) = &self.value else {
            return Err(not_a_container(&self.tag, "with_element"));
        };
        let mut items = items.clone();
        match index.cmp(&items.len()) {
            std::cmp::Ordering::Less => items[index] = node,
            std::cmp::Ordering::Equal => items.push(node),
            std::cmp::Ordering::Greater => {
                return Err(TvnError::InvalidPath(format!(
                    "index {index} is past the end of an array of {}",
                    items.len()
                )));
            }
        }
        Ok(TypedValue::new(self.tag.clone(), TvnValue::Array(items)))
    }

    pub fn without_element(&self, index: usize) -> Result<TypedValue, TvnError> {
        let TvnValue::Array(items) = &self.value else {
            return Err(not_a_container(&self.tag, "without_element"));
        };
        if index >= items.len() {
            return Err(TvnError::InvalidPath(format!(
                "index {index} is out of range for an array of {}",
                items.len()
            )));
        }
        let mut items = items.clone();
        items.remove(index);
        Ok(TypedValue::new(self.tag.clone(), TvnValue::Array(items)))
    }

    pub fn get(&self, path: &[PathSegment]) -> Option<&TypedValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (first, &self.value) {
            (PathSegment::Key(key), TvnValue::Object(members)) => members.get(key)?,
            (PathSegment::Index(index), TvnValue::Array(items)) => items.get(*index)?,
            _ => return None,
        };
        child.get(rest)
    }

    /// New tree with the node at `path` replaced. Only the spine along the
    /// path is rebuilt.
    pub fn with_value_at(
        &self,
        path: &[PathSegment],
        node: TypedValue,
    ) -> Result<TypedValue, TvnError> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(node);
        };
        match (first, &self.value) {
            (PathSegment::Key(key), TvnValue::Object(members)) => {
                let replaced = match members.get(key) {
                    Some(child) => child.with_value_at(rest, node)?,
                    None if rest.is_empty() => node,
                    None => return Err(TvnError::InvalidPath(format!("no member '{key}'"))),
                };
                self.with_member(key, replaced)
            }
            (PathSegment::Index(index), TvnValue::Array(items)) => {
                let replaced = match items.get(*index) {
                    Some(child) => child.with_value_at(rest, node)?,
                    None if rest.is_empty() => node,
                    None => {
                        return Err(TvnError::InvalidPath(format!(
                            "index {index} is out of range"
                        )));
                    }
                };
                self.with_element(*index, replaced)
            }
            (segment, _) => Err(TvnError::InvalidPath(format!(
                "cannot descend into '{}' node with {segment}",
                self.tag
            ))),
        }
    }
}

fn not_a_container(tag: &TypeTag, operation: &str) -> TvnError {
    TvnError::InvalidPath(format!("{operation} requires a container but node is '{tag}'"))
}

/// A node or a whole-resource wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum Tvn {
    Node(TypedValue),
    Wrapper(TypedValueWrapper),
}

impl Tvn {
    pub fn to_native(&self) -> Value {
        match self {
            Tvn::Node(node) => node.to_native(),
            Tvn::Wrapper(wrapper) => Value::Object(wrapper_to_native(wrapper)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Tvn::Node(node) => node.to_json(),
            Tvn::Wrapper(wrapper) => Value::Object(wrapper_to_json(wrapper)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{key}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Why a candidate failed validation, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvnDiagnostic {
    pub reason: String,
    pub path: Vec<PathSegment>,
    pub candidate: String,
}

impl TvnDiagnostic {
    fn new(reason: impl Into<String>, path: &[PathSegment], candidate: &Value) -> Self {
        let mut rendered = candidate.to_string();
        if rendered.len() > CANDIDATE_PREVIEW_CHARS {
            let cut = (0..=CANDIDATE_PREVIEW_CHARS)
                .rev()
                .find(|idx| rendered.is_char_boundary(*idx))
                .unwrap_or(0);
            rendered.truncate(cut);
            rendered.push_str("...");
        }
        Self {
            reason: reason.into(),
            path: path.to_vec(),
            candidate: rendered,
        }
    }

    pub fn path_string(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            out.push_str(&segment.to_string());
        }
        out
    }
}

impl fmt::Display for TvnDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} (candidate: {})",
            self.reason,
            self.path_string(),
            self.candidate
        )
    }
}

impl std::error::Error for TvnDiagnostic {}

fn parse_node(
    value: &Value,
    strict: bool,
    path: &mut Vec<PathSegment>,
) -> Result<TypedValue, TvnDiagnostic> {
    let Value::Object(node) = value else {
        return Err(TvnDiagnostic::new(
            "TypeValueNotation check found non-object",
            path,
            value,
        ));
    };
    let (Some(raw_tag), Some(raw_value)) = (node.get("type"), node.get("value")) else {
        return Err(TvnDiagnostic::new(
            "TypeValueNotation check found an object without both 'type' and 'value'",
            path,
            value,
        ));
    };
    if node.len() != 2 {
        return Err(TvnDiagnostic::new(
            "TypeValueNotation check found keys other than 'type' and 'value'",
            path,
            value,
        ));
    }
    let tag = match raw_tag {
        Value::String(token) if !token.is_empty() => TypeTag::parse(token),
        _ => {
            return Err(TvnDiagnostic::new(
                "TypeValueNotation check found {type, value} but type is not a non-empty string",
                path,
                value,
            ));
        }
    };

    let parsed = match raw_value {
        Value::Array(items) => {
            if strict && tag != TypeTag::Array {
                return Err(TvnDiagnostic::new(
                    format!("TypeValueNotation check found an array value but type is '{tag}'"),
                    path,
                    value,
                ));
            }
            let mut nodes = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                nodes.push(parse_node(item, strict, path)?);
                path.pop();
            }
            return Ok(TypedValue::new(tag, TvnValue::Array(nodes)));
        }
        Value::Object(members) => {
            if strict && tag != TypeTag::Object {
                return Err(TvnDiagnostic::new(
                    format!("TypeValueNotation check found an object value but type is '{tag}'"),
                    path,
                    value,
                ));
            }
            let wrapper = parse_wrapper_map(members, strict, path)?;
            return Ok(TypedValue::new(tag, TvnValue::Object(wrapper)));
        }
        Value::Null => TvnValue::Null,
        Value::Bool(b) => TvnValue::Boolean(*b),
        Value::Number(n) => TvnValue::Number(n.clone()),
        Value::String(s) => TvnValue::String(s.clone()),
    };

    if let TypeTag::Resource(kind) = &tag {
        if !matches!(parsed, TvnValue::String(_) | TvnValue::Null) {
            return Err(TvnDiagnostic::new(
                format!("TypeValueNotation check found resource type {kind} with a non-string value"),
                path,
                value,
            ));
        }
        return Ok(TypedValue::new(tag, parsed));
    }

    if strict {
        let matches = match (&tag, &parsed) {
            (TypeTag::Other(_), _) => {
                return Err(TvnDiagnostic::new(
                    format!("TypeValueNotation check found unknown type '{tag}'"),
                    path,
                    value,
                ));
            }
            (_, TvnValue::Null) => true,
            (TypeTag::String, TvnValue::String(_))
            | (TypeTag::Number, TvnValue::Number(_))
            | (TypeTag::Boolean, TvnValue::Boolean(_))
            | (TypeTag::Datetime, TvnValue::String(_))
            | (TypeTag::Attachment, TvnValue::String(_)) => true,
            _ => false,
        };
        if !matches {
            return Err(TvnDiagnostic::new(
                format!("TypeValueNotation check found a value that is not of type '{tag}'"),
                path,
                value,
            ));
        }
    }
    Ok(TypedValue::new(tag, parsed))
}

fn parse_wrapper(
    value: &Value,
    strict: bool,
    path: &mut Vec<PathSegment>,
) -> Result<TypedValueWrapper, TvnDiagnostic> {
    match value {
        Value::Object(members) => parse_wrapper_map(members, strict, path),
        other => Err(TvnDiagnostic::new(
            "TypeValueNotationWrapper check found non-object",
            path,
            other,
        )),
    }
}

fn parse_wrapper_map(
    members: &Map<String, Value>,
    strict: bool,
    path: &mut Vec<PathSegment>,
) -> Result<TypedValueWrapper, TvnDiagnostic> {
    let mut wrapper = TypedValueWrapper::new();
    for (key, member) in members {
        path.push(PathSegment::Key(key.clone()));
        let node = parse_node(member, strict, path)?;
        path.pop();
        wrapper.insert(key.clone(), node);
    }
    Ok(wrapper)
}

pub fn validate_tvn(value: &Value, strict: bool) -> Result<(), TvnDiagnostic> {
    parse_node(value, strict, &mut Vec::new()).map(drop)
}

pub fn validate_tvn_wrapper(value: &Value, strict: bool) -> Result<(), TvnDiagnostic> {
    parse_wrapper(value, strict, &mut Vec::new()).map(drop)
}

pub fn is_tvn(value: &Value, strict: bool, verbose: bool) -> bool {
    report(validate_tvn(value, strict), verbose)
}

pub fn is_tvn_wrapper(value: &Value, strict: bool, verbose: bool) -> bool {
    report(validate_tvn_wrapper(value, strict), verbose)
}

fn report(result: Result<(), TvnDiagnostic>, verbose: bool) -> bool {
    match result {
        Ok(()) => true,
        Err(diagnostic) => {
            if verbose {
                warn!("{diagnostic}");
            }
            false
        }
    }
}

/// Strict check that fails instead of returning false.
pub fn validate_type_value_notation(value: &Value, allow_wrappers: bool) -> Result<Tvn, TvnError> {
    let node_error = match parse_node(value, true, &mut Vec::new()) {
        Ok(node) => return Ok(Tvn::Node(node)),
        Err(diagnostic) => diagnostic,
    };
    if allow_wrappers && let Ok(wrapper) = parse_wrapper(value, true, &mut Vec::new()) {
        return Ok(Tvn::Wrapper(wrapper));
    }
    Err(TvnError::InvalidTvn(node_error))
}

/// Parses either shape, wrappers first, with non-strict rules.
pub fn parse_type_value_notation(value: &Value) -> Result<Tvn, TvnError> {
    if let Ok(wrapper) = parse_wrapper(value, false, &mut Vec::new()) {
        return Ok(Tvn::Wrapper(wrapper));
    }
    parse_node(value, false, &mut Vec::new())
        .map(Tvn::Node)
        .map_err(TvnError::InvalidTvn)
}

/// Encodes a native value. Valid nodes are returned unchanged; a field hint
/// decides the tag, otherwise the tag follows the value's shape.
pub fn to_type_value_notation(value: &Value, field: Option<&FieldHint<'_>>) -> TypedValue {
    if let Ok(node) = parse_node(value, false, &mut Vec::new()) {
        return node;
    }
    let Some(hint) = field else {
        return encode_detected(value);
    };
    if hint.many {
        return match value {
            Value::Array(items) => TypedValue::array(
                items
                    .iter()
                    .map(|item| encode_with_tag(item, hint.tag))
                    .collect(),
            ),
            Value::Null => TypedValue::null(TypeTag::Array),
            other => encode_with_tag(other, hint.tag),
        };
    }
    encode_with_tag(value, hint.tag)
}

/// Encodes every top-level member, using the resource schema for hints.
pub fn to_type_value_notation_wrapper(
    object: &Map<String, Value>,
    schema: Option<&ResourceSchema>,
) -> TypedValueWrapper {
    if let Ok(wrapper) = parse_wrapper_map(object, false, &mut Vec::new()) {
        return wrapper;
    }
    object
        .iter()
        .map(|(key, value)| {
            let hint = schema
                .and_then(|schema| schema.field(key))
                .map(|field| FieldHint::from(field));
            (key.clone(), to_type_value_notation(value, hint.as_ref()))
        })
        .collect()
}

/// Decodes a node or wrapper back to native JSON.
pub fn from_type_value_notation(value: &Value) -> Result<Value, TvnError> {
    match parse_type_value_notation(value) {
        Ok(tvn) => Ok(tvn.to_native()),
        Err(err) => {
            error!("from_type_value_notation: input is not in TypeValue notation: {err}");
            Err(err)
        }
    }
}

/// The parts of a field schema entry that steer encoding.
#[derive(Debug, Clone, Copy)]
pub struct FieldHint<'a> {
    pub tag: &'a TypeTag,
    pub many: bool,
}

impl<'a> From<&'a crate::schema::FieldSpec> for FieldHint<'a> {
    fn from(field: &'a crate::schema::FieldSpec) -> Self {
        FieldHint {
            tag: &field.type_tag,
            many: field.many,
        }
    }
}

fn encode_with_tag(value: &Value, tag: &TypeTag) -> TypedValue {
    if let Ok(node) = parse_node(value, false, &mut Vec::new()) {
        return node;
    }
    if *tag == TypeTag::Object {
        return encode_detected(value);
    }
    TypedValue::new(tag.clone(), tag_directly(value))
}

fn tag_directly(value: &Value) -> TvnValue {
    match value {
        Value::Array(items) => TvnValue::Array(items.iter().map(encode_detected).collect()),
        Value::Object(members) => TvnValue::Object(encode_members(members)),
        Value::Null => TvnValue::Null,
        Value::Bool(b) => TvnValue::Boolean(*b),
        Value::Number(n) => TvnValue::Number(n.clone()),
        Value::String(s) => TvnValue::String(s.clone()),
    }
}

fn encode_detected(value: &Value) -> TypedValue {
    if let Ok(node) = parse_node(value, false, &mut Vec::new()) {
        return node;
    }
    match value {
        Value::Array(items) => TypedValue::array(items.iter().map(encode_detected).collect()),
        Value::Object(members) => TypedValue::object(encode_members(members)),
        Value::String(s) => TypedValue::string(s.clone()),
        Value::Number(n) => TypedValue::new(TypeTag::Number, TvnValue::Number(n.clone())),
        Value::Bool(b) => TypedValue::boolean(*b),
        Value::Null => TypedValue::null(TypeTag::Null),
    }
}

fn encode_members(members: &Map<String, Value>) -> TypedValueWrapper {
    members
        .iter()
        .map(|(key, value)| (key.clone(), encode_detected(value)))
        .collect()
}

pub fn wrapper_to_native(wrapper: &TypedValueWrapper) -> Map<String, Value> {
    wrapper
        .iter()
        .map(|(key, node)| (key.clone(), node.to_native()))
        .collect()
}

pub fn wrapper_to_json(wrapper: &TypedValueWrapper) -> Map<String, Value> {
    wrapper
        .iter()
        .map(|(key, node)| (key.clone(), node.to_json()))
        .collect()
}
