//! Operation-chain grammar parser
//!
//! Parses the compact operation mini-language used in request URLs:
//! operations are joined with `/` and applied left to right, each operation
//! carries `,`-separated parameters, and each parameter splits on the first
//! `_` into key and value:
//!
//! ```text
//! resize,p_50/crop,w_200,h_200,g_center/format,png
//! ```
//!
//! The parser only tokenizes and coerces; per-operation schemas live next to
//! the transforms and reject anything the grammar let through.

use crate::error::TransformError;
use serde::{Deserialize, Serialize};

/// Keys whose values are never coerced to integers. Free-text keys keep
/// everything after the first `_` verbatim, embedded underscores included.
const TEXTUAL_KEYS: &[&str] = &["color", "text", "content", "context", "image", "font"];

/// A single parameter value: integer when it parses, text otherwise.
/// Coercion failures are not parse errors - schemas decide what is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Int(_) => None,
            ParamValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One parsed operation: a name and its parameter map.
/// Parameter keys are unique; insertion order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    name: String,
    params: Vec<(String, ParamValue)>,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Integer value for `key`, or `InvalidParameter` when present but textual.
    pub fn int(&self, key: &str) -> Result<Option<i64>, TransformError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(ParamValue::Text(s)) => Err(TransformError::InvalidParameter(format!(
                "{} must be an integer, got '{}'",
                key, s
            ))),
        }
    }

    /// Textual value for `key`. Integer values render as their decimal form.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    /// Reject any parameter key that is not in `allowed`.
    pub fn ensure_known_keys(&self, allowed: &[&str]) -> Result<(), TransformError> {
        for (key, _) in &self.params {
            if !allowed.contains(&key.as_str()) {
                return Err(TransformError::InvalidParameter(format!(
                    "unknown parameter '{}' for operation '{}'",
                    key, self.name
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, key: String, value: ParamValue) -> Result<(), TransformError> {
        if self.has(&key) {
            return Err(TransformError::MalformedOperation(format!(
                "duplicate parameter '{}' in operation '{}'",
                key, self.name
            )));
        }
        self.params.push((key, value));
        Ok(())
    }
}

/// An ordered, immutable sequence of operations. Order is semantically
/// meaningful: operations apply left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationChain(Vec<Operation>);

impl OperationChain {
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a OperationChain {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parser for the operation-chain wire grammar.
pub struct ChainParser;

impl ChainParser {
    /// Parse a full operation string into an ordered chain.
    ///
    /// Empty segments (leading, trailing, or doubled `/`) are skipped.
    pub fn parse(operations: &str) -> Result<OperationChain, TransformError> {
        let ops = operations
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(Self::parse_segment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OperationChain(ops))
    }

    /// Parse one `,`-separated segment into an operation.
    fn parse_segment(segment: &str) -> Result<Operation, TransformError> {
        let mut tokens = segment.split(',');
        let name = tokens.next().unwrap_or_default();
        if name.is_empty() {
            return Err(TransformError::MalformedOperation(format!(
                "segment '{}' has no operation name",
                segment
            )));
        }

        let mut op = Operation {
            name: name.to_string(),
            params: Vec::new(),
        };

        for token in tokens {
            match token.split_once('_') {
                Some((key, value)) if !key.is_empty() => {
                    op.insert(key.to_string(), Self::coerce(key, value))?;
                }
                _ => Self::insert_bare(&mut op, token)?,
            }
        }

        Ok(op)
    }

    /// Bare tokens (no `key_` prefix) are meaningful only for a few
    /// operations: `format,png`, `rotate,90`, `auto-orient,1`.
    fn insert_bare(op: &mut Operation, token: &str) -> Result<(), TransformError> {
        match op.name.as_str() {
            "format" => op.insert("f".to_string(), ParamValue::Text(token.to_string())),
            "rotate" => {
                let degree = token.parse::<i64>().map_err(|_| {
                    TransformError::MalformedOperation(format!(
                        "rotate parameter must be numeric, got '{}'",
                        token
                    ))
                })?;
                op.insert("degree".to_string(), ParamValue::Int(degree))
            }
            "auto-orient" => {
                let auto = token.parse::<i64>().map_err(|_| {
                    TransformError::MalformedOperation(format!(
                        "auto-orient parameter must be 0 or 1, got '{}'",
                        token
                    ))
                })?;
                op.insert("auto".to_string(), ParamValue::Int(auto))
            }
            _ => Err(TransformError::MalformedOperation(format!(
                "parameter '{}' has no key for operation '{}'",
                token, op.name
            ))),
        }
    }

    /// Integer coercion with a permissive textual fallback; per-key schemas
    /// turn leftover text for numeric keys into `InvalidParameter` later.
    fn coerce(key: &str, value: &str) -> ParamValue {
        if TEXTUAL_KEYS.contains(&key) {
            return ParamValue::Text(value.to_string());
        }
        match value.parse::<i64>() {
            Ok(v) => ParamValue::Int(v),
            Err(_) => ParamValue::Text(value.to_string()),
        }
    }
}
