//! JSON documents as Metapath node trees.
//!
//! The top-level JSON object must hold exactly one member whose value is an object; that member
//! becomes the root assembly. Inside an assembly:
//!
//! * members holding objects become child assemblies,
//! * members holding scalars become fields, or flags when the key starts with `@`,
//! * arrays repeat the member name once per element,
//! * `null` members are skipped.
//!
//! Members keep their document order.
//!
//! JSON strings become `xs:untypedAtomic`, integral numbers `xs:integer`, other numbers
//! `xs:decimal` and booleans `xs:boolean`.

use std::fs;
use std::str::FromStr;

use metapath::model::simple::{SimpleNode, SimpleNodeBuilder};
use metapath::{AtomicItem, DocumentLoader, Error, ErrorCode};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use tracing::debug;
use url::Url;

const FLAG_PREFIX: char = '@';

/// Loads `file:` URIs as JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDocumentLoader;

impl JsonDocumentLoader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentLoader<SimpleNode> for JsonDocumentLoader {
    fn load(&self, uri: &Url) -> Result<SimpleNode, Error> {
        if uri.scheme() != "file" {
            return Err(Error::dynamic(
                ErrorCode::FODC0002,
                format!("unsupported URI scheme '{}' in {uri}", uri.scheme()),
            ));
        }
        let path = uri
            .to_file_path()
            .map_err(|()| Error::dynamic(ErrorCode::FODC0002, format!("not a local file: {uri}")))?;
        debug!(path = %path.display(), "reading JSON document");
        let text = fs::read_to_string(&path)?;
        parse_document(&text, uri.clone())
    }
}

/// Build a document tree from JSON text. `uri` becomes the document and base URI.
pub fn parse_document(text: &str, uri: Url) -> Result<SimpleNode, Error> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        Error::dynamic(ErrorCode::FODC0002, format!("{uri} is not valid JSON: {e}"))
    })?;
    let Value::Object(top) = value else {
        return Err(Error::dynamic(ErrorCode::FODC0002, format!("{uri}: the top-level value must be an object")));
    };
    let mut members = top.iter();
    let (name, root) = match (members.next(), members.next()) {
        (Some((name, Value::Object(root))), None) if !name.starts_with(FLAG_PREFIX) => (name, root),
        _ => {
            return Err(Error::dynamic(
                ErrorCode::FODC0002,
                format!("{uri}: expected a single member holding the root object"),
            ));
        }
    };
    let root = assembly(name, root)?;
    Ok(SimpleNode::document().uri(uri).child(root).build())
}

fn assembly(name: &str, object: &Map<String, Value>) -> Result<SimpleNodeBuilder, Error> {
    object.iter().try_fold(SimpleNode::assembly(name), |builder, (key, value)| member(builder, key, value))
}

fn member(builder: SimpleNodeBuilder, key: &str, value: &Value) -> Result<SimpleNodeBuilder, Error> {
    if let Some(flag) = key.strip_prefix(FLAG_PREFIX) {
        return match value {
            Value::Null => Ok(builder),
            Value::Array(_) | Value::Object(_) => {
                Err(Error::dynamic(ErrorCode::FODC0002, format!("flag '{flag}' must hold a scalar value")))
            }
            scalar => Ok(builder.flag(SimpleNode::flag(flag, scalar_value(scalar)?))),
        };
    }
    match value {
        Value::Null => Ok(builder),
        Value::Object(object) => Ok(builder.child(assembly(key, object)?)),
        Value::Array(elements) => elements.iter().try_fold(builder, |builder, element| member(builder, key, element)),
        scalar => Ok(builder.child(SimpleNode::field(key, scalar_value(scalar)?))),
    }
}

fn scalar_value(value: &Value) -> Result<AtomicItem, Error> {
    match value {
        Value::String(s) => Ok(AtomicItem::untyped(s.as_str())),
        Value::Bool(b) => Ok(AtomicItem::Boolean(*b)),
        Value::Number(n) => number_value(n),
        other => Err(Error::dynamic(ErrorCode::FODC0002, format!("not a scalar JSON value: {other}"))),
    }
}

fn number_value(n: &Number) -> Result<AtomicItem, Error> {
    if let Some(i) = n.as_i64() {
        return Ok(AtomicItem::Integer(i));
    }
    let lexical = n.to_string();
    Decimal::from_str(&lexical)
        .or_else(|_| Decimal::from_scientific(&lexical))
        .map(AtomicItem::decimal)
        .map_err(|e| Error::dynamic(ErrorCode::FOCA0002, format!("cannot represent {lexical} as a decimal: {e}")))
}
