//! Decoding of Firestore REST typed values into plain JSON.

#![forbid(unsafe_code)]

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Number, Value};

/// Decode one typed value (`{"stringValue": "x"}` -> `"x"`).
pub fn decode_value(v: &Value) -> Result<Value> {
    let obj = v.as_object().ok_or_else(|| anyhow!("typed value is not an object: {}", v))?;
    let (kind, inner) = obj.iter().next().ok_or_else(|| anyhow!("typed value is empty"))?;
    if obj.len() != 1 {
        bail!("typed value has {} keys, expected 1", obj.len());
    }
    let out = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().ok_or_else(|| anyhow!("booleanValue not a bool"))?),
        "integerValue" => match inner {
            Value::String(s) => {
                let n: i64 = s.parse().with_context(|| format!("integerValue {:?}", s))?;
                Value::Number(n.into())
            }
            Value::Number(n) => Value::Number(n.clone()),
            other => bail!("integerValue has unexpected shape: {}", other),
        },
        "doubleValue" => match inner {
            Value::Number(n) => Value::Number(n.clone()),
            // NaN / Infinity travel as strings and have no JSON number form
            Value::String(s) => match s.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(s.clone()),
            },
            other => bail!("doubleValue has unexpected shape: {}", other),
        },
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => match inner {
            Value::String(s) => Value::String(s.clone()),
            other => bail!("{} is not a string: {}", kind, other),
        },
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let values = inner.get("values").and_then(|v| v.as_array());
            let mut out = Vec::with_capacity(values.map(|v| v.len()).unwrap_or(0));
            for item in values.into_iter().flatten() {
                out.push(decode_value(item)?);
            }
            Value::Array(out)
        }
        "mapValue" => match inner.get("fields").and_then(|f| f.as_object()) {
            Some(fields) => Value::Object(decode_fields(fields)?),
            None => Value::Object(Map::new()),
        },
        other => bail!("unknown value type {}", other),
    };
    Ok(out)
}

/// Decode a document `fields` map.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (k, v) in fields {
        out.insert(k.clone(), decode_value(v).with_context(|| format!("field {}", k))?);
    }
    Ok(out)
}

/// Document id from a resource name (`projects/../documents/col/ID`).
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
