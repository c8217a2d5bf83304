//! Schema-guided coercion of raw tool arguments.
//!
//! Arguments arrive as a dynamic JSON object decoded from the server's
//! function-call string. Model output is sloppy about scalar types — numbers
//! as strings, booleans as 0/1 — so before a typed handler deserializes the
//! object, every value is coerced toward the type its schema declares.
//! Values without a usable schema node pass through untouched, which also
//! lets merged custom variables survive unharmed.

use anyhow::{anyhow, bail, Result};
use serde_json::{Map, Number, Value};

/// Coerce a full argument object against an object schema.
pub fn coerce_args(schema: &Value, args: Map<String, Value>) -> Result<Map<String, Value>> {
    match coerce_value(schema, Value::Object(args))? {
        Value::Object(out) => Ok(out),
        other => bail!("argument coercion produced a non-object: {other}"),
    }
}

/// Coerce one value toward the type declared by `schema`.
pub fn coerce_value(schema: &Value, value: Value) -> Result<Value> {
    // Nulls pass through; optional fields handle them downstream.
    if value.is_null() {
        return Ok(value);
    }
    let Some(target) = schema.get("type").and_then(Value::as_str) else {
        return Ok(value);
    };
    match target {
        "string" => coerce_string(value),
        "boolean" => coerce_bool(value),
        "integer" => coerce_integer(value),
        "number" => coerce_number(value),
        "array" => coerce_array(schema, value),
        "object" => coerce_object(schema, value),
        _ => Ok(value),
    }
}

fn coerce_string(value: Value) -> Result<Value> {
    let s = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        composite => composite.to_string(),
    };
    Ok(Value::String(s))
}

fn coerce_bool(value: Value) -> Result<Value> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::Number(n) => Ok(Value::Bool(n.as_f64().unwrap_or(0.0) != 0.0)),
        Value::String(s) => s
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| anyhow!("cannot convert {s:?} to boolean: {e}")),
        other => bail!("cannot convert {other} to boolean"),
    }
}

fn coerce_integer(value: Value) -> Result<Value> {
    match value {
        Value::Number(ref n) => {
            if n.is_i64() || n.is_u64() {
                Ok(value)
            } else {
                // Numeric truncation, matching the wire's lenient contract.
                let truncated = n.as_f64().unwrap_or(0.0) as i64;
                Ok(Value::Number(Number::from(truncated)))
            }
        }
        Value::String(s) => s
            .parse::<i64>()
            .map(|i| Value::Number(Number::from(i)))
            .map_err(|e| anyhow!("cannot convert {s:?} to integer: {e}")),
        other => bail!("cannot convert {other} to integer"),
    }
}

fn coerce_number(value: Value) -> Result<Value> {
    match value {
        Value::Number(_) => Ok(value),
        Value::String(s) => {
            let f = s
                .parse::<f64>()
                .map_err(|e| anyhow!("cannot convert {s:?} to number: {e}"))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("cannot convert {s:?} to a finite number"))
        }
        other => bail!("cannot convert {other} to number"),
    }
}

fn coerce_array(schema: &Value, value: Value) -> Result<Value> {
    let Value::Array(items) = value else {
        bail!("cannot convert {value} to array");
    };
    let item_schema = schema.get("items").cloned().unwrap_or(Value::Null);
    let coerced: Result<Vec<Value>> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            coerce_value(&item_schema, item).map_err(|e| anyhow!("array element {i}: {e}"))
        })
        .collect();
    Ok(Value::Array(coerced?))
}

fn coerce_object(schema: &Value, value: Value) -> Result<Value> {
    let Value::Object(fields) = value else {
        bail!("cannot convert {value} to object");
    };
    let properties = schema.get("properties").and_then(Value::as_object);
    let additional = schema.get("additionalProperties").filter(|v| v.is_object());

    let mut out = Map::with_capacity(fields.len());
    for (key, field) in fields {
        let field_schema = properties
            .and_then(|props| props.get(&key))
            .or(additional);
        let coerced = match field_schema {
            Some(fs) => coerce_value(fs, field).map_err(|e| anyhow!("field {key:?}: {e}"))?,
            // Keys the schema does not know about pass through unchanged.
            None => field,
        };
        out.insert(key, coerced);
    }
    Ok(Value::Object(out))
}
