//! Random value generation from a JSON Schema tree.
//!
//! Used by mock mode to fabricate plausible tool arguments, and handy for
//! property tests. Deterministic under a seeded RNG.

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Map, Value};

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a value matching `schema`. `enum` wins over `type`; unknown or
/// absent types sample to null.
pub fn sample_schema<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Value {
    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.is_empty() {
            return options[rng.gen_range(0..options.len())].clone();
        }
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => sample_object(schema, rng),
        Some("array") => sample_array(schema, rng),
        Some("string") => Value::String(sample_string(schema, rng)),
        Some("integer") => {
            let (min, max) = bounds(schema);
            json!(rng.gen_range(min as i64..=max as i64))
        }
        Some("number") => {
            let (min, max) = bounds(schema);
            json!(rng.gen_range(min..=max))
        }
        Some("boolean") => Value::Bool(rng.gen_bool(0.5)),
        _ => Value::Null,
    }
}

fn sample_object<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Value {
    let mut out = Map::new();
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, prop_schema) in properties {
            out.insert(name.clone(), sample_schema(prop_schema, rng));
        }
    }
    Value::Object(out)
}

fn sample_array<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Value {
    let min_items = schema
        .get("minItems")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .max(1) as usize;
    let len = rng.gen_range(min_items..=min_items + 4);
    let item_schema = schema.get("items").cloned().unwrap_or(Value::Null);
    Value::Array((0..len).map(|_| sample_schema(&item_schema, rng)).collect())
}

fn sample_string<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> String {
    match schema.get("format").and_then(Value::as_str) {
        Some("date-time") => return Utc::now().to_rfc3339(),
        Some("email") => {
            return format!("{}@{}.com", random_chars(rng, 8), random_chars(rng, 5));
        }
        _ => {}
    }
    let min = schema
        .get("minLength")
        .and_then(Value::as_u64)
        .unwrap_or(5) as usize;
    let max = schema
        .get("maxLength")
        .and_then(Value::as_u64)
        .map(|m| m as usize)
        .unwrap_or(min + 5)
        .max(min);
    let len = rng.gen_range(min..=max);
    random_chars(rng, len)
}

fn random_chars<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn bounds(schema: &Value) -> (f64, f64) {
    let min = schema
        .get("minimum")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let max = schema
        .get("maximum")
        .and_then(Value::as_f64)
        .unwrap_or(100.0)
        .max(min);
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deterministic_under_seed() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 3, "maxLength": 8},
                "count": {"type": "integer", "minimum": 1, "maximum": 10},
                "tags": {"type": "array", "items": {"type": "string"}},
            }
        });
        let a = sample_schema(&schema, &mut StdRng::seed_from_u64(7));
        let b = sample_schema(&schema, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_bounds_are_respected() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let n = sample_schema(
                &json!({"type": "integer", "minimum": 5, "maximum": 9}),
                &mut rng,
            );
            let n = n.as_i64().unwrap();
            assert!((5..=9).contains(&n), "sampled {n}");

            let s = sample_schema(
                &json!({"type": "string", "minLength": 2, "maxLength": 4}),
                &mut rng,
            );
            let len = s.as_str().unwrap().len();
            assert!((2..=4).contains(&len), "sampled length {len}");

            let arr = sample_schema(
                &json!({"type": "array", "minItems": 3, "items": {"type": "boolean"}}),
                &mut rng,
            );
            let len = arr.as_array().unwrap().len();
            assert!((3..=7).contains(&len), "sampled array length {len}");
        }
    }

    #[test]
    fn test_enum_chooses_member() {
        let schema = json!({"type": "string", "enum": ["red", "green", "blue"]});
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let v = sample_schema(&schema, &mut rng);
            assert!(["red", "green", "blue"].contains(&v.as_str().unwrap()));
        }
    }

    #[test]
    fn test_formats() {
        let mut rng = StdRng::seed_from_u64(3);
        let dt = sample_schema(&json!({"type": "string", "format": "date-time"}), &mut rng);
        assert!(chrono::DateTime::parse_from_rfc3339(dt.as_str().unwrap()).is_ok());

        let email = sample_schema(&json!({"type": "string", "format": "email"}), &mut rng);
        let email = email.as_str().unwrap();
        assert!(email.contains('@') && email.ends_with(".com"));
    }

    #[test]
    fn test_unknown_type_is_null() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(sample_schema(&json!({"type": "blob"}), &mut rng), Value::Null);
        assert_eq!(sample_schema(&json!({}), &mut rng), Value::Null);
    }
}
