//! JSON and data-shaping utilities: parse, stringify, format, filter.
//!
//! `filter_array` conditions are parsed by a restricted predicate
//! grammar (`value[.field...] <op> <literal>` or `value contains "s"`),
//! never by evaluating the condition as code.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

// --- parse_json ---

pub struct ParseJsonTool;

#[async_trait]
impl Tool for ParseJsonTool {
    fn name(&self) -> &str {
        "parse_json"
    }

    fn description(&self) -> &str {
        "Parse a JSON string, validating its format and returning the \
         parsed data with type information."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [("jsonString", SchemaNode::string("The JSON string to parse"))],
            &["jsonString"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let raw = args["jsonString"].as_str().unwrap_or_default();
        let parsed: Value = serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("JSON parse failed: {e}"))?;

        let mut result = json!({
            "success": true,
            "type": value_type(&parsed),
        });
        // keys for objects, length for arrays
        match &parsed {
            Value::Object(map) => {
                let keys: Vec<&String> = map.keys().collect();
                result["keys"] = json!(keys);
            }
            Value::Array(items) => {
                result["length"] = json!(items.len());
            }
            _ => {}
        }
        result["data"] = parsed;
        Ok(result)
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// --- stringify_json ---

pub struct StringifyJsonTool;

#[async_trait]
impl Tool for StringifyJsonTool {
    fn name(&self) -> &str {
        "stringify_json"
    }

    fn description(&self) -> &str {
        "Serialize a value to a JSON string, pretty-printed by default."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                ("data", SchemaNode::any_object("The value to serialize")),
                (
                    "pretty",
                    SchemaNode::boolean("Indent the output")
                        .with_default(json!(true)),
                ),
            ],
            &["data"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let pretty = args["pretty"].as_bool().unwrap_or(true);
        let data = &args["data"];
        let serialized = if pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json!({
            "success": true,
            "jsonString": serialized,
            "length": serialized.len(),
        }))
    }
}

// --- format_data ---

pub struct FormatDataTool;

#[async_trait]
impl Tool for FormatDataTool {
    fn name(&self) -> &str {
        "format_data"
    }

    fn description(&self) -> &str {
        "Format a value as text: thousands-grouped numbers or case \
         transformations."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                ("data", SchemaNode::string("The value to format, as a string")),
                (
                    "format",
                    SchemaNode::string("Formatting to apply").with_enum(&[
                        "number",
                        "uppercase",
                        "lowercase",
                        "capitalize",
                    ]),
                ),
            ],
            &["data", "format"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let data = args["data"].as_str().unwrap_or_default();
        let format = args["format"].as_str().unwrap_or_default();

        let formatted = match format {
            "number" => {
                let parsed: f64 = data
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("'{data}' is not a number"))?;
                group_thousands(parsed)
            }
            "uppercase" => data.to_uppercase(),
            "lowercase" => data.to_lowercase(),
            "capitalize" => {
                let mut chars = data.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            }
            other => bail!("unsupported format: {other}"),
        };

        Ok(json!({
            "success": true,
            "original": data,
            "formatted": formatted,
            "format": format,
        }))
    }
}

/// "1234567.5" -> "1,234,567.5"
fn group_thousands(value: f64) -> String {
    let raw = format!("{value}");
    let (sign, raw) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", raw),
    };
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (raw, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

// --- filter_array ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

/// A parsed filter condition: a path into the item, a comparison, and a
/// literal operand.
#[derive(Debug)]
struct Predicate {
    path: Vec<String>,
    op: Comparison,
    literal: Value,
}

impl Predicate {
    fn parse(input: &str) -> Result<Self> {
        let rest = input.trim();
        let rest = rest
            .strip_prefix("value")
            .ok_or_else(|| anyhow::anyhow!("condition must start with 'value'"))?;

        let mut path = Vec::new();
        let mut rest = rest;
        while let Some(r) = rest.strip_prefix('.') {
            let end = r
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(r.len());
            if end == 0 {
                bail!("expected field name after '.'");
            }
            path.push(r[..end].to_string());
            rest = &r[end..];
        }

        let rest = rest.trim_start();
        let (op, rest) = if let Some(r) = rest.strip_prefix("==") {
            (Comparison::Eq, r)
        } else if let Some(r) = rest.strip_prefix("!=") {
            (Comparison::Ne, r)
        } else if let Some(r) = rest.strip_prefix("<=") {
            (Comparison::Le, r)
        } else if let Some(r) = rest.strip_prefix(">=") {
            (Comparison::Ge, r)
        } else if let Some(r) = rest.strip_prefix('<') {
            (Comparison::Lt, r)
        } else if let Some(r) = rest.strip_prefix('>') {
            (Comparison::Gt, r)
        } else if let Some(r) = rest.strip_prefix("contains") {
            (Comparison::Contains, r)
        } else {
            bail!("expected a comparison operator (==, !=, <, <=, >, >=, contains)");
        };

        let literal = parse_literal(rest.trim())?;
        if op == Comparison::Contains && !literal.is_string() {
            bail!("'contains' requires a string operand");
        }

        Ok(Self { path, op, literal })
    }

    /// Evaluate against one item. `None` means the item could not be
    /// evaluated (missing field, type mismatch) and is excluded.
    fn matches(&self, item: &Value) -> Option<bool> {
        let mut target = item;
        for field in &self.path {
            target = target.get(field)?;
        }

        match self.op {
            Comparison::Eq => Some(loose_eq(target, &self.literal)),
            Comparison::Ne => Some(!loose_eq(target, &self.literal)),
            Comparison::Contains => {
                let needle = self.literal.as_str()?;
                match target {
                    Value::String(s) => Some(s.contains(needle)),
                    Value::Array(items) => Some(items.iter().any(|v| loose_eq(v, &self.literal))),
                    _ => None,
                }
            }
            Comparison::Lt | Comparison::Le | Comparison::Gt | Comparison::Ge => {
                let ordering = compare(target, &self.literal)?;
                Some(match self.op {
                    Comparison::Lt => ordering.is_lt(),
                    Comparison::Le => ordering.is_le(),
                    Comparison::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }
        }
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

fn parse_literal(input: &str) -> Result<Value> {
    if input.is_empty() {
        bail!("missing comparison operand");
    }
    // Accept single-quoted strings as well as JSON literals.
    if input.len() >= 2 && input.starts_with('\'') && input.ends_with('\'') {
        return Ok(Value::String(input[1..input.len() - 1].to_string()));
    }
    let value: Value = serde_json::from_str(input)
        .map_err(|_| anyhow::anyhow!("invalid comparison operand: {input}"))?;
    if value.is_object() || value.is_array() {
        bail!("comparison operand must be a scalar");
    }
    Ok(value)
}

pub struct FilterArrayTool;

#[async_trait]
impl Tool for FilterArrayTool {
    fn name(&self) -> &str {
        "filter_array"
    }

    fn description(&self) -> &str {
        "Filter an array by a simple condition such as \"value > 10\", \
         \"value.name == 'widget'\", or \"value contains 'test'\"."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                ("array", SchemaNode::array("The array to filter")),
                ("condition", SchemaNode::string("The filter condition")),
            ],
            &["array", "condition"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let condition = args["condition"].as_str().unwrap_or_default();
        let predicate = Predicate::parse(condition)?;

        let items = args["array"].as_array().cloned().unwrap_or_default();
        let original_length = items.len();
        let filtered: Vec<Value> = items
            .into_iter()
            .filter(|item| predicate.matches(item).unwrap_or(false))
            .collect();

        Ok(json!({
            "success": true,
            "originalLength": original_length,
            "filteredLength": filtered.len(),
            "filtered": filtered,
            "condition": condition,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn parse_then_stringify_round_trips() {
        let source = r#"{"name":"widget","count":3,"tags":["a","b"]}"#;
        let parsed = ParseJsonTool
            .execute(json!({"jsonString": source}))
            .await
            .unwrap();
        assert_eq!(parsed["type"], "object");
        assert_eq!(parsed["keys"].as_array().unwrap().len(), 3);

        let stringified = StringifyJsonTool
            .execute(json!({"data": parsed["data"], "pretty": false}))
            .await
            .unwrap();
        let reparsed: Value =
            serde_json::from_str(stringified["jsonString"].as_str().unwrap()).unwrap();
        assert_eq!(reparsed, parsed["data"]);
    }

    #[tokio::test]
    async fn parse_json_reports_array_length() {
        let result = ParseJsonTool
            .execute(json!({"jsonString": "[1,2,3]"}))
            .await
            .unwrap();
        assert_eq!(result["type"], "array");
        assert_eq!(result["length"], 3);
    }

    #[tokio::test]
    async fn parse_json_rejects_malformed_input() {
        let err = ParseJsonTool
            .execute(json!({"jsonString": "{nope"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("JSON parse failed"));
    }

    #[tokio::test]
    async fn format_data_variants() {
        let upper = FormatDataTool
            .execute(json!({"data": "hello", "format": "uppercase"}))
            .await
            .unwrap();
        assert_eq!(upper["formatted"], "HELLO");

        let cap = FormatDataTool
            .execute(json!({"data": "hELLO wORLD", "format": "capitalize"}))
            .await
            .unwrap();
        assert_eq!(cap["formatted"], "Hello world");

        let number = FormatDataTool
            .execute(json!({"data": "1234567.5", "format": "number"}))
            .await
            .unwrap();
        assert_eq!(number["formatted"], "1,234,567.5");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(1234567.5), "1,234,567.5");
        assert_eq!(group_thousands(-1000.0), "-1,000");
        assert_eq!(group_thousands(999.0), "999");
    }

    #[test]
    fn predicate_grammar() {
        let p = Predicate::parse("value > 10").unwrap();
        assert!(p.matches(&json!(11)).unwrap());
        assert!(!p.matches(&json!(10)).unwrap());

        let p = Predicate::parse("value.price <= 5.5").unwrap();
        assert!(p.matches(&json!({"price": 5.5})).unwrap());
        assert!(!p.matches(&json!({"price": 6})).unwrap());

        let p = Predicate::parse("value.name == 'widget'").unwrap();
        assert!(p.matches(&json!({"name": "widget"})).unwrap());

        let p = Predicate::parse(r#"value contains "test""#).unwrap();
        assert!(p.matches(&json!("unit test")).unwrap());
        assert!(!p.matches(&json!("production")).unwrap());
    }

    #[test]
    fn predicate_rejects_code_like_conditions() {
        assert!(Predicate::parse("process.exit(1)").is_err());
        assert!(Predicate::parse("value; drop table").is_err());
        assert!(Predicate::parse("value.includes('x')").is_err());
    }

    #[test]
    fn unevaluable_items_are_excluded() {
        let p = Predicate::parse("value.count > 1").unwrap();
        // Missing field -> None -> excluded.
        assert!(p.matches(&json!({"other": 2})).is_none());
        // Type mismatch -> None.
        assert!(p.matches(&json!({"count": "two"})).is_none());
    }

    #[tokio::test]
    async fn filter_array_tool_end_to_end() {
        let result = FilterArrayTool
            .execute(json!({
                "array": [{"v": 1}, {"v": 12}, {"v": 30}, {"other": true}],
                "condition": "value.v > 10",
            }))
            .await
            .unwrap();
        assert_eq!(result["originalLength"], 4);
        assert_eq!(result["filteredLength"], 2);
        assert_eq!(result["filtered"][0]["v"], 12);
    }

    #[tokio::test]
    async fn filter_array_bad_condition_is_an_error() {
        let err = FilterArrayTool
            .execute(json!({"array": [1], "condition": "nonsense here"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("value"));
    }
}
