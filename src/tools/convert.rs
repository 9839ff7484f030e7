//! Unit conversion: length, weight, temperature.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

const UNITS: [&str; 13] = [
    "meter",
    "kilometer",
    "centimeter",
    "inch",
    "foot",
    "mile",
    "kilogram",
    "gram",
    "pound",
    "ounce",
    "celsius",
    "fahrenheit",
    "kelvin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Length,
    Weight,
    Temperature,
}

/// Factor to the category base unit (meter or kilogram).
fn unit_info(unit: &str) -> Option<(Category, f64)> {
    let info = match unit {
        "meter" => (Category::Length, 1.0),
        "kilometer" => (Category::Length, 1000.0),
        "centimeter" => (Category::Length, 0.01),
        "inch" => (Category::Length, 0.0254),
        "foot" => (Category::Length, 0.3048),
        "mile" => (Category::Length, 1609.34),
        "kilogram" => (Category::Weight, 1.0),
        "gram" => (Category::Weight, 0.001),
        "pound" => (Category::Weight, 0.453592),
        "ounce" => (Category::Weight, 0.0283495),
        "celsius" | "fahrenheit" | "kelvin" => (Category::Temperature, 1.0),
        _ => return None,
    };
    Some(info)
}

pub struct ConvertUnitTool;

#[async_trait]
impl Tool for ConvertUnitTool {
    fn name(&self) -> &str {
        "convert_unit"
    }

    fn description(&self) -> &str {
        "Convert a value between units. Supports common length, weight, \
         and temperature units."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                ("value", SchemaNode::number("The value to convert")),
                (
                    "fromUnit",
                    SchemaNode::string("Source unit").with_enum(&UNITS),
                ),
                (
                    "toUnit",
                    SchemaNode::string("Target unit").with_enum(&UNITS),
                ),
            ],
            &["value", "fromUnit", "toUnit"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let value = args["value"].as_f64().unwrap_or_default();
        let from_unit = args["fromUnit"].as_str().unwrap_or_default();
        let to_unit = args["toUnit"].as_str().unwrap_or_default();
        let result = convert(value, from_unit, to_unit)?;

        Ok(json!({
            "success": true,
            "value": value,
            "fromUnit": from_unit,
            "toUnit": to_unit,
            "result": result,
        }))
    }
}

pub fn convert(value: f64, from_unit: &str, to_unit: &str) -> Result<f64> {
    let (from_cat, from_factor) = unit_info(from_unit)
        .ok_or_else(|| anyhow::anyhow!("unsupported unit: {from_unit}"))?;
    let (to_cat, to_factor) =
        unit_info(to_unit).ok_or_else(|| anyhow::anyhow!("unsupported unit: {to_unit}"))?;

    if from_cat != to_cat {
        bail!("unit category mismatch: cannot convert {from_unit} to {to_unit}");
    }

    if from_cat == Category::Temperature {
        let celsius = match from_unit {
            "fahrenheit" => (value - 32.0) * 5.0 / 9.0,
            "kelvin" => value - 273.15,
            _ => value,
        };
        let result = match to_unit {
            "fahrenheit" => celsius * 9.0 / 5.0 + 32.0,
            "kelvin" => celsius + 273.15,
            _ => celsius,
        };
        // Temperature reported to two decimal places.
        return Ok((result * 100.0).round() / 100.0);
    }

    let base = value * from_factor;
    let result = base / to_factor;
    Ok((result * 1_000_000.0).round() / 1_000_000.0)
}
