//! Mock weather lookup.
//!
//! Returns canned data for a few known cities and a deterministic
//! fallback derived from the city name otherwise, so repeated calls for
//! the same city agree.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

const CONDITIONS: [&str; 4] = ["sunny", "cloudy", "light rain", "overcast"];

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get weather information for a city. This is a mock weather API \
         returning sample data."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                ("city", SchemaNode::string("City name, e.g. \"Beijing\", \"New York\"")),
                (
                    "units",
                    SchemaNode::string("Temperature unit")
                        .with_enum(&["celsius", "fahrenheit"])
                        .with_default(json!("celsius")),
                ),
            ],
            &["city"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let city = args["city"].as_str().unwrap_or_default();
        let units = args["units"].as_str().unwrap_or("celsius");

        let (temp_c, condition, humidity) = lookup(city);
        let temperature = if units == "fahrenheit" {
            temp_c * 9.0 / 5.0 + 32.0
        } else {
            temp_c
        };

        Ok(json!({
            "success": true,
            "city": city,
            "temperature": (temperature * 10.0).round() / 10.0,
            "unit": units,
            "condition": condition,
            "humidity": humidity,
            "note": "mock data; a real deployment would call a weather API",
        }))
    }
}

fn lookup(city: &str) -> (f64, &'static str, u32) {
    match city {
        "Beijing" | "北京" => (15.0, "sunny", 45),
        "Shanghai" | "上海" => (18.0, "cloudy", 60),
        "New York" => (10.0, "light rain", 70),
        other => {
            // Stable pseudo-weather from the city name.
            let seed: u32 = other.bytes().fold(0u32, |acc, b| {
                acc.wrapping_mul(31).wrapping_add(b as u32)
            });
            let temp = 5.0 + (seed % 30) as f64;
            let condition = CONDITIONS[(seed / 7) as usize % CONDITIONS.len()];
            let humidity = 40 + seed % 40;
            (temp, condition, humidity)
        }
    }
}
