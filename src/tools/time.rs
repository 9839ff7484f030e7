//! Current time lookup.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, Local, Utc};
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time. Supports UTC, the local timezone, or a fixed \
         UTC offset, in ISO, locale, or epoch-timestamp format."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                (
                    "timezone",
                    SchemaNode::string(
                        "Timezone: \"UTC\", \"local\", or a fixed offset like \"+08:00\"",
                    )
                    .with_default(json!("local")),
                ),
                (
                    "format",
                    SchemaNode::string("Output format")
                        .with_enum(&["ISO", "locale", "timestamp"])
                        .with_default(json!("ISO")),
                ),
            ],
            &[],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let timezone = args["timezone"].as_str().unwrap_or("local");
        let format = args["format"].as_str().unwrap_or("ISO");

        let now = Utc::now();
        let (iso, display, tz_label) = match timezone {
            "UTC" | "utc" => (
                now.to_rfc3339(),
                now.format("%Y-%m-%d %H:%M:%S").to_string(),
                "UTC".to_string(),
            ),
            "local" => {
                let local = now.with_timezone(&Local);
                (
                    local.to_rfc3339(),
                    local.format("%Y-%m-%d %H:%M:%S").to_string(),
                    local.format("%:z").to_string(),
                )
            }
            other => {
                let offset = parse_fixed_offset(other)?;
                let shifted = now.with_timezone(&offset);
                (
                    shifted.to_rfc3339(),
                    shifted.format("%Y-%m-%d %H:%M:%S").to_string(),
                    other.to_string(),
                )
            }
        };

        let time: Value = match format {
            "timestamp" => json!(now.timestamp_millis()),
            "locale" => json!(display),
            _ => json!(iso),
        };

        Ok(json!({
            "success": true,
            "time": time,
            "timeString": iso,
            "timezone": tz_label,
            "timestamp": now.timestamp_millis(),
        }))
    }
}

/// Parse a "+HH:MM" / "-HH:MM" offset.
fn parse_fixed_offset(s: &str) -> Result<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1i32, &s[1..]),
        Some(b'-') => (-1i32, &s[1..]),
        _ => bail!("unsupported timezone '{s}': use \"UTC\", \"local\", or a fixed offset like \"+08:00\""),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid offset '{s}': expected \"+HH:MM\""))?;
    let hours: i32 = hours.parse()?;
    let minutes: i32 = minutes.parse()?;
    if hours > 23 || minutes > 59 {
        bail!("invalid offset '{s}': out of range");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("invalid offset '{s}': out of range"))
}
