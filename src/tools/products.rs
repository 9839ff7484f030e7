//! Product search against an external catalog API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::Tool;
use crate::schema::SchemaNode;

pub struct ProductSearchTool {
    base_url: String,
    client: reqwest::Client,
}

impl ProductSearchTool {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Tool for ProductSearchTool {
    fn name(&self) -> &str {
        "search_products"
    }

    fn description(&self) -> &str {
        "Search the product catalog by keyword. Returns basic product \
         information: id, title, and image URL. Keywords should be in \
         English, e.g. \"Oxygen Sensor\"."
    }

    fn schema(&self) -> SchemaNode {
        SchemaNode::object(
            [
                (
                    "keyword",
                    SchemaNode::string("Search keyword, e.g. \"Oxygen Sensor\""),
                ),
                (
                    "page",
                    SchemaNode::number("Page number, starting at 1").with_default(json!(1)),
                ),
                (
                    "size",
                    SchemaNode::number("Results per page").with_default(json!(20)),
                ),
            ],
            &["keyword"],
        )
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let keyword = args["keyword"].as_str().unwrap_or_default();
        let page = args["page"].as_u64().unwrap_or(1);
        let size = args["size"].as_u64().unwrap_or(20);

        let url = format!(
            "{}/search-pro/public/items/filter-search",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("keyword", keyword),
                ("page", &page.to_string()),
                ("size", &size.to_string()),
            ])
            .header("accept", "application/json")
            .send()
            .await
            .context("product search request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("product search failed: HTTP {status}");
        }

        let body: Value = response
            .json()
            .await
            .context("product search returned invalid JSON")?;

        let total = body
            .pointer("/itemList/total")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let products: Vec<Value> = body
            .pointer("/itemList/data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        json!({
                            "itemId": item.get("itemId").cloned().unwrap_or(Value::Null),
                            "title": item.get("title").cloned().unwrap_or(Value::Null),
                            "imageUrl": item.get("imageUrl").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "success": true,
            "keyword": keyword,
            "page": page,
            "size": size,
            "total": total,
            "count": products.len(),
            "products": products,
        }))
    }
}
