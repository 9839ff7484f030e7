//! Built-in tool handlers.
//!
//! Each tool is an independent leaf: a schema plus an async handler.
//! They share nothing with the registry or each other beyond the
//! [`crate::registry::Tool`] contract.

pub mod calculator;
pub mod convert;
pub mod files;
pub mod json_tools;
pub mod products;
pub mod time;
pub mod weather;

use std::path::PathBuf;

use crate::registry::ToolRegistry;

/// Create a registry with every built-in tool registered.
pub fn create_default_registry(sandbox_root: PathBuf, product_search_base: String) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(time::CurrentTimeTool));
    registry.register(Box::new(weather::WeatherTool));
    registry.register(Box::new(calculator::CalculateTool));
    registry.register(Box::new(convert::ConvertUnitTool));
    registry.register(Box::new(json_tools::ParseJsonTool));
    registry.register(Box::new(json_tools::StringifyJsonTool));
    registry.register(Box::new(json_tools::FormatDataTool));
    registry.register(Box::new(json_tools::FilterArrayTool));
    registry.register(Box::new(files::ReadFileTool::new(sandbox_root.clone())));
    registry.register(Box::new(files::WriteFileTool::new(sandbox_root.clone())));
    registry.register(Box::new(files::ListFilesTool::new(sandbox_root)));
    registry.register(Box::new(products::ProductSearchTool::new(product_search_base)));
    registry
}
