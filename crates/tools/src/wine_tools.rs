//! The four wine tools
//!
//! Result shapes are voice-ready JSON: currency fields are formatted with
//! the `£` symbol at this boundary while raw numeric values stay internal
//! for filtering and sorting.

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use sommelier_catalog::{CatalogQueryEngine, Recommendation, UseCase};
use sommelier_core::{ActiveFilters, Wine};

use crate::registry::ToolRegistry;
use crate::tool::{check_arguments, compile_schema, Tool, ToolOutput, ToolSchema};
use crate::ToolError;

/// Serialize a wine for the voice response, with formatted prices.
fn wine_to_voice_json(wine: &Wine) -> Value {
    let mut obj = match serde_json::to_value(wine) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    obj.insert("price_retail".into(), json!(wine.display_price()));
    match wine.display_trade_price() {
        Some(price) => obj.insert("price_trade".into(), json!(price)),
        None => obj.remove("price_trade"),
    };
    Value::Object(obj)
}

fn recommendation_to_voice_json(rec: &Recommendation) -> Value {
    let mut obj = match wine_to_voice_json(&rec.wine) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    obj.insert("rank".into(), json!(rec.rank));
    obj.insert(
        "recommendation_reason".into(),
        json!(rec.recommendation_reason),
    );
    Value::Object(obj)
}

/// `search_wines`: filtered catalog search.
pub struct SearchWinesTool {
    engine: Arc<CatalogQueryEngine>,
    schema: Value,
    compiled: JSONSchema,
}

impl SearchWinesTool {
    pub fn new(engine: Arc<CatalogQueryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "country": { "type": "string" },
                "region": { "type": "string" },
                "wine_type": { "type": "string" },
                "style": { "type": "string" },
                "grape_variety": { "type": "string" },
                "min_price": { "type": "number", "minimum": 0 },
                "max_price": { "type": "number", "minimum": 0 }
            }
        });
        let compiled = compile_schema(&schema);
        Self {
            engine,
            schema,
            compiled,
        }
    }
}

#[async_trait]
impl Tool for SearchWinesTool {
    fn name(&self) -> &str {
        "search_wines"
    }

    fn description(&self) -> &str {
        "Search the wine catalog by country, region, type, grape, style, and price range"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            input_schema: self.schema.clone(),
        }
    }

    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        check_arguments(&self.compiled, arguments)
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let filters = ActiveFilters::from_arguments(&arguments)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let wines = self.engine.search(&filters).await?;
        let formatted: Vec<Value> = wines.iter().map(wine_to_voice_json).collect();
        let message = if formatted.is_empty() {
            "No wines found matching those criteria in our cellar".to_string()
        } else {
            format!("Found {} wines in our cellar", formatted.len())
        };
        Ok(ToolOutput::json(json!({
            "success": true,
            "count": formatted.len(),
            "wines": formatted,
            "message": message,
        })))
    }
}

/// `get_wine`: resolve a single wine by name.
pub struct GetWineTool {
    engine: Arc<CatalogQueryEngine>,
    schema: Value,
    compiled: JSONSchema,
}

impl GetWineTool {
    pub fn new(engine: Arc<CatalogQueryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 }
            },
            "required": ["name"]
        });
        let compiled = compile_schema(&schema);
        Self {
            engine,
            schema,
            compiled,
        }
    }
}

#[async_trait]
impl Tool for GetWineTool {
    fn name(&self) -> &str {
        "get_wine"
    }

    fn description(&self) -> &str {
        "Look up a single wine by name"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            input_schema: self.schema.clone(),
        }
    }

    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        check_arguments(&self.compiled, arguments)
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let name = arguments
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("name is required".into()))?;
        let wine = self.engine.get_by_name(name).await?;
        Ok(ToolOutput::json(json!({
            "success": true,
            "wine": wine_to_voice_json(&wine),
            "message": format!("{} from {} is in our cellar", wine.name, wine.winery),
        })))
    }
}

/// `list_wines`: full catalog summary grouped by country.
pub struct ListWinesTool {
    engine: Arc<CatalogQueryEngine>,
    schema: Value,
    compiled: JSONSchema,
}

impl ListWinesTool {
    pub fn new(engine: Arc<CatalogQueryEngine>) -> Self {
        let schema = json!({ "type": "object" });
        let compiled = compile_schema(&schema);
        Self {
            engine,
            schema,
            compiled,
        }
    }
}

#[async_trait]
impl Tool for ListWinesTool {
    fn name(&self) -> &str {
        "list_wines"
    }

    fn description(&self) -> &str {
        "List the catalog as a country-grouped summary for voice navigation"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            input_schema: self.schema.clone(),
        }
    }

    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        check_arguments(&self.compiled, arguments)
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        let wines = self.engine.list().await?;
        let total = wines.len();

        // Rows arrive country-ordered, so grouping is a single pass.
        let mut by_country: Vec<(String, Vec<Value>)> = Vec::new();
        for wine in &wines {
            let entry = json!({
                "id": wine.id,
                "name": wine.name,
                "winery": wine.winery,
                "region": wine.region,
                "wine_type": wine.wine_type,
                "vintage": wine.vintage,
                "price": wine.display_price(),
                "grape": wine.grape_variety,
            });
            match by_country.last_mut() {
                Some((country, group)) if *country == wine.country => group.push(entry),
                _ => by_country.push((wine.country.clone(), vec![entry])),
            }
        }

        let countries: Vec<&String> = by_country.iter().map(|(c, _)| c).collect();
        let message = format!(
            "Our cellar holds {total} wines from {} countries: {}",
            countries.len(),
            countries
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let grouped: Vec<Value> = by_country
            .iter()
            .map(|(country, group)| {
                json!({
                    "country": country,
                    "count": group.len(),
                    "wines": group,
                })
            })
            .collect();

        Ok(ToolOutput::json(json!({
            "success": true,
            "total_wines": total,
            "countries": countries,
            "by_country": grouped,
            "message": message,
        })))
    }
}

/// `recommend_wines`: use-case driven recommendations.
pub struct RecommendWinesTool {
    engine: Arc<CatalogQueryEngine>,
    schema: Value,
    compiled: JSONSchema,
}

impl RecommendWinesTool {
    pub fn new(engine: Arc<CatalogQueryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "use_case": { "type": "string" },
                "budget": { "type": "number", "minimum": 0 }
            }
        });
        let compiled = compile_schema(&schema);
        Self {
            engine,
            schema,
            compiled,
        }
    }
}

#[async_trait]
impl Tool for RecommendWinesTool {
    fn name(&self) -> &str {
        "recommend_wines"
    }

    fn description(&self) -> &str {
        "Recommend wines for a use case (investment, event, fine dining, restaurant program)"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            input_schema: self.schema.clone(),
        }
    }

    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        check_arguments(&self.compiled, arguments)
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let use_case = UseCase::parse(arguments.get("use_case").and_then(Value::as_str));
        let budget = arguments.get("budget").and_then(Value::as_f64);
        let recommendations = self.engine.recommend(use_case, budget).await?;
        let formatted: Vec<Value> = recommendations
            .iter()
            .map(recommendation_to_voice_json)
            .collect();
        let message = if formatted.is_empty() {
            "No matching wines found for those criteria".to_string()
        } else {
            format!(
                "Here are {} recommendations from our cellar for {}",
                formatted.len(),
                use_case.as_str()
            )
        };
        Ok(ToolOutput::json(json!({
            "success": true,
            "use_case": use_case.as_str(),
            "count": formatted.len(),
            "recommendations": formatted,
            "message": message,
        })))
    }
}

/// Register all four wine tools over one engine.
pub fn create_wine_registry(engine: Arc<CatalogQueryEngine>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SearchWinesTool::new(engine.clone()));
    registry.register(GetWineTool::new(engine.clone()));
    registry.register(ListWinesTool::new(engine.clone()));
    registry.register(RecommendWinesTool::new(engine));
    registry
}
