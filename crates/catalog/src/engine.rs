//! Catalog query engine
//!
//! Implements the filter-driven search and the per-use-case ranking
//! policies. A store failure never yields partial results; callers get
//! the error and keep their previous UI state.

use serde::{Deserialize, Serialize};
use sommelier_config::{CatalogConfig, TieBreak};
use sommelier_core::{ActiveFilters, Wine};

use crate::pool::CatalogPool;
use crate::predicate::{Predicate, QueryBuilder};
use crate::schema::wine_from_row;
use crate::CatalogError;

/// Recommendation use cases recognized by the ranking policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    /// Higher price, aging potential.
    Investment,
    /// Good value crowd pleasers, optionally under a budget.
    Event,
    /// Quality focus.
    FineDining,
    /// Variety of price points across wine types.
    RestaurantProgram,
    /// Anything unrecognized or absent.
    General,
}

impl UseCase {
    /// Parse a use case string. Unknown values fall back to `General`
    /// rather than erroring, matching the voice tool contract.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("investment") => UseCase::Investment,
            Some("event") | Some("corporate_event") => UseCase::Event,
            Some("fine_dining") | Some("personal") => UseCase::FineDining,
            Some("restaurant_program") => UseCase::RestaurantProgram,
            _ => UseCase::General,
        }
    }

    /// Fixed per-use-case recommendation rationale.
    pub fn rationale(&self) -> &'static str {
        match self {
            UseCase::Investment => "Strong investment potential with aging capability",
            UseCase::Event => "Excellent value for group settings",
            UseCase::FineDining => "Premium selection for special occasions",
            UseCase::RestaurantProgram | UseCase::General => {
                "Quality selection from our cellar"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::Investment => "investment",
            UseCase::Event => "event",
            UseCase::FineDining => "fine_dining",
            UseCase::RestaurantProgram => "restaurant_program",
            UseCase::General => "general",
        }
    }
}

/// A ranked, rationale-annotated recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1-based rank within the result set.
    pub rank: usize,
    #[serde(flatten)]
    pub wine: Wine,
    pub recommendation_reason: String,
}

/// Filter-driven queries against the wine catalog.
#[derive(Clone)]
pub struct CatalogQueryEngine {
    pool: CatalogPool,
    config: CatalogConfig,
}

impl CatalogQueryEngine {
    pub fn new(pool: CatalogPool, config: CatalogConfig) -> Self {
        Self { pool, config }
    }

    fn search_order(&self) -> &'static str {
        match self.config.tie_break {
            TieBreak::IdAscending => "price_retail ASC, id ASC",
            TieBreak::NameAscending => "price_retail ASC, name ASC",
        }
    }

    /// Conjunctive filtered search, price ascending, capped at the
    /// configured limit (5 by default).
    pub async fn search(&self, filters: &ActiveFilters) -> Result<Vec<Wine>, CatalogError> {
        let builder = QueryBuilder::new()
            .predicates(Predicate::from_filters(filters))
            .order_by(self.search_order())
            .limit(self.config.search_limit);
        let wines = self.run(builder).await?;
        tracing::debug!(count = wines.len(), ?filters, "catalog search");
        Ok(wines)
    }

    /// Resolve a single wine by case-insensitive name match, cheapest
    /// match first.
    pub async fn get_by_name(&self, name: &str) -> Result<Wine, CatalogError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::Validation("wine name must not be empty".into()));
        }
        let pool = self.pool.clone();
        let pattern = format!("%{trimmed}%");
        let sql = format!(
            "SELECT {} FROM wines WHERE is_active = 1 AND LOWER(name) LIKE LOWER(?) \
             ORDER BY price_retail ASC, id ASC LIMIT 1",
            crate::schema::WINE_COLUMNS
        );
        let name_owned = trimmed.to_string();
        tokio::task::spawn_blocking(move || -> Result<Wine, CatalogError> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map([pattern], wine_from_row)?;
            match rows.next() {
                Some(row) => Ok(row?),
                None => Err(CatalogError::NotFound(name_owned)),
            }
        })
        .await
        .map_err(|e| CatalogError::Join(e.to_string()))?
    }

    /// All active wines, ordered for country-grouped voice navigation.
    pub async fn list(&self) -> Result<Vec<Wine>, CatalogError> {
        let builder = QueryBuilder::new()
            .predicate(Predicate::ActiveOnly)
            .order_by("country ASC, region ASC, name ASC");
        self.run(builder).await
    }

    /// Per-use-case ranked recommendations, capped at the configured
    /// limit (3 by default).
    pub async fn recommend(
        &self,
        use_case: UseCase,
        budget: Option<f64>,
    ) -> Result<Vec<Recommendation>, CatalogError> {
        if let Some(budget) = budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(CatalogError::Validation(format!(
                    "budget must be a non-negative number, got {budget}"
                )));
            }
        }

        let mut builder = QueryBuilder::new().predicate(Predicate::ActiveOnly);
        builder = match use_case {
            UseCase::Investment => builder
                .predicate(Predicate::PriceAtLeast(50.0))
                .order_by("price_retail DESC, id ASC"),
            UseCase::Event => {
                if let Some(budget) = budget {
                    builder = builder.predicate(Predicate::PriceAtMost(budget));
                }
                builder.order_by("price_retail ASC, id ASC")
            }
            UseCase::FineDining => builder.order_by("price_retail DESC, id ASC"),
            UseCase::RestaurantProgram => {
                builder.order_by("wine_type ASC, price_retail ASC, id ASC")
            }
            UseCase::General => builder.order_by("price_retail ASC, id ASC"),
        };
        let builder = builder.limit(self.config.recommend_limit);

        let wines = self.run(builder).await?;
        tracing::debug!(
            use_case = use_case.as_str(),
            budget,
            count = wines.len(),
            "catalog recommend"
        );
        Ok(wines
            .into_iter()
            .enumerate()
            .map(|(i, wine)| Recommendation {
                rank: i + 1,
                wine,
                recommendation_reason: use_case.rationale().to_string(),
            })
            .collect())
    }

    async fn run(&self, builder: QueryBuilder) -> Result<Vec<Wine>, CatalogError> {
        let pool = self.pool.clone();
        let (sql, params) = builder.build();
        tokio::task::spawn_blocking(move || -> Result<Vec<Wine>, CatalogError> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(params), wine_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
        .map_err(|e| CatalogError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::create_pool;
    use crate::schema::{ensure_schema, insert_wine, seed_demo_catalog};

    fn engine() -> CatalogQueryEngine {
        let pool = create_pool(":memory:").unwrap();
        {
            let conn = pool.get().unwrap();
            ensure_schema(&conn).unwrap();
            seed_demo_catalog(&conn).unwrap();
        }
        CatalogQueryEngine::new(pool, CatalogConfig::default())
    }

    #[tokio::test]
    async fn test_search_unfiltered_caps_at_five_ascending() {
        let engine = engine();
        let wines = engine.search(&ActiveFilters::default()).await.unwrap();
        assert_eq!(wines.len(), 5);
        for pair in wines.windows(2) {
            assert!(pair[0].price_retail <= pair[1].price_retail);
        }
        assert!(wines.iter().all(|w| w.is_active));
    }

    #[tokio::test]
    async fn test_search_region_case_insensitive_with_price_cap() {
        let engine = engine();
        let filters = ActiveFilters {
            region: Some("bordeaux".into()),
            max_price: Some(1000.0),
            ..Default::default()
        };
        let wines = engine.search(&filters).await.unwrap();
        assert!(!wines.is_empty());
        assert!(wines.len() <= 5);
        for wine in &wines {
            assert!(wine.region.to_lowercase().contains("bordeaux"));
            assert!(wine.price_retail <= 1000.0);
        }
        for pair in wines.windows(2) {
            assert!(pair[0].price_retail <= pair[1].price_retail);
        }
    }

    #[tokio::test]
    async fn test_search_type_is_exact_match() {
        let engine = engine();
        let filters = ActiveFilters {
            wine_type: Some("RED".into()),
            ..Default::default()
        };
        let wines = engine.search(&filters).await.unwrap();
        assert!(!wines.is_empty());
        assert!(wines.iter().all(|w| w.wine_type == "red"));
    }

    #[tokio::test]
    async fn test_inactive_wines_are_invisible() {
        let pool = create_pool(":memory:").unwrap();
        {
            let conn = pool.get().unwrap();
            ensure_schema(&conn).unwrap();
            seed_demo_catalog(&conn).unwrap();
            let mut wine = conn
                .query_row(
                    &format!("SELECT {} FROM wines WHERE id = 1", crate::schema::WINE_COLUMNS),
                    [],
                    crate::schema::wine_from_row,
                )
                .unwrap();
            wine.is_active = false;
            insert_wine(&conn, &wine).unwrap();
        }
        let engine = CatalogQueryEngine::new(pool, CatalogConfig::default());
        let filters = ActiveFilters {
            min_price: Some(600.0),
            ..Default::default()
        };
        let wines = engine.search(&filters).await.unwrap();
        assert!(wines.iter().all(|w| w.id != 1));
    }

    #[tokio::test]
    async fn test_equal_price_tie_breaks_by_id() {
        let pool = create_pool(":memory:").unwrap();
        {
            let conn = pool.get().unwrap();
            ensure_schema(&conn).unwrap();
            seed_demo_catalog(&conn).unwrap();
            let mut clone = conn
                .query_row(
                    &format!("SELECT {} FROM wines WHERE id = 5", crate::schema::WINE_COLUMNS),
                    [],
                    crate::schema::wine_from_row,
                )
                .unwrap();
            clone.id = 99;
            insert_wine(&conn, &clone).unwrap();
        }
        let engine = CatalogQueryEngine::new(pool, CatalogConfig::default());
        let wines = engine.search(&ActiveFilters::default()).await.unwrap();
        let same_price: Vec<i64> = wines
            .iter()
            .filter(|w| w.price_retail == 32.0)
            .map(|w| w.id)
            .collect();
        assert_eq!(same_price, vec![5, 99]);
    }

    #[tokio::test]
    async fn test_investment_policy() {
        let engine = engine();
        let recs = engine.recommend(UseCase::Investment, None).await.unwrap();
        assert!(recs.len() <= 3);
        assert!(!recs.is_empty());
        for rec in &recs {
            assert!(rec.wine.price_retail >= 50.0);
            assert_eq!(
                rec.recommendation_reason,
                "Strong investment potential with aging capability"
            );
        }
        for pair in recs.windows(2) {
            assert!(pair[0].wine.price_retail >= pair[1].wine.price_retail);
        }
        assert_eq!(recs[0].rank, 1);
    }

    #[tokio::test]
    async fn test_event_policy_respects_budget() {
        let engine = engine();
        let recs = engine
            .recommend(UseCase::Event, Some(40.0))
            .await
            .unwrap();
        assert!(!recs.is_empty());
        for rec in &recs {
            assert!(rec.wine.price_retail <= 40.0);
        }
        for pair in recs.windows(2) {
            assert!(pair[0].wine.price_retail <= pair[1].wine.price_retail);
        }
    }

    #[tokio::test]
    async fn test_restaurant_program_groups_by_type() {
        let engine = engine();
        let recs = engine
            .recommend(UseCase::RestaurantProgram, None)
            .await
            .unwrap();
        let types: Vec<&str> = recs.iter().map(|r| r.wine.wine_type.as_str()).collect();
        let mut sorted = types.clone();
        sorted.sort();
        assert_eq!(types, sorted);
    }

    #[tokio::test]
    async fn test_unknown_use_case_is_general() {
        assert_eq!(UseCase::parse(Some("wedding")), UseCase::General);
        assert_eq!(UseCase::parse(None), UseCase::General);
        assert_eq!(UseCase::parse(Some("corporate_event")), UseCase::Event);
        assert_eq!(UseCase::parse(Some("personal")), UseCase::FineDining);
    }

    #[tokio::test]
    async fn test_negative_budget_is_validation_error() {
        let engine = engine();
        let err = engine
            .recommend(UseCase::Event, Some(-5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let engine = engine();
        let wine = engine.get_by_name("lynch").await.unwrap();
        assert_eq!(wine.name, "Lynch Bages");

        let err = engine.get_by_name("Screaming Eagle").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        let err = engine.get_by_name("   ").await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_orders_for_country_grouping() {
        let engine = engine();
        let wines = engine.list().await.unwrap();
        assert_eq!(wines.len(), 8);
        let countries: Vec<&str> = wines.iter().map(|w| w.country.as_str()).collect();
        let mut sorted = countries.clone();
        sorted.sort();
        assert_eq!(countries, sorted);
    }
}
