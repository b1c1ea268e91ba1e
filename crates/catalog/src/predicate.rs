//! Structured query predicates
//!
//! Each predicate kind renders to one parameterized SQL fragment. Filter
//! values only ever travel as bound parameters; the SQL text is assembled
//! from fixed fragments.

use rusqlite::types::Value;
use sommelier_core::ActiveFilters;

/// Enumerated predicate kinds over the wines table.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Only active catalog records. Always present.
    ActiveOnly,
    CountryContains(String),
    RegionContains(String),
    StyleContains(String),
    GrapeContains(String),
    TypeEquals(String),
    ColorEquals(String),
    VintageEquals(i32),
    PriceAtLeast(f64),
    PriceAtMost(f64),
}

impl Predicate {
    /// SQL fragment plus its bound parameter, if any.
    fn render(&self) -> (&'static str, Option<Value>) {
        match self {
            Predicate::ActiveOnly => ("is_active = 1", None),
            Predicate::CountryContains(v) => {
                ("LOWER(country) LIKE LOWER(?)", Some(like_pattern(v)))
            }
            Predicate::RegionContains(v) => {
                ("LOWER(region) LIKE LOWER(?)", Some(like_pattern(v)))
            }
            Predicate::StyleContains(v) => ("LOWER(style) LIKE LOWER(?)", Some(like_pattern(v))),
            Predicate::GrapeContains(v) => {
                ("LOWER(grape_variety) LIKE LOWER(?)", Some(like_pattern(v)))
            }
            Predicate::TypeEquals(v) => {
                ("LOWER(wine_type) = LOWER(?)", Some(Value::Text(v.clone())))
            }
            Predicate::ColorEquals(v) => ("LOWER(color) = LOWER(?)", Some(Value::Text(v.clone()))),
            Predicate::VintageEquals(v) => ("vintage = ?", Some(Value::Integer(*v as i64))),
            Predicate::PriceAtLeast(v) => ("price_retail >= ?", Some(Value::Real(*v))),
            Predicate::PriceAtMost(v) => ("price_retail <= ?", Some(Value::Real(*v))),
        }
    }

    /// Expand a sparse filter record into its predicate list. Absent
    /// fields contribute nothing.
    pub fn from_filters(filters: &ActiveFilters) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::ActiveOnly];
        if let Some(v) = &filters.country {
            predicates.push(Predicate::CountryContains(v.clone()));
        }
        if let Some(v) = &filters.region {
            predicates.push(Predicate::RegionContains(v.clone()));
        }
        if let Some(v) = &filters.wine_type {
            predicates.push(Predicate::TypeEquals(v.clone()));
        }
        if let Some(v) = &filters.color {
            predicates.push(Predicate::ColorEquals(v.clone()));
        }
        if let Some(v) = &filters.grape_variety {
            predicates.push(Predicate::GrapeContains(v.clone()));
        }
        if let Some(v) = &filters.style {
            predicates.push(Predicate::StyleContains(v.clone()));
        }
        if let Some(v) = filters.vintage {
            predicates.push(Predicate::VintageEquals(v));
        }
        if let Some(v) = filters.min_price {
            predicates.push(Predicate::PriceAtLeast(v));
        }
        if let Some(v) = filters.max_price {
            predicates.push(Predicate::PriceAtMost(v));
        }
        predicates
    }
}

fn like_pattern(value: &str) -> Value {
    Value::Text(format!("%{value}%"))
}

/// Assembles a SELECT over the wines table from predicates, ordering, and
/// a limit.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    predicates: Vec<Predicate>,
    order_by: Option<&'static str>,
    limit: Option<usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(mut self, predicates: Vec<Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Ordering clause from a fixed set used by the ranking policies.
    pub fn order_by(mut self, clause: &'static str) -> Self {
        self.order_by = Some(clause);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render to SQL text and the bound parameter list.
    pub fn build(self) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT {} FROM wines", crate::schema::WINE_COLUMNS);
        let mut params = Vec::new();

        if !self.predicates.is_empty() {
            let fragments: Vec<&'static str> = self
                .predicates
                .iter()
                .map(|p| {
                    let (fragment, value) = p.render();
                    if let Some(value) = value {
                        params.push(value);
                    }
                    fragment
                })
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&fragments.join(" AND "));
        }
        if let Some(order) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        (sql, params)
    }
}
