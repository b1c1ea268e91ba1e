//! Catalog schema and row mapping

use rusqlite::{params, Connection, Row};
use sommelier_core::Wine;

use crate::CatalogError;

/// Column list shared by every SELECT so row mapping stays positional.
pub(crate) const WINE_COLUMNS: &str = "id, slug, name, winery, region, country, grape_variety, \
     vintage, wine_type, style, color, price_retail, price_trade, bottle_size, tasting_notes, \
     food_pairings, critic_scores, drinking_window, image_url, supplier, is_active";

/// Create the wines table if it does not exist.
pub fn ensure_schema(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wines (
            id              INTEGER PRIMARY KEY,
            slug            TEXT,
            name            TEXT NOT NULL,
            winery          TEXT NOT NULL,
            region          TEXT NOT NULL,
            country         TEXT NOT NULL,
            grape_variety   TEXT,
            vintage         INTEGER,
            wine_type       TEXT NOT NULL,
            style           TEXT,
            color           TEXT,
            price_retail    REAL NOT NULL,
            price_trade     REAL,
            bottle_size     TEXT,
            tasting_notes   TEXT,
            food_pairings   TEXT,
            critic_scores   TEXT,
            drinking_window TEXT,
            image_url       TEXT,
            supplier        TEXT,
            is_active       INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_wines_active_price
            ON wines (is_active, price_retail);",
    )?;
    Ok(())
}

/// Map a positional row (in [`WINE_COLUMNS`] order) to a [`Wine`].
pub(crate) fn wine_from_row(row: &Row<'_>) -> rusqlite::Result<Wine> {
    Ok(Wine {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        winery: row.get(3)?,
        region: row.get(4)?,
        country: row.get(5)?,
        grape_variety: row.get(6)?,
        vintage: row.get(7)?,
        wine_type: row.get(8)?,
        style: row.get(9)?,
        color: row.get(10)?,
        price_retail: row.get(11)?,
        price_trade: row.get(12)?,
        bottle_size: row.get(13)?,
        tasting_notes: row.get(14)?,
        food_pairings: row.get(15)?,
        critic_scores: row.get(16)?,
        drinking_window: row.get(17)?,
        image_url: row.get(18)?,
        supplier: row.get(19)?,
        is_active: row.get(20)?,
    })
}

/// Insert or replace a full catalog record.
pub fn insert_wine(conn: &Connection, wine: &Wine) -> Result<(), CatalogError> {
    conn.execute(
        "INSERT OR REPLACE INTO wines (id, slug, name, winery, region, country, grape_variety, \
         vintage, wine_type, style, color, price_retail, price_trade, bottle_size, tasting_notes, \
         food_pairings, critic_scores, drinking_window, image_url, supplier, is_active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
         ?18, ?19, ?20, ?21)",
        params![
            wine.id,
            wine.slug,
            wine.name,
            wine.winery,
            wine.region,
            wine.country,
            wine.grape_variety,
            wine.vintage,
            wine.wine_type,
            wine.style,
            wine.color,
            wine.price_retail,
            wine.price_trade,
            wine.bottle_size,
            wine.tasting_notes,
            wine.food_pairings,
            wine.critic_scores,
            wine.drinking_window,
            wine.image_url,
            wine.supplier,
            wine.is_active,
        ],
    )?;
    Ok(())
}

fn demo_wine(
    id: i64,
    name: &str,
    winery: &str,
    region: &str,
    country: &str,
    grape: &str,
    wine_type: &str,
    price: f64,
) -> Wine {
    Wine {
        id,
        slug: Some(name.to_lowercase().replace(' ', "-")),
        name: name.to_string(),
        winery: winery.to_string(),
        region: region.to_string(),
        country: country.to_string(),
        grape_variety: Some(grape.to_string()),
        vintage: Some(2018),
        wine_type: wine_type.to_string(),
        style: None,
        color: None,
        price_retail: price,
        price_trade: Some(price * 0.8),
        bottle_size: Some("750ml".to_string()),
        tasting_notes: None,
        food_pairings: None,
        critic_scores: None,
        drinking_window: None,
        image_url: None,
        supplier: None,
        is_active: true,
    }
}

/// Seed a small demo catalog for local runs and tests.
pub fn seed_demo_catalog(conn: &Connection) -> Result<(), CatalogError> {
    let wines = [
        demo_wine(1, "Chateau Margaux", "Chateau Margaux", "Bordeaux", "France", "Cabernet Sauvignon", "red", 650.0),
        demo_wine(2, "Lynch Bages", "Chateau Lynch-Bages", "Bordeaux", "France", "Cabernet Sauvignon", "red", 145.0),
        demo_wine(3, "Sancerre Les Monts", "Domaine Vacheron", "Loire", "France", "Sauvignon Blanc", "white", 38.0),
        demo_wine(4, "Barolo Cannubi", "Damilano", "Piedmont", "Italy", "Nebbiolo", "red", 95.0),
        demo_wine(5, "Rioja Reserva", "La Rioja Alta", "Rioja", "Spain", "Tempranillo", "red", 32.0),
        demo_wine(6, "Chablis Premier Cru", "William Fevre", "Burgundy", "France", "Chardonnay", "white", 55.0),
        demo_wine(7, "Prosecco Superiore", "Nino Franco", "Veneto", "Italy", "Glera", "sparkling", 22.0),
        demo_wine(8, "Central Otago Pinot", "Felton Road", "Central Otago", "New Zealand", "Pinot Noir", "red", 62.0),
    ];
    for wine in &wines {
        insert_wine(conn, wine)?;
    }
    Ok(())
}

/// Seed the demo catalog only when the table is empty, so a populated
/// store is never overwritten on restart. Returns whether it seeded.
pub fn seed_demo_catalog_if_empty(conn: &Connection) -> Result<bool, CatalogError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM wines", [], |row| row.get(0))?;
    if count == 0 {
        seed_demo_catalog(conn)?;
        return Ok(true);
    }
    Ok(false)
}
