use std::collections::BTreeMap;

use tracing::warn;

use super::parser::{ListingRow, SeriesRow};
use crate::workflows::valuation::domain::{
    Location, MarketObservation, Property, PropertyId, SaleEvent, StructuralFeatures,
};

/// Fold listing rows into properties, merging repeated listing ids into one
/// sale history. Rows without a usable sale are dropped with a warning
/// rather than failing the import; MLS exports are routinely partial.
pub(crate) fn properties_from_rows(rows: Vec<ListingRow>) -> Vec<Property> {
    let mut by_listing: BTreeMap<String, Property> = BTreeMap::new();

    for row in rows {
        let Some((sale_date, sale_price)) = row.sale() else {
            warn!(listing_id = %row.listing_id, "listing row has no usable sale, skipping");
            continue;
        };
        if row.sqft <= 0.0 {
            warn!(listing_id = %row.listing_id, "listing row has no living area, skipping");
            continue;
        }

        let sale = SaleEvent {
            date: sale_date,
            price: sale_price,
        };

        by_listing
            .entry(row.listing_id.clone())
            .and_modify(|property| property.sale_history.push(sale))
            .or_insert_with(|| Property {
                id: PropertyId(row.listing_id.clone()),
                location: Location {
                    latitude: row.latitude,
                    longitude: row.longitude,
                    admin_area: row.admin_area.clone(),
                },
                features: StructuralFeatures {
                    living_area_sqft: row.sqft,
                    bedrooms: row.bedrooms,
                    bathrooms: row.bathrooms,
                    year_built: row.year_built,
                    lot_acres: row.lot_acres,
                },
                sale_history: vec![sale],
            });
    }

    let mut properties: Vec<Property> = by_listing.into_values().collect();
    for property in &mut properties {
        property.sale_history.sort_by(|a, b| a.date.cmp(&b.date));
    }
    properties
}

pub(crate) fn observations_from_rows(rows: Vec<SeriesRow>) -> Vec<MarketObservation> {
    let mut observations: Vec<MarketObservation> = rows
        .into_iter()
        .filter_map(|row| {
            let Some(date) = row.observed_on() else {
                warn!(month = %row.month, "series row has an unparseable month, skipping");
                return None;
            };
            if row.median_price <= 0.0 {
                warn!(month = %row.month, "series row has no price, skipping");
                return None;
            }
            Some(MarketObservation {
                date,
                normalized_price: row.median_price,
                days_on_market: row.days_on_market,
                inventory_count: row.inventory,
            })
        })
        .collect();

    observations.sort_by(|a, b| a.date.cmp(&b.date));
    observations
}
