use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One row of an MLS comparable-sales export. A listing can appear on
/// several rows, one per closed sale.
#[derive(Debug, Deserialize)]
pub(crate) struct ListingRow {
    #[serde(rename = "Listing ID")]
    pub(crate) listing_id: String,
    #[serde(rename = "Admin Area", default)]
    pub(crate) admin_area: String,
    #[serde(rename = "Latitude")]
    pub(crate) latitude: f64,
    #[serde(rename = "Longitude")]
    pub(crate) longitude: f64,
    #[serde(rename = "Sqft")]
    pub(crate) sqft: f64,
    #[serde(rename = "Bedrooms")]
    pub(crate) bedrooms: u8,
    #[serde(rename = "Bathrooms")]
    pub(crate) bathrooms: f32,
    #[serde(rename = "Lot Acres", default)]
    pub(crate) lot_acres: f64,
    #[serde(rename = "Year Built")]
    pub(crate) year_built: i32,
    #[serde(rename = "Sale Date", default, deserialize_with = "empty_string_as_none")]
    pub(crate) sale_date: Option<String>,
    #[serde(rename = "Sale Price", default)]
    pub(crate) sale_price: Option<f64>,
}

impl ListingRow {
    pub(crate) fn sale(&self) -> Option<(NaiveDate, f64)> {
        let date = self.sale_date.as_deref().and_then(parse_date)?;
        let price = self.sale_price.filter(|price| *price > 0.0)?;
        Some((date, price))
    }
}

/// One row of an MLS market-series export feeding the trend module.
#[derive(Debug, Deserialize)]
pub(crate) struct SeriesRow {
    #[serde(rename = "Month")]
    pub(crate) month: String,
    #[serde(rename = "Median Price")]
    pub(crate) median_price: f64,
    #[serde(rename = "Days on Market", default)]
    pub(crate) days_on_market: f64,
    #[serde(rename = "Inventory", default)]
    pub(crate) inventory: u32,
}

impl SeriesRow {
    pub(crate) fn observed_on(&self) -> Option<NaiveDate> {
        parse_date(&self.month)
    }
}

pub(crate) fn parse_listing_rows<R: Read>(reader: R) -> Result<Vec<ListingRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<ListingRow>().collect()
}

pub(crate) fn parse_series_rows<R: Read>(reader: R) -> Result<Vec<SeriesRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<SeriesRow>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// MLS exports mix full dates with month-granular entries.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
        return Some(date);
    }

    None
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_date(value)
}
