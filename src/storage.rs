use crate::errors::LoadError;
use crate::models::{Dataset, OrderRecord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::{env, path::Path, path::PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub const REQUIRED_COLUMNS: [&str; 9] = [
    "order_id",
    "order_purchase_timestamp",
    "order_estimated_delivery_date",
    "order_delivered_customer_date",
    "order_status",
    "payment_type",
    "payment_value",
    "product_category_name_english",
    "review_score",
];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Deserialize)]
struct OrderRow {
    order_id: Option<String>,
    order_purchase_timestamp: Option<String>,
    order_estimated_delivery_date: Option<String>,
    order_delivered_customer_date: Option<String>,
    order_status: Option<String>,
    payment_type: Option<String>,
    payment_value: Option<String>,
    product_category_name_english: Option<String>,
    review_score: Option<String>,
}

pub fn resolve_data_path() -> PathBuf {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from("data/main_data.csv")
}

pub async fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let bytes = fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = parse_orders(&bytes)?;
    info!(rows = dataset.len(), path = %path.display(), "loaded order dataset");
    Ok(dataset)
}

/// Parses CSV bytes into a dataset, checking the header once up front.
pub fn parse_orders(bytes: &[u8]) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(LoadError::MissingColumn(column));
        }
    }

    let mut orders = Vec::new();
    for (index, row) in reader.deserialize::<OrderRow>().enumerate() {
        orders.push(to_record(index + 1, row?)?);
    }
    debug!(rows = orders.len(), "parsed order rows");

    Ok(Dataset::new(orders))
}

fn to_record(row: usize, raw: OrderRow) -> Result<OrderRecord, LoadError> {
    let invalid = |column: &'static str, value: &str| LoadError::InvalidValue {
        row,
        column,
        value: value.to_string(),
    };

    let order_id = non_empty(raw.order_id).ok_or_else(|| invalid("order_id", ""))?;

    let purchase_raw = non_empty(raw.order_purchase_timestamp)
        .ok_or_else(|| invalid("order_purchase_timestamp", ""))?;
    let purchase_timestamp = parse_timestamp(&purchase_raw)
        .ok_or_else(|| invalid("order_purchase_timestamp", &purchase_raw))?;

    let estimated_delivery_date = optional_timestamp(
        raw.order_estimated_delivery_date,
        "order_estimated_delivery_date",
        row,
    )?;
    let delivered_customer_date = optional_timestamp(
        raw.order_delivered_customer_date,
        "order_delivered_customer_date",
        row,
    )?;

    let payment_value = match non_empty(raw.payment_value) {
        None => 0.0,
        Some(value) => match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => parsed,
            _ => return Err(invalid("payment_value", &value)),
        },
    };

    let review_score = match non_empty(raw.review_score) {
        None => None,
        Some(value) => {
            Some(parse_score(&value).ok_or_else(|| invalid("review_score", &value))?)
        }
    };

    Ok(OrderRecord {
        order_id,
        purchase_timestamp,
        estimated_delivery_date,
        delivered_customer_date,
        order_status: non_empty(raw.order_status).unwrap_or_default(),
        payment_type: non_empty(raw.payment_type).unwrap_or_default(),
        payment_value,
        product_category: non_empty(raw.product_category_name_english),
        review_score,
    })
}

fn optional_timestamp(
    value: Option<String>,
    column: &'static str,
    row: usize,
) -> Result<Option<NaiveDateTime>, LoadError> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    parse_timestamp(&value)
        .map(Some)
        .ok_or(LoadError::InvalidValue { row, column, value })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Accepts full timestamps with either separator, or a bare date at midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

// Scores may arrive as "4" or "4.0" when the exporting tool widened the column.
fn parse_score(value: &str) -> Option<u8> {
    if let Ok(score) = value.parse::<u8>() {
        return Some(score);
    }
    let float = value.parse::<f64>().ok()?;
    if float.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&float) {
        Some(float as u8)
    } else {
        None
    }
}
