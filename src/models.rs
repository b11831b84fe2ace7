use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const CANCELED_STATUS: &str = "canceled";

/// One row of the order dataset, coerced to typed fields at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub purchase_timestamp: NaiveDateTime,
    pub estimated_delivery_date: Option<NaiveDateTime>,
    pub delivered_customer_date: Option<NaiveDateTime>,
    pub order_status: String,
    pub payment_type: String,
    pub payment_value: f64,
    pub product_category: Option<String>,
    pub review_score: Option<u8>,
}

impl OrderRecord {
    pub fn purchase_date(&self) -> NaiveDate {
        self.purchase_timestamp.date()
    }

    pub fn is_canceled(&self) -> bool {
        self.order_status == CANCELED_STATUS
    }
}

/// The full order table, sorted ascending by purchase timestamp.
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    orders: Vec<OrderRecord>,
}

impl Dataset {
    pub fn new(mut orders: Vec<OrderRecord>) -> Self {
        orders.sort_by_key(|order| order.purchase_timestamp);
        Self { orders }
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// First and last purchase date observed, or `None` for an empty table.
    pub fn bounds(&self) -> Option<DateRange> {
        let first = self.orders.first()?;
        let last = self.orders.last()?;
        Some(DateRange::new(first.purchase_date(), last.purchase_date()))
    }

    /// Rows whose purchase date falls inside `range`, both ends inclusive.
    pub fn filter(&self, range: DateRange) -> &[OrderRecord] {
        if range.end < range.start {
            return &[];
        }
        let lo = self
            .orders
            .partition_point(|order| order.purchase_date() < range.start);
        let hi = self
            .orders
            .partition_point(|order| order.purchase_date() <= range.end);
        &self.orders[lo..hi]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Clamps both ends into `bounds` when the two ranges overlap.
    ///
    /// A disjoint or inverted range is returned unchanged so it still selects
    /// nothing instead of collapsing onto the first or last observed day.
    pub fn clamp_to(self, bounds: DateRange) -> Self {
        if !self.overlaps(&bounds) {
            return self;
        }
        Self {
            start: self.start.clamp(bounds.start, bounds.end),
            end: self.end.clamp(bounds.start, bounds.end),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RangeResponse {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub month_end: NaiveDate,
    pub order_count: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCount {
    pub review_score: u8,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTypeCount {
    pub payment_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRow {
    pub review_score: u8,
    pub frequency: u64,
    pub monetary: f64,
    pub recency: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_orders: u64,
    pub average_rating: Option<f64>,
    pub total_revenue: f64,
    pub total_revenue_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmSummary {
    pub avg_recency: Option<f64>,
    pub avg_frequency: Option<f64>,
    pub avg_monetary: Option<f64>,
    pub avg_monetary_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub bounds: Option<DateRange>,
    pub range: Option<DateRange>,
    pub summary: SummaryMetrics,
    pub monthly_orders: Vec<MonthlyPoint>,
    pub top_categories: Vec<CategoryCount>,
    pub ratings: Vec<RatingCount>,
    pub payment_types: Vec<PaymentTypeCount>,
    pub canceled_categories: Vec<CategoryCount>,
    pub rfm: Vec<RfmRow>,
    pub rfm_summary: RfmSummary,
}
