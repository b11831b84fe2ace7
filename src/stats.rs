use crate::currency::format_usd;
use crate::models::{
    CategoryCount, DashboardResponse, Dataset, DateRange, MonthlyPoint, OrderRecord,
    PaymentTypeCount, RatingCount, RfmRow, RfmSummary, SummaryMetrics,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

pub const TOP_CATEGORY_LIMIT: usize = 7;

/// Runs every aggregation over the rows of `dataset` inside `range`.
///
/// `None` means there is nothing to select (an empty dataset), and produces
/// the same empty payload as a range that matches no rows.
pub fn build_dashboard(dataset: &Dataset, range: Option<DateRange>) -> DashboardResponse {
    let orders = range.map(|range| dataset.filter(range)).unwrap_or(&[]);

    let monthly_orders = monthly_orders(orders);
    let summary = summary_metrics(&monthly_orders, orders);
    let rfm = rfm_by_rating(orders);
    let rfm_summary = rfm_summary(&rfm);

    DashboardResponse {
        bounds: dataset.bounds(),
        range,
        summary,
        top_categories: top_categories(orders),
        ratings: ratings(orders),
        payment_types: payment_types(orders),
        canceled_categories: canceled_categories(orders),
        monthly_orders,
        rfm,
        rfm_summary,
    }
}

/// Fills missing ends from `bounds` and clamps supplied ones into it.
pub fn resolve_range(
    bounds: Option<DateRange>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<DateRange> {
    let bounds = bounds?;
    let requested = DateRange::new(start.unwrap_or(bounds.start), end.unwrap_or(bounds.end));
    Some(requested.clamp_to(bounds))
}

/// Distinct orders and revenue per calendar month, oldest first.
///
/// Months between the first and last observed month are emitted with zero
/// counts so the series has no holes.
pub fn monthly_orders(orders: &[OrderRecord]) -> Vec<MonthlyPoint> {
    let mut buckets: BTreeMap<(i32, u32), (BTreeSet<&str>, f64)> = BTreeMap::new();
    for order in orders {
        let date = order.purchase_date();
        let bucket = buckets.entry((date.year(), date.month())).or_default();
        bucket.0.insert(order.order_id.as_str());
        bucket.1 += order.payment_value;
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut month = first;
    while month <= last {
        let (order_count, revenue) = buckets
            .get(&month)
            .map(|(ids, revenue)| (ids.len() as u64, *revenue))
            .unwrap_or((0, 0.0));
        if let Some(month_end) = month_end(month.0, month.1) {
            points.push(MonthlyPoint {
                month: format!("{}-{:02}", month.0, month.1),
                month_end,
                order_count,
                revenue,
            });
        }
        month = next_month(month);
    }
    points
}

/// The most frequent product categories, capped at seven.
pub fn top_categories(orders: &[OrderRecord]) -> Vec<CategoryCount> {
    let mut counts = category_counts(orders.iter());
    counts.truncate(TOP_CATEGORY_LIMIT);
    counts
}

/// Row count per review score, ascending by score.
pub fn ratings(orders: &[OrderRecord]) -> Vec<RatingCount> {
    let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
    for score in orders.iter().filter_map(|order| order.review_score) {
        *counts.entry(score).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(review_score, count)| RatingCount {
            review_score,
            count,
        })
        .collect()
}

pub fn payment_types(orders: &[OrderRecord]) -> Vec<PaymentTypeCount> {
    ranked_counts(orders.iter().map(|order| order.payment_type.as_str()))
        .into_iter()
        .map(|(payment_type, count)| PaymentTypeCount {
            payment_type,
            count,
        })
        .collect()
}

pub fn canceled_categories(orders: &[OrderRecord]) -> Vec<CategoryCount> {
    category_counts(orders.iter().filter(|order| order.is_canceled()))
}

/// Recency, frequency and monetary value per review score.
///
/// Recency is measured in whole days against the latest purchase date of the
/// whole selection, so the most recently active score always reads 0.
pub fn rfm_by_rating(orders: &[OrderRecord]) -> Vec<RfmRow> {
    let Some(latest) = orders.iter().map(OrderRecord::purchase_date).max() else {
        return Vec::new();
    };

    let mut groups: BTreeMap<u8, (NaiveDateTime, BTreeSet<&str>, f64)> = BTreeMap::new();
    for order in orders {
        let Some(score) = order.review_score else {
            continue;
        };
        let group = groups
            .entry(score)
            .or_insert_with(|| (order.purchase_timestamp, BTreeSet::new(), 0.0));
        group.0 = group.0.max(order.purchase_timestamp);
        group.1.insert(order.order_id.as_str());
        group.2 += order.payment_value;
    }

    groups
        .into_iter()
        .map(|(review_score, (last_purchase, ids, monetary))| RfmRow {
            review_score,
            frequency: ids.len() as u64,
            monetary,
            recency: (latest - last_purchase.date()).num_days(),
        })
        .collect()
}

pub fn summary_metrics(monthly: &[MonthlyPoint], orders: &[OrderRecord]) -> SummaryMetrics {
    let total_orders = monthly.iter().map(|point| point.order_count).sum();
    let total_revenue: f64 = monthly.iter().map(|point| point.revenue).sum();

    let scores: Vec<f64> = orders
        .iter()
        .filter_map(|order| order.review_score)
        .map(f64::from)
        .collect();

    SummaryMetrics {
        total_orders,
        average_rating: mean(&scores).map(|value| round_to(value, 1)),
        total_revenue,
        total_revenue_display: format_usd(total_revenue),
    }
}

pub fn rfm_summary(rfm: &[RfmRow]) -> RfmSummary {
    let recency: Vec<f64> = rfm.iter().map(|row| row.recency as f64).collect();
    let frequency: Vec<f64> = rfm.iter().map(|row| row.frequency as f64).collect();
    let monetary: Vec<f64> = rfm.iter().map(|row| row.monetary).collect();
    let avg_monetary = mean(&monetary).map(|value| round_to(value, 2));

    RfmSummary {
        avg_recency: mean(&recency).map(|value| round_to(value, 1)),
        avg_frequency: mean(&frequency).map(|value| round_to(value, 2)),
        avg_monetary,
        avg_monetary_display: avg_monetary.map(format_usd),
    }
}

fn category_counts<'a>(orders: impl Iterator<Item = &'a OrderRecord>) -> Vec<CategoryCount> {
    ranked_counts(orders.filter_map(|order| order.product_category.as_deref()))
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

// Descending by count; ties keep the key order of the map, i.e. lexicographic.
fn ranked_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next) = next_month((year, month));
    NaiveDate::from_ymd_opt(next_year, next, 1).map(|first| first - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::parse_orders;

    const HEADER: &str = "order_id,order_purchase_timestamp,order_estimated_delivery_date,order_delivered_customer_date,order_status,payment_type,payment_value,product_category_name_english,review_score\n";

    // Columns: id, purchased, estimated, delivered, status, payment type, value, category, score.
    const SAMPLE: [&str; 7] = [
        "o1,2017-01-05 10:00:00,,,delivered,credit_card,100,toys,5",
        "o1,2017-01-05 10:00:00,,,delivered,credit_card,20,toys,5",
        "o2,2017-01-20 08:30:00,,,canceled,boleto,50,electronics,1",
        "o3,2017-03-02 12:00:00,,,canceled,voucher,10,electronics,3",
        "o4,2017-03-15 09:00:00,,,canceled,credit_card,70,toys,5",
        "o5,2017-03-31 23:59:59,,,shipped,debit_card,30,garden,5",
        "o6,2017-04-01 00:00:00,,,delivered,credit_card,40,,",
    ];

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset(rows: &[&str]) -> Dataset {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        parse_orders(text.as_bytes()).expect("fixture parses")
    }

    fn sample() -> Dataset {
        dataset(&SAMPLE)
    }

    #[test]
    fn monthly_orders_counts_distinct_ids_and_fills_gaps() {
        let data = sample();
        let points = monthly_orders(data.orders());
        let months: Vec<&str> = points.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, ["2017-01", "2017-02", "2017-03", "2017-04"]);

        assert_eq!(points[0].order_count, 2);
        assert_eq!(points[0].revenue, 170.0);
        assert_eq!(points[0].month_end, date(2017, 1, 31));
        assert_eq!(points[1].order_count, 0);
        assert_eq!(points[1].revenue, 0.0);
        assert_eq!(points[1].month_end, date(2017, 2, 28));
        assert_eq!(points[2].order_count, 3);
        assert_eq!(points[3].order_count, 1);
    }

    #[test]
    fn monthly_orders_crosses_year_boundary() {
        let data = dataset(&[
            "a,2016-12-31 10:00:00,,,delivered,boleto,1,,",
            "b,2017-01-01 10:00:00,,,delivered,boleto,2,,",
        ]);
        let points = monthly_orders(data.orders());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].month_end, date(2016, 12, 31));
        assert_eq!(points[1].month, "2017-01");
    }

    #[test]
    fn ratings_are_ascending_and_cover_present_scores() {
        let data = dataset(&[
            "a,2017-05-01 00:00:00,,,delivered,boleto,1,,5",
            "b,2017-05-01 00:00:00,,,delivered,boleto,1,,1",
            "c,2017-05-01 00:00:00,,,delivered,boleto,1,,5",
            "d,2017-05-01 00:00:00,,,delivered,boleto,1,,3",
            "e,2017-05-01 00:00:00,,,delivered,boleto,1,,5",
        ]);

        let counts: Vec<(u8, u64)> = ratings(data.orders())
            .into_iter()
            .map(|row| (row.review_score, row.count))
            .collect();
        assert_eq!(counts, [(1, 1), (3, 1), (5, 3)]);
    }

    #[test]
    fn canceled_categories_rank_by_count() {
        let data = dataset(&[
            "a,2017-05-01 00:00:00,,,canceled,boleto,1,toys,",
            "b,2017-05-02 00:00:00,,,canceled,boleto,1,electronics,",
            "c,2017-05-03 00:00:00,,,delivered,boleto,1,toys,",
            "d,2017-05-04 00:00:00,,,canceled,boleto,1,electronics,",
        ]);
        let counts: Vec<(String, u64)> = canceled_categories(data.orders())
            .into_iter()
            .map(|row| (row.category, row.count))
            .collect();
        assert_eq!(counts, [("electronics".to_string(), 2), ("toys".to_string(), 1)]);
    }

    #[test]
    fn canceled_categories_empty_without_cancellations() {
        let data = dataset(&["a,2017-05-01 00:00:00,,,delivered,boleto,1,toys,"]);
        assert!(canceled_categories(data.orders()).is_empty());
    }

    #[test]
    fn top_categories_caps_at_seven_with_lexicographic_ties() {
        let mut rows: Vec<String> = ["j", "i", "h", "g", "f", "e", "d", "c", "b", "a"]
            .iter()
            .enumerate()
            .map(|(i, name)| format!("o{i},2017-05-01 00:00:00,,,delivered,boleto,1,{name},"))
            .collect();
        rows.push("x,2017-05-01 00:00:00,,,delivered,boleto,1,j,".to_string());
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

        let top = top_categories(dataset(&rows).orders());
        assert_eq!(top.len(), TOP_CATEGORY_LIMIT);
        let names: Vec<&str> = top.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, ["j", "a", "b", "c", "d", "e", "f"]);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn top_categories_skips_missing_names() {
        let data = sample();
        let top = top_categories(data.orders());
        assert_eq!(top.len(), 3);
        assert_eq!((top[0].category.as_str(), top[0].count), ("toys", 3));
        assert_eq!((top[1].category.as_str(), top[1].count), ("electronics", 2));
    }

    #[test]
    fn payment_types_descending_with_lexicographic_ties() {
        let data = sample();
        let types = payment_types(data.orders());
        let ranked: Vec<(&str, u64)> = types
            .iter()
            .map(|row| (row.payment_type.as_str(), row.count))
            .collect();
        assert_eq!(
            ranked,
            [
                ("credit_card", 4),
                ("boleto", 1),
                ("debit_card", 1),
                ("voucher", 1),
            ]
        );
    }

    #[test]
    fn rfm_recency_is_relative_to_latest_purchase() {
        let data = sample();
        let rfm = rfm_by_rating(data.orders());
        let scores: Vec<u8> = rfm.iter().map(|row| row.review_score).collect();
        assert_eq!(scores, [1, 3, 5]);

        let five = &rfm[2];
        assert_eq!(five.frequency, 3);
        assert_eq!(five.monetary, 220.0);
        // latest purchase overall is 2017-04-01 (unscored row), score 5 last seen 2017-03-31
        assert_eq!(five.recency, 1);

        let one = &rfm[0];
        assert_eq!(one.recency, (date(2017, 4, 1) - date(2017, 1, 20)).num_days());
        assert!(rfm.iter().all(|row| row.recency >= 0));
    }

    #[test]
    fn rfm_most_recent_group_reads_zero() {
        let data = dataset(&[
            "a,2017-05-01 08:00:00,,,delivered,boleto,5,,2",
            "b,2017-05-09 08:00:00,,,delivered,boleto,5,,4",
        ]);
        let rfm = rfm_by_rating(data.orders());
        assert_eq!(rfm[1].recency, 0);
        assert_eq!(rfm[0].recency, 8);
    }

    #[test]
    fn summary_uses_monthly_totals_and_rounds_rating() {
        let data = sample();
        let dashboard = build_dashboard(&data, data.bounds());
        assert_eq!(dashboard.summary.total_orders, 6);
        assert_eq!(dashboard.summary.total_revenue, 320.0);
        assert_eq!(dashboard.summary.total_revenue_display, "$320.00");
        // (5 + 5 + 1 + 3 + 5 + 5) / 6
        assert_eq!(dashboard.summary.average_rating, Some(4.0));
    }

    #[test]
    fn rfm_summary_averages_rows() {
        let rows = vec![
            RfmRow {
                review_score: 1,
                frequency: 1,
                monetary: 10.0,
                recency: 3,
            },
            RfmRow {
                review_score: 2,
                frequency: 2,
                monetary: 15.5,
                recency: 0,
            },
        ];
        let summary = rfm_summary(&rows);
        assert_eq!(summary.avg_recency, Some(1.5));
        assert_eq!(summary.avg_frequency, Some(1.5));
        assert_eq!(summary.avg_monetary, Some(12.75));
        assert_eq!(summary.avg_monetary_display.as_deref(), Some("$12.75"));
    }

    #[test]
    fn empty_selection_yields_empty_tables() {
        let data = sample();
        let february = DateRange::new(date(2017, 2, 1), date(2017, 2, 28));
        let dashboard = build_dashboard(&data, Some(february));
        assert!(dashboard.monthly_orders.is_empty());
        assert!(dashboard.top_categories.is_empty());
        assert!(dashboard.ratings.is_empty());
        assert!(dashboard.payment_types.is_empty());
        assert!(dashboard.canceled_categories.is_empty());
        assert!(dashboard.rfm.is_empty());
        assert_eq!(dashboard.summary.total_orders, 0);
        assert_eq!(dashboard.summary.average_rating, None);
        assert_eq!(dashboard.rfm_summary.avg_recency, None);
        assert_eq!(dashboard.rfm_summary.avg_monetary_display, None);
    }

    #[test]
    fn empty_dataset_has_no_range() {
        let data = Dataset::default();
        assert_eq!(resolve_range(data.bounds(), None, None), None);
        let dashboard = build_dashboard(&data, None);
        assert!(dashboard.bounds.is_none());
        assert_eq!(dashboard.summary.total_orders, 0);
    }

    #[test]
    fn inverted_range_selects_nothing() {
        let data = sample();
        let range = resolve_range(
            data.bounds(),
            Some(date(2017, 3, 20)),
            Some(date(2017, 1, 10)),
        );
        let dashboard = build_dashboard(&data, range);
        assert_eq!(dashboard.summary.total_orders, 0);
        assert!(dashboard.rfm.is_empty());
    }

    #[test]
    fn resolve_range_defaults_and_clamps() {
        let bounds = Some(DateRange::new(date(2017, 1, 5), date(2017, 4, 1)));
        assert_eq!(resolve_range(bounds, None, None), bounds);
        assert_eq!(
            resolve_range(bounds, Some(date(2010, 1, 1)), Some(date(2017, 3, 1))),
            Some(DateRange::new(date(2017, 1, 5), date(2017, 3, 1)))
        );
        assert_eq!(
            resolve_range(bounds, Some(date(2017, 2, 1)), Some(date(2030, 1, 1))),
            Some(DateRange::new(date(2017, 2, 1), date(2017, 4, 1)))
        );
    }

    #[test]
    fn range_outside_data_is_not_pulled_onto_edge_days() {
        let data = sample();
        let later = (Some(date(2030, 1, 1)), Some(date(2030, 12, 31)));
        let earlier = (Some(date(2010, 1, 1)), Some(date(2010, 12, 31)));

        for (start, end) in [later, earlier] {
            let range = resolve_range(data.bounds(), start, end);
            assert_eq!(range, Some(DateRange::new(start.unwrap(), end.unwrap())));

            let dashboard = build_dashboard(&data, range);
            assert_eq!(dashboard.summary.total_orders, 0);
            assert!(dashboard.monthly_orders.is_empty());
            assert!(dashboard.top_categories.is_empty());
        }
    }

    #[test]
    fn filter_includes_whole_end_day() {
        let data = sample();
        let march = data.filter(DateRange::new(date(2017, 3, 1), date(2017, 3, 31)));
        assert_eq!(march.len(), 3);
        assert_eq!(march.last().map(|o| o.order_id.as_str()), Some("o5"));
    }

    #[test]
    fn narrowing_range_never_grows_totals() {
        let data = sample();
        let wide = build_dashboard(&data, data.bounds());
        let inner = DateRange::new(date(2017, 1, 10), date(2017, 3, 20));
        let narrow = build_dashboard(&data, Some(inner));
        assert!(narrow.summary.total_orders <= wide.summary.total_orders);
        assert!(narrow.summary.total_revenue <= wide.summary.total_revenue);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let data = sample();
        let first = serde_json::to_vec(&build_dashboard(&data, data.bounds())).unwrap();
        let second = serde_json::to_vec(&build_dashboard(&data, data.bounds())).unwrap();
        assert_eq!(first, second);
    }
}
