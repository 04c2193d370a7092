//! Top products ranking

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::models::{SaleWithProduct, TopProduct};

/// Number of products shown in the dashboard ranking
pub const TOP_PRODUCTS_LIMIT: usize = 3;

/// Rank products by units sold
///
/// Rows are grouped by `product_id` in first-encounter order, then sorted
/// descending by total quantity. The sort is stable, so ties keep their
/// encounter order. Rows whose joined product is missing are skipped.
pub fn top_products(sales: &[SaleWithProduct], limit: usize) -> Vec<TopProduct> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut ranking: Vec<TopProduct> = Vec::new();
    let mut skipped = 0usize;

    for sale in sales {
        let Some(product) = &sale.product else {
            skipped += 1;
            continue;
        };

        match positions.get(sale.product_id.as_str()) {
            Some(&index) => {
                let entry = &mut ranking[index];
                entry.total_sales += u64::from(sale.quantity);
                entry.total_revenue += sale.total_amount;
            }
            None => {
                positions.insert(sale.product_id.as_str(), ranking.len());
                ranking.push(TopProduct {
                    product: product.clone(),
                    total_sales: u64::from(sale.quantity),
                    total_revenue: sale.total_amount,
                });
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped sales without a product");
    }

    ranking.sort_by(|a, b| b.total_sales.cmp(&a.total_sales));
    ranking.truncate(limit);
    ranking
}

/// First day of the month containing `today`
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Product};

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            price: 10.0,
            image_url: None,
            platform: Platform::MercadoLibre,
            platform_id: format!("ML-{}", id),
            user_id: None,
            created_at: None,
        }
    }

    fn sale(product_id: &str, quantity: u32, amount: f64) -> SaleWithProduct {
        SaleWithProduct {
            product_id: product_id.to_string(),
            quantity,
            total_amount: amount,
            product: Some(product(product_id, &product_id.to_uppercase())),
        }
    }

    #[test]
    fn test_groups_and_ranks_by_quantity() {
        let sales = vec![sale("a", 2, 20.0), sale("b", 1, 50.0), sale("a", 3, 30.0)];

        let top = top_products(&sales, TOP_PRODUCTS_LIMIT);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product.id, "a");
        assert_eq!(top[0].total_sales, 5);
        assert_eq!(top[0].total_revenue, 50.0);
        assert_eq!(top[1].product.id, "b");
        assert_eq!(top[1].total_sales, 1);
        assert_eq!(top[1].total_revenue, 50.0);
    }

    #[test]
    fn test_ranks_by_units_not_revenue() {
        let sales = vec![sale("cheap", 10, 10.0), sale("pricey", 1, 1000.0)];
        let top = top_products(&sales, TOP_PRODUCTS_LIMIT);
        assert_eq!(top[0].product.id, "cheap");
    }

    #[test]
    fn test_empty_input() {
        assert!(top_products(&[], TOP_PRODUCTS_LIMIT).is_empty());
    }

    #[test]
    fn test_truncates_to_limit() {
        let sales: Vec<_> = (1..=5)
            .map(|i| sale(&format!("p{}", i), i, i as f64))
            .collect();

        let top = top_products(&sales, TOP_PRODUCTS_LIMIT);

        assert_eq!(top.len(), 3);
        let ids: Vec<_> = top.iter().map(|t| t.product.id.as_str()).collect();
        assert_eq!(ids, vec!["p5", "p4", "p3"]);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let sales = vec![sale("x", 2, 1.0), sale("y", 2, 1.0), sale("z", 2, 1.0)];
        let ids: Vec<_> = top_products(&sales, TOP_PRODUCTS_LIMIT)
            .into_iter()
            .map(|t| t.product.id)
            .collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_skips_missing_product() {
        let mut orphan = sale("gone", 100, 100.0);
        orphan.product = None;
        let sales = vec![orphan, sale("a", 1, 10.0)];

        let top = top_products(&sales, TOP_PRODUCTS_LIMIT);

        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product.id, "a");
    }

    #[test]
    fn test_totals_independent_of_row_order() {
        let forward = vec![
            sale("a", 1, 10.0),
            sale("b", 4, 40.0),
            sale("a", 2, 20.0),
            sale("c", 3, 30.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let totals = |rows: &[SaleWithProduct]| {
            let mut t: Vec<_> = top_products(rows, usize::MAX)
                .into_iter()
                .map(|t| (t.product.id, t.total_sales))
                .collect();
            t.sort();
            t
        };

        assert_eq!(totals(&forward), totals(&reversed));
        assert_eq!(
            totals(&forward),
            vec![("a".to_string(), 3), ("b".to_string(), 4), ("c".to_string(), 3)]
        );
    }

    #[test]
    fn test_month_start() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(month_start(today), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(month_start(first), first);
    }
}
