//! Sale form
//!
//! Picking a product or changing the quantity recomputes the total as
//! `price × quantity`. Typing a total by hand replaces it until the next
//! product or quantity change.

use chrono::NaiveDate;

use super::{positive_amount, ValidationError, ValidationResult};
use crate::models::{NewSale, Product};

/// Record form for a sale
#[derive(Debug, Clone, PartialEq)]
pub struct SaleForm {
    pub product_id: String,
    pub quantity: String,
    pub total_amount: String,
    pub sale_date: NaiveDate,
}

impl SaleForm {
    /// Empty form dated `today`, quantity 1
    pub fn new(today: NaiveDate) -> Self {
        Self {
            product_id: String::new(),
            quantity: "1".to_string(),
            total_amount: String::new(),
            sale_date: today,
        }
    }

    pub fn select_product(&mut self, product_id: impl Into<String>, products: &[Product]) {
        self.product_id = product_id.into();
        self.recalculate(products);
    }

    pub fn set_quantity(&mut self, quantity: impl Into<String>, products: &[Product]) {
        self.quantity = quantity.into();
        self.recalculate(products);
    }

    /// Manual override of the computed total
    pub fn set_total_amount(&mut self, amount: impl Into<String>) {
        self.total_amount = amount.into();
    }

    pub fn set_sale_date(&mut self, date: NaiveDate) {
        self.sale_date = date;
    }

    fn recalculate(&mut self, products: &[Product]) {
        let quantity: u32 = self.quantity.trim().parse().unwrap_or(0);
        if quantity == 0 {
            return;
        }
        if let Some(product) = products.iter().find(|p| p.id == self.product_id) {
            let total = (product.price * f64::from(quantity) * 100.0).round() / 100.0;
            self.total_amount = total.to_string();
        }
    }

    /// Insert payload; the product must be one of `products`
    pub fn to_new_sale(&self, products: &[Product], user_id: &str) -> ValidationResult<NewSale> {
        let product_id = self.product_id.trim();
        if product_id.is_empty() {
            return Err(ValidationError::Required("Product"));
        }
        let quantity = parse_quantity(&self.quantity)?;
        let total_amount = positive_amount(&self.total_amount, "Total amount")?;

        let product = products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| ValidationError::UnknownProduct(product_id.to_string()))?;

        Ok(NewSale {
            product_id: product.id.clone(),
            quantity,
            total_amount,
            sale_date: self.sale_date,
            platform: product.platform,
            user_id: user_id.to_string(),
        })
    }
}

fn parse_quantity(value: &str) -> ValidationResult<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required("Quantity"));
    }
    let quantity: i64 = trimmed.parse().map_err(|_| ValidationError::InvalidNumber {
        field: "Quantity",
        value: trimmed.to_string(),
    })?;
    if quantity <= 0 {
        return Err(ValidationError::NotPositive("Quantity"));
    }
    u32::try_from(quantity).map_err(|_| ValidationError::InvalidNumber {
        field: "Quantity",
        value: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn products() -> Vec<Product> {
        vec![
            Product {
                id: "p-1".to_string(),
                name: "Mate".to_string(),
                description: None,
                price: 10.5,
                image_url: None,
                platform: Platform::TiendaNube,
                platform_id: "TN-1".to_string(),
                user_id: Some("u-1".to_string()),
                created_at: None,
            },
            Product {
                id: "p-2".to_string(),
                name: "Bombilla".to_string(),
                description: None,
                price: 0.1,
                image_url: None,
                platform: Platform::Shopify,
                platform_id: "S-2".to_string(),
                user_id: Some("u-1".to_string()),
                created_at: None,
            },
        ]
    }

    #[test]
    fn test_defaults() {
        let form = SaleForm::new(today());
        assert_eq!(form.quantity, "1");
        assert_eq!(form.sale_date, today());
        assert!(form.total_amount.is_empty());
    }

    #[test]
    fn test_recomputes_total_on_product_and_quantity() {
        let products = products();
        let mut form = SaleForm::new(today());

        form.select_product("p-1", &products);
        assert_eq!(form.total_amount, "10.5");

        form.set_quantity("3", &products);
        assert_eq!(form.total_amount, "31.5");

        form.select_product("p-2", &products);
        assert_eq!(form.total_amount, "0.3");
    }

    #[test]
    fn test_manual_total_kept_until_next_change() {
        let products = products();
        let mut form = SaleForm::new(today());
        form.select_product("p-1", &products);

        form.set_total_amount("9.99");
        let sale = form.to_new_sale(&products, "u-1").unwrap();
        assert_eq!(sale.total_amount, 9.99);

        form.set_quantity("2", &products);
        assert_eq!(form.total_amount, "21");
    }

    #[test]
    fn test_invalid_quantity_leaves_total() {
        let products = products();
        let mut form = SaleForm::new(today());
        form.select_product("p-1", &products);
        form.set_quantity("abc", &products);
        assert_eq!(form.total_amount, "10.5");
    }

    #[test]
    fn test_sale_copies_platform() {
        let products = products();
        let mut form = SaleForm::new(today());
        form.select_product("p-1", &products);
        form.set_quantity("2", &products);

        let sale = form.to_new_sale(&products, "u-1").unwrap();
        assert_eq!(sale.product_id, "p-1");
        assert_eq!(sale.quantity, 2);
        assert_eq!(sale.total_amount, 21.0);
        assert_eq!(sale.platform, Platform::TiendaNube);
        assert_eq!(sale.sale_date, today());
    }

    #[test]
    fn test_rejections() {
        let products = products();
        let form = SaleForm::new(today());
        assert_eq!(
            form.to_new_sale(&products, "u-1"),
            Err(ValidationError::Required("Product"))
        );

        let mut form = SaleForm::new(today());
        form.select_product("p-1", &products);
        form.quantity = "0".to_string();
        assert_eq!(
            form.to_new_sale(&products, "u-1"),
            Err(ValidationError::NotPositive("Quantity"))
        );

        form.quantity = "1.5".to_string();
        assert!(matches!(
            form.to_new_sale(&products, "u-1"),
            Err(ValidationError::InvalidNumber { field: "Quantity", .. })
        ));

        form.quantity = "1".to_string();
        form.set_total_amount("0");
        assert_eq!(
            form.to_new_sale(&products, "u-1"),
            Err(ValidationError::NotPositive("Total amount"))
        );

        let mut form = SaleForm::new(today());
        form.product_id = "p-9".to_string();
        form.set_total_amount("5");
        assert_eq!(
            form.to_new_sale(&products, "u-1"),
            Err(ValidationError::UnknownProduct("p-9".to_string()))
        );
    }
}
