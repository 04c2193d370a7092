//! Products, sales, and the derived top-seller ranking

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marketplace a product is listed on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MercadoLibre,
    TiendaNube,
    Shopify,
}

impl Platform {
    /// Get all platforms for iteration
    pub fn all() -> &'static [Platform] {
        &[Platform::MercadoLibre, Platform::TiendaNube, Platform::Shopify]
    }

    /// Human-readable marketplace name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::MercadoLibre => "MercadoLibre",
            Platform::TiendaNube => "Tienda Nube",
            Platform::Shopify => "Shopify",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::MercadoLibre => write!(f, "mercadolibre"),
            Platform::TiendaNube => write!(f, "tiendanube"),
            Platform::Shopify => write!(f, "shopify"),
        }
    }
}

/// Returned when a string names no known platform
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown platform: {0} (expected mercadolibre, tiendanube or shopify)")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mercadolibre" => Ok(Platform::MercadoLibre),
            "tiendanube" => Ok(Platform::TiendaNube),
            "shopify" => Ok(Platform::Shopify),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// A product row
///
/// `user_id` and `created_at` are absent when the product comes from the
/// embedded join in the monthly sales query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    pub platform: Platform,
    pub platform_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `products`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub platform: Platform,
    pub platform_id: String,
    pub user_id: String,
}

/// A sale row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub total_amount: f64,
    pub sale_date: NaiveDate,
    pub platform: Platform,
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `sales`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewSale {
    pub product_id: String,
    pub quantity: u32,
    pub total_amount: f64,
    pub sale_date: NaiveDate,
    /// Copied from the product when the sale is recorded
    pub platform: Platform,
    pub user_id: String,
}

/// A sale joined with its product, as returned by the monthly sales query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleWithProduct {
    pub product_id: String,
    pub quantity: u32,
    pub total_amount: f64,
    /// `None` when the product row no longer exists
    #[serde(rename = "products", default)]
    pub product: Option<Product>,
}

/// A product with its aggregated sales over a time window
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopProduct {
    pub product: Product,
    /// Sum of quantities
    pub total_sales: u64,
    /// Sum of sale amounts
    pub total_revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_and_display() {
        for platform in Platform::all() {
            let parsed: Platform = platform.to_string().parse().unwrap();
            assert_eq!(&parsed, platform);
        }
        assert_eq!("Shopify".parse::<Platform>().unwrap(), Platform::Shopify);
        assert!("amazon".parse::<Platform>().is_err());
        assert_eq!(Platform::TiendaNube.display_name(), "Tienda Nube");
    }

    #[test]
    fn test_joined_sale_deserialize() {
        let row = r#"{
            "product_id": "p-1",
            "quantity": 2,
            "total_amount": 20.5,
            "products": {
                "id": "p-1",
                "name": "Mate",
                "description": null,
                "price": 10.25,
                "image_url": null,
                "platform": "tiendanube",
                "platform_id": "TN-1"
            }
        }"#;

        let sale: SaleWithProduct = serde_json::from_str(row).unwrap();
        let product = sale.product.unwrap();
        assert_eq!(product.platform, Platform::TiendaNube);
        assert!(product.user_id.is_none());
    }

    #[test]
    fn test_joined_sale_missing_product() {
        let row = r#"{"product_id": "p-9", "quantity": 1, "total_amount": 5.0, "products": null}"#;
        let sale: SaleWithProduct = serde_json::from_str(row).unwrap();
        assert!(sale.product.is_none());
    }
}
