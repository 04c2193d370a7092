//! Product form

use super::{positive_amount, required, ValidationResult};
use crate::models::{NewProduct, Platform};

/// Create form for a product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub platform: String,
    pub platform_id: String,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            price: String::new(),
            image_url: String::new(),
            platform: Platform::MercadoLibre.to_string(),
            platform_id: String::new(),
        }
    }
}

impl ProductForm {
    /// Insert payload owned by `user_id`
    pub fn to_new_product(&self, user_id: &str) -> ValidationResult<NewProduct> {
        let name = required(&self.name, "Product name")?;
        let price = positive_amount(&self.price, "Price")?;
        let platform_id = required(&self.platform_id, "Platform ID")?;
        let platform: Platform = self.platform.parse()?;

        let image_url = self.image_url.trim();
        Ok(NewProduct {
            name,
            description: self.description.trim().to_string(),
            price,
            image_url: (!image_url.is_empty()).then(|| image_url.to_string()),
            platform,
            platform_id,
            user_id: user_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ValidationError;
    use crate::models::UnknownPlatform;

    fn form() -> ProductForm {
        ProductForm {
            name: " Yerba 1kg ".to_string(),
            price: "4500".to_string(),
            platform_id: "MLA-123".to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_valid_product() {
        let product = form().to_new_product("u-1").unwrap();
        assert_eq!(product.name, "Yerba 1kg");
        assert_eq!(product.price, 4500.0);
        assert_eq!(product.platform, Platform::MercadoLibre);
        assert_eq!(product.image_url, None);
        assert_eq!(product.user_id, "u-1");
    }

    #[test]
    fn test_rejects_missing_name() {
        let form = ProductForm {
            name: "  ".to_string(),
            ..form()
        };
        assert_eq!(
            form.to_new_product("u-1"),
            Err(ValidationError::Required("Product name"))
        );
    }

    #[test]
    fn test_rejects_non_positive_price() {
        for price in ["0", "-10"] {
            let form = ProductForm {
                price: price.to_string(),
                ..form()
            };
            assert_eq!(
                form.to_new_product("u-1"),
                Err(ValidationError::NotPositive("Price"))
            );
        }
    }

    #[test]
    fn test_rejects_missing_platform_id() {
        let form = ProductForm {
            platform_id: " ".to_string(),
            ..form()
        };
        assert_eq!(
            form.to_new_product("u-1"),
            Err(ValidationError::Required("Platform ID"))
        );
    }

    #[test]
    fn test_platform_must_be_known() {
        let form = ProductForm {
            platform: "amazon".to_string(),
            ..form()
        };
        assert_eq!(
            form.to_new_product("u-1"),
            Err(ValidationError::UnknownPlatform(UnknownPlatform(
                "amazon".to_string()
            )))
        );

        let form = ProductForm {
            platform: "Shopify".to_string(),
            image_url: "https://img.example.com/a.png".to_string(),
            ..self::form()
        };
        let product = form.to_new_product("u-1").unwrap();
        assert_eq!(product.platform, Platform::Shopify);
        assert!(product.image_url.is_some());
    }
}
