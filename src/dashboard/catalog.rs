//! Products, sales and the top-sellers ranking

use chrono::NaiveDate;

use super::{Dashboard, DashboardResult};
use crate::analytics::{month_start, top_products, TOP_PRODUCTS_LIMIT};
use crate::forms::{ProductForm, SaleForm};
use crate::models::{Product, Sale, TopProduct};

impl Dashboard {
    /// Products, newest first
    pub async fn products(&self) -> DashboardResult<Vec<Product>> {
        self.require_user()?;
        self.call("list_products", self.store.list_products()).await
    }

    pub async fn create_product(&self, form: &ProductForm) -> DashboardResult<Product> {
        let user = self.require_user()?;
        let product = form.to_new_product(&user.id)?;

        let created = self
            .call("create_product", self.store.create_product(&product))
            .await?;
        tracing::info!(product_id = %created.id, platform = %created.platform, "Product created");
        Ok(created)
    }

    /// Record a sale of one of `products`
    pub async fn record_sale(&self, form: &SaleForm, products: &[Product]) -> DashboardResult<Sale> {
        let user = self.require_user()?;
        let sale = form.to_new_sale(products, &user.id)?;

        let created = self.call("create_sale", self.store.create_sale(&sale)).await?;
        tracing::info!(
            sale_id = %created.id,
            product_id = %created.product_id,
            quantity = created.quantity,
            "Sale recorded"
        );
        Ok(created)
    }

    /// Sales, most recent first
    pub async fn sales(&self) -> DashboardResult<Vec<Sale>> {
        self.require_user()?;
        self.call("list_sales", self.store.list_sales()).await
    }

    /// Best sellers since the first day of the current month
    pub async fn top_products_this_month(&self) -> DashboardResult<Vec<TopProduct>> {
        self.top_products_in_month(Self::today()).await
    }

    /// Best sellers of the month containing `day`, from its first day on
    pub async fn top_products_in_month(&self, day: NaiveDate) -> DashboardResult<Vec<TopProduct>> {
        self.require_user()?;
        let since = month_start(day);
        let sales = self.call("sales_since", self.store.sales_since(since)).await?;

        let ranking = top_products(&sales, TOP_PRODUCTS_LIMIT);
        tracing::debug!(%since, rows = sales.len(), ranked = ranking.len(), "Top products computed");
        Ok(ranking)
    }
}
