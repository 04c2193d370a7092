//! Table access over `/rest/v1`

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{BackendError, BackendResult};
use super::http::{HttpBackend, Replay};
use super::query::{Order, TableQuery};
use super::types::Lookup;
use super::DataStore;
use crate::models::{
    Event, EventChanges, NewEvent, NewProduct, NewSale, Product, Sale, SaleWithProduct,
    UserFilters,
};

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_REPRESENTATION: &str = "resolution=merge-duplicates,return=representation";

/// Columns fetched for the monthly top-products query
const SALES_WITH_PRODUCT: &str = "product_id, quantity, total_amount,
    products ( id, name, description, price, image_url, platform, platform_id )";

#[derive(Debug, Serialize)]
struct FiltersRow<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    filters: &'a UserFilters,
}

/// Plain inserts must not be repeated; everything else converges
fn write_replay(method: &Method, prefer: &str) -> Replay {
    if *method == Method::POST && prefer != UPSERT_REPRESENTATION {
        Replay::Once
    } else {
        Replay::Idempotent
    }
}

impl HttpBackend {
    async fn select_rows<T: DeserializeOwned>(&self, query: &TableQuery) -> BackendResult<Vec<T>> {
        let token = self.bearer_token().await;
        let request = self.request(Method::GET, &self.rest_url(query), &token);
        let response = self.send(request, Replay::Idempotent).await?;
        Self::decode(response).await
    }

    /// Write and return the affected rows
    async fn write_rows<B, T>(
        &self,
        method: Method,
        query: &TableQuery,
        body: Option<&B>,
        prefer: &str,
    ) -> BackendResult<Vec<T>>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let replay = write_replay(&method, prefer);
        let token = self.bearer_token().await;
        let mut request = self
            .request(method, &self.rest_url(query), &token)
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(request, replay).await?;
        Self::decode(response).await
    }

    async fn write_one<B, T>(
        &self,
        method: Method,
        query: &TableQuery,
        body: Option<&B>,
        prefer: &str,
        what: &str,
    ) -> BackendResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.write_rows(method, query, body, prefer)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::RowNotFound(what.to_string()))
    }
}

#[async_trait]
impl DataStore for HttpBackend {
    async fn get_user_filters(&self, user_id: &str) -> Lookup<UserFilters> {
        tracing::debug!(user_id = %user_id, "Fetching user filters");
        let query = TableQuery::from("user_filters")
            .select("*")
            .eq("user_id", user_id);
        let result = self
            .select_rows::<UserFilters>(&query)
            .await
            .map(|rows| rows.into_iter().next());
        Lookup::from_result(result)
    }

    async fn upsert_user_filters(
        &self,
        user_id: &str,
        filters: &UserFilters,
    ) -> BackendResult<UserFilters> {
        tracing::debug!(user_id = %user_id, "Saving user filters");
        let query = TableQuery::from("user_filters").on_conflict("user_id");
        let row = FiltersRow { user_id, filters };
        self.write_one(
            Method::POST,
            &query,
            Some(&row),
            UPSERT_REPRESENTATION,
            "user_filters",
        )
        .await
    }

    async fn list_events(&self) -> BackendResult<Vec<Event>> {
        let query = TableQuery::from("events")
            .select("*")
            .order("date", Order::Asc);
        self.select_rows(&query).await
    }

    async fn list_events_on(&self, date: NaiveDate) -> BackendResult<Vec<Event>> {
        let query = TableQuery::from("events")
            .select("*")
            .eq("date", date)
            .order("time", Order::Asc);
        self.select_rows(&query).await
    }

    async fn create_event(&self, event: &NewEvent) -> BackendResult<Event> {
        let query = TableQuery::from("events").select("*");
        self.write_one(Method::POST, &query, Some(event), RETURN_REPRESENTATION, "events")
            .await
    }

    async fn update_event(&self, id: &str, changes: &EventChanges) -> BackendResult<Event> {
        let query = TableQuery::from("events").eq("id", id).select("*");
        self.write_one(Method::PATCH, &query, Some(changes), RETURN_REPRESENTATION, id)
            .await
    }

    async fn delete_event(&self, id: &str) -> BackendResult<()> {
        let query = TableQuery::from("events").eq("id", id);
        let _deleted: Event = self
            .write_one::<(), _>(Method::DELETE, &query, None, RETURN_REPRESENTATION, id)
            .await?;
        Ok(())
    }

    async fn create_product(&self, product: &NewProduct) -> BackendResult<Product> {
        let query = TableQuery::from("products").select("*");
        self.write_one(Method::POST, &query, Some(product), RETURN_REPRESENTATION, "products")
            .await
    }

    async fn list_products(&self) -> BackendResult<Vec<Product>> {
        let query = TableQuery::from("products")
            .select("*")
            .order("created_at", Order::Desc);
        self.select_rows(&query).await
    }

    async fn create_sale(&self, sale: &NewSale) -> BackendResult<Sale> {
        let query = TableQuery::from("sales").select("*");
        self.write_one(Method::POST, &query, Some(sale), RETURN_REPRESENTATION, "sales")
            .await
    }

    async fn list_sales(&self) -> BackendResult<Vec<Sale>> {
        let query = TableQuery::from("sales")
            .select("*")
            .order("sale_date", Order::Desc);
        self.select_rows(&query).await
    }

    async fn sales_since(&self, since: NaiveDate) -> BackendResult<Vec<SaleWithProduct>> {
        let query = TableQuery::from("sales")
            .select(SALES_WITH_PRODUCT)
            .gte("sale_date", since)
            .order("total_amount", Order::Desc);
        self.select_rows(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_plain_inserts_are_sent_once() {
        assert_eq!(write_replay(&Method::POST, RETURN_REPRESENTATION), Replay::Once);
        assert_eq!(
            write_replay(&Method::POST, UPSERT_REPRESENTATION),
            Replay::Idempotent
        );
        assert_eq!(
            write_replay(&Method::PATCH, RETURN_REPRESENTATION),
            Replay::Idempotent
        );
        assert_eq!(
            write_replay(&Method::DELETE, RETURN_REPRESENTATION),
            Replay::Idempotent
        );
    }
}
