//! REST table query builder
//!
//! Builds the query string understood by the hosted REST layer:
//! `select=<columns>&<column>=<op>.<value>&order=<column>.<dir>`.

use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => write!(f, "asc"),
            Order::Desc => write!(f, "desc"),
        }
    }
}

/// A query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    table: String,
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    on_conflict: Option<String>,
}

impl TableQuery {
    /// Start a query on `table`
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            on_conflict: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns (and embedded relations) to return
    pub fn select(mut self, columns: &str) -> Self {
        // Whitespace inside embedded selects is not accepted by the server
        let compact: String = columns.split_whitespace().collect();
        self.select = Some(compact);
        self
    }

    /// `column = value`
    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, "eq", value)
    }

    /// `column >= value`
    pub fn gte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, "gte", value)
    }

    fn filter(mut self, column: &str, op: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        self.filters.push((
            column.to_string(),
            format!("{}.{}", op, urlencoding::encode(&value)),
        ));
        self
    }

    pub fn order(mut self, column: &str, direction: Order) -> Self {
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    /// Conflict target for upserts
    pub fn on_conflict(mut self, column: &str) -> Self {
        self.on_conflict = Some(column.to_string());
        self
    }

    /// Render the query string (without the leading `?`)
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();

        if let Some(select) = &self.select {
            parts.push(format!("select={}", select));
        }
        for (column, expr) in &self.filters {
            parts.push(format!("{}={}", column, expr));
        }
        if !self.order.is_empty() {
            parts.push(format!("order={}", self.order.join(",")));
        }
        if let Some(column) = &self.on_conflict {
            parts.push(format!("on_conflict={}", column));
        }

        parts.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lookup() {
        let query = TableQuery::from("user_filters").select("*").eq("user_id", "u-1");
        assert_eq!(query.table(), "user_filters");
        assert_eq!(query.to_query_string(), "select=*&user_id=eq.u-1");
    }

    #[test]
    fn test_embedded_select_is_compacted() {
        let query = TableQuery::from("sales")
            .select(
                "product_id, quantity, total_amount,
                 products ( id, name )",
            )
            .gte("sale_date", "2024-05-01")
            .order("total_amount", Order::Desc);

        assert_eq!(
            query.to_query_string(),
            "select=product_id,quantity,total_amount,products(id,name)\
             &sale_date=gte.2024-05-01&order=total_amount.desc"
        );
    }

    #[test]
    fn test_values_are_encoded() {
        let query = TableQuery::from("events").eq("title", "a&b c");
        assert_eq!(query.to_query_string(), "title=eq.a%26b%20c");
    }

    #[test]
    fn test_multiple_orders_and_conflict() {
        let query = TableQuery::from("events")
            .order("date", Order::Asc)
            .order("time", Order::Asc)
            .on_conflict("id");
        assert_eq!(query.to_query_string(), "order=date.asc,time.asc&on_conflict=id");
    }
}
