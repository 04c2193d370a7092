//! Aggregation Engine
//!
//! Turns raw sale rows into the "top sellers" ranking shown on the
//! dashboard. Date filtering happens in the backend query; this module only
//! groups and ranks.

mod top_products;

pub use top_products::{month_start, top_products, TOP_PRODUCTS_LIMIT};
