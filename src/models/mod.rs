//! Domain types
//!
//! Rows of the hosted tables and the values derived from them:
//! - `User` / `UserFilters`: the signed-in user and their survey answers
//! - `Event`: calendar entries owned by their creator
//! - `Product` / `Sale` / `TopProduct`: the sales dashboard

mod commerce;
mod event;
mod user;

pub use commerce::{
    NewProduct, NewSale, Platform, Product, Sale, SaleWithProduct, TopProduct, UnknownPlatform,
};
pub use event::{Event, EventChanges, NewEvent};
pub use user::{User, UserFilters};
