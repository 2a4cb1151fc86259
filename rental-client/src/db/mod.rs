pub mod bill_queries;
pub mod dashboard_queries;
pub mod installed_utility_queries;
pub mod schema;
pub mod table;
pub mod tables;

pub use schema::{apply_schema, connect};
pub use table::{Filter, Insertable, Page, ReadQuery, Sort, SortDirection, SqlValue, Table, TableGateway};
