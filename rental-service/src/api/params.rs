use rental_client::db::{ReadQuery, SortDirection};
use serde::Deserialize;
use time::Date;

/// Query string accepted by every list endpoint. Filters the table does not
/// have are rejected by the column whitelist with a 400.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub search: Option<String>,
    pub unit_id: Option<i64>,
    pub utility_id: Option<i64>,
    pub status: Option<String>,
    pub unit_type: Option<String>,
    pub utility_type: Option<String>,
}

impl ListParams {
    pub fn into_read_query(self, default_page_size: u32) -> ReadQuery {
        let mut query = ReadQuery::new()
            .page(self.page.unwrap_or(1))
            .page_size(self.page_size.unwrap_or(default_page_size));

        if let Some(column) = self.sort {
            query = query.sort_by(column, self.direction.unwrap_or_default());
        }
        if let Some(term) = self.search {
            query = query.search(term);
        }
        if let Some(id) = self.unit_id {
            query = query.filter("unit_id", id);
        }
        if let Some(id) = self.utility_id {
            query = query.filter("utility_id", id);
        }
        if let Some(status) = self.status {
            query = query.filter("status", status);
        }
        if let Some(unit_type) = self.unit_type {
            query = query.filter("unit_type", unit_type);
        }
        if let Some(utility_type) = self.utility_type {
            query = query.filter("utility_type", utility_type);
        }
        query
    }
}

/// `/dashboard` and `/units/:id/spending` query string.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    /// Preset name such as `last_3_months`; `custom` needs `start` and `end`.
    pub range: Option<String>,
    pub bucket: Option<String>,
    pub start: Option<Date>,
    pub end: Option<Date>,
    /// Reference date, defaults to the current UTC date.
    pub today: Option<Date>,
}
