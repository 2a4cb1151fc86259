//! Generic read/create/update/delete access to a single table.
//!
//! Identifiers (table names, column names) only ever come from the static
//! column lists declared by [`Table`] and [`Insertable`]; caller-supplied sort
//! and filter columns are matched against those lists before being pushed into
//! SQL. Every value is a bound parameter.

use std::{marker::PhantomData, str::FromStr};

use sqlx::{
    sqlite::{Sqlite, SqlitePool, SqliteRow},
    Executor, FromRow, QueryBuilder,
};
use time::Date;

use crate::{domain::Money, error::DbError};

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 500;

/// A value bound into generated SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Date(Date),
}

impl SqlValue {
    fn push_into(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            SqlValue::Int(v) => qb.push_bind(v),
            SqlValue::Text(v) => qb.push_bind(v),
            SqlValue::Bool(v) => qb.push_bind(v),
            SqlValue::Date(v) => qb.push_bind(v),
        };
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<Date> for SqlValue {
    fn from(v: Date) -> Self {
        SqlValue::Date(v)
    }
}

impl From<Money> for SqlValue {
    fn from(v: Money) -> Self {
        SqlValue::Int(v.cents())
    }
}

/// A table addressable by an integer primary key.
pub trait Table: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    const NAME: &'static str;
    const ID_COLUMN: &'static str = "id";
    /// Every selectable column, in row order. Sort and filter columns must be
    /// drawn from this list.
    const COLUMNS: &'static [&'static str];
    /// Columns matched by free-text search.
    const SEARCH_COLUMNS: &'static [&'static str];
    const DEFAULT_SORT: &'static str = "id";

    type New: Insertable;

    fn column(name: &str) -> Result<&'static str, DbError> {
        Self::COLUMNS
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| DbError::UnknownColumn {
                table: Self::NAME,
                column: name.to_string(),
            })
    }
}

/// Payload written by `INSERT` and `UPDATE`.
pub trait Insertable: Send + Sync {
    const COLUMNS: &'static [&'static str];

    /// Values in the same order as [`Insertable::COLUMNS`].
    fn values(&self) -> Vec<SqlValue>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DbError::InvalidPage(format!("unknown sort direction '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: SqlValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<Sort>,
    pub search: Option<String>,
    pub filters: Vec<Filter>,
}

impl Default for ReadQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            search: None,
            filters: Vec::new(),
        }
    }
}

impl ReadQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    fn validate(&self) -> Result<(), DbError> {
        if self.page == 0 {
            return Err(DbError::InvalidPage("page numbers start at 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(DbError::InvalidPage(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// One page of a table read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.total_items == 0 {
            0
        } else {
            (self.total_items + i64::from(self.page_size) - 1) / i64::from(self.page_size)
        }
    }
}

/// Escape LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn push_where<T: Table>(qb: &mut QueryBuilder<'static, Sqlite>, query: &ReadQuery) -> Result<(), DbError> {
    let mut first = true;
    let mut conjunction = |qb: &mut QueryBuilder<'static, Sqlite>| {
        qb.push(if first { " WHERE " } else { " AND " });
        first = false;
    };

    for filter in &query.filters {
        let column = T::column(&filter.column)?;
        conjunction(qb);
        qb.push(column).push(" = ");
        filter.value.clone().push_into(qb);
    }

    if let Some(term) = query.search_term() {
        if !T::SEARCH_COLUMNS.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            conjunction(qb);
            qb.push("(");
            for (i, column) in T::SEARCH_COLUMNS.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column)
                    .push(" LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
    }

    Ok(())
}

fn select_prefix<T: Table>() -> String {
    format!("SELECT {} FROM {}", T::COLUMNS.join(", "), T::NAME)
}

/// `SELECT` for one page of `query`.
pub fn build_select<T: Table>(query: &ReadQuery) -> Result<QueryBuilder<'static, Sqlite>, DbError> {
    query.validate()?;

    let mut qb = QueryBuilder::new(select_prefix::<T>());
    push_where::<T>(&mut qb, query)?;

    let (column, direction) = match &query.sort {
        Some(sort) => (T::column(&sort.column)?, sort.direction),
        None => (T::DEFAULT_SORT, SortDirection::Asc),
    };
    qb.push(" ORDER BY ").push(column).push(" ").push(direction.as_sql());
    // Ties are broken by id so pages never overlap.
    if column != T::ID_COLUMN {
        qb.push(", ").push(T::ID_COLUMN).push(" ASC");
    }

    qb.push(" LIMIT ")
        .push_bind(i64::from(query.page_size))
        .push(" OFFSET ")
        .push_bind(query.offset());

    Ok(qb)
}

/// `SELECT COUNT(*)` under the same filters and search as [`build_select`].
pub fn build_count<T: Table>(query: &ReadQuery) -> Result<QueryBuilder<'static, Sqlite>, DbError> {
    query.validate()?;

    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", T::NAME));
    push_where::<T>(&mut qb, query)?;
    Ok(qb)
}

/// Typed handle over one table.
pub struct TableGateway<T> {
    pool: SqlitePool,
    _table: PhantomData<fn() -> T>,
}

impl<T> Clone for TableGateway<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _table: PhantomData,
        }
    }
}

impl<T: Table> TableGateway<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _table: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn read(&self, query: &ReadQuery) -> Result<Page<T>, DbError> {
        let mut count = build_count::<T>(query)?;
        let total_items: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = build_select::<T>(query)?;
        let items = select.build_query_as::<T>().fetch_all(&self.pool).await?;

        Ok(Page {
            items,
            page: query.page,
            page_size: query.page_size,
            total_items,
        })
    }

    pub async fn find(&self, id: i64) -> Result<Option<T>, DbError> {
        Self::find_with(&self.pool, id).await
    }

    pub async fn get(&self, id: i64) -> Result<T, DbError> {
        self.find(id).await?.ok_or(DbError::NotFound { table: T::NAME, id })
    }

    pub async fn create(&self, new: &T::New) -> Result<T, DbError> {
        Self::insert_with(&self.pool, new).await
    }

    pub async fn update(&self, id: i64, new: &T::New) -> Result<T, DbError> {
        Self::update_with(&self.pool, id, new).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        Self::delete_with(&self.pool, id).await
    }

    pub async fn find_with<'c, E>(executor: E, id: i64) -> Result<Option<T>, DbError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::new(select_prefix::<T>());
        qb.push(" WHERE ").push(T::ID_COLUMN).push(" = ").push_bind(id);

        Ok(qb.build_query_as::<T>().fetch_optional(executor).await?)
    }

    pub async fn insert_with<'c, E>(executor: E, new: &T::New) -> Result<T, DbError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let columns = <T::New as Insertable>::COLUMNS;
        let mut qb = QueryBuilder::new(format!("INSERT INTO {} ({}) VALUES (", T::NAME, columns.join(", ")));
        for (i, value) in new.values().into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            value.push_into(&mut qb);
        }
        qb.push(") RETURNING ").push(T::COLUMNS.join(", "));

        Ok(qb.build_query_as::<T>().fetch_one(executor).await?)
    }

    pub async fn update_with<'c, E>(executor: E, id: i64, new: &T::New) -> Result<T, DbError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let columns = <T::New as Insertable>::COLUMNS;
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", T::NAME));
        for (i, (column, value)) in columns.iter().zip(new.values()).enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(*column).push(" = ");
            value.push_into(&mut qb);
        }
        qb.push(" WHERE ")
            .push(T::ID_COLUMN)
            .push(" = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(T::COLUMNS.join(", "));

        qb.build_query_as::<T>()
            .fetch_optional(executor)
            .await?
            .ok_or(DbError::NotFound { table: T::NAME, id })
    }

    pub async fn delete_with<'c, E>(executor: E, id: i64) -> Result<(), DbError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let sql = format!("DELETE FROM {} WHERE {} = ?", T::NAME, T::ID_COLUMN);
        let result = sqlx::query(&sql).bind(id).execute(executor).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound { table: T::NAME, id });
        }
        Ok(())
    }
}
