//! Paginated SELECT construction.
//!
//! Two formulations with identical semantics: the modern OFFSET/FETCH
//! syntax, and a legacy windowed row-numbering fallback for engine versions
//! that reject OFFSET. Both request rows
//! `(page-1)*page_size+1 ..= page*page_size` under the same ordering, so a
//! fallback is invisible to the caller. Strategy selection happens at
//! execution time (see the gateway); this module only builds the SQL.

use crate::error::{GatewayError, Result};

/// Sort direction for the ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Validated pagination, ordering, and filtering input for a read.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,

    /// Rows per page.
    pub page_size: u32,

    /// Ordering column name. Must name an introspected column; the gateway
    /// checks this before the request reaches SQL construction.
    pub order_by: Option<String>,

    /// Sort direction, applied only when `order_by` is set.
    pub direction: OrderDirection,

    /// Raw SQL boolean fragment appended as a WHERE clause. Trust boundary:
    /// the consuming layer is responsible for constraining who may set it.
    pub filter: Option<String>,
}

impl PageRequest {
    /// Build a request from optional caller input, applying defaults
    /// (page 1, the configured default size) and rejecting zero values.
    pub fn new(page: Option<u32>, page_size: Option<u32>, default_page_size: u32) -> Result<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(default_page_size);
        if page == 0 {
            return Err(GatewayError::Validation(
                "page must be a positive 1-based number".into(),
            ));
        }
        if page_size == 0 {
            return Err(GatewayError::Validation(
                "page_size must be at least 1".into(),
            ));
        }
        Ok(PageRequest {
            page,
            page_size,
            ..PageRequest::default()
        })
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        let column = column.into();
        if !column.is_empty() {
            self.order_by = Some(column);
        }
        self.direction = direction;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filter = Some(filter);
        }
        self
    }

    /// First row of the requested window, 1-based.
    fn first_row(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.page_size) + 1
    }

    /// Last row of the requested window, inclusive.
    fn last_row(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }
}

/// A paginated SELECT in both formulations, built from one spec so the
/// ordering and filtering are guaranteed identical.
#[derive(Debug, Clone)]
pub struct PagedSelect {
    /// OFFSET/FETCH formulation.
    pub modern: String,

    /// ROW_NUMBER() range formulation. The numbering column is confined to
    /// the inner derived table so both formulations return the same shape.
    pub legacy: String,
}

/// Build both paginated SELECT formulations.
///
/// `qualified_table` and `columns` are pre-quoted identifiers. A
/// deterministic ORDER BY is always emitted: windowed numbering requires
/// one, so an absent ordering column becomes the neutral `(SELECT NULL)`.
pub fn build_paged_select(
    qualified_table: &str,
    columns: &[String],
    order_clause: &str,
    request: &PageRequest,
) -> PagedSelect {
    let cols = columns.join(", ");
    let where_clause = match &request.filter {
        Some(f) => format!(" WHERE ({})", f),
        None => String::new(),
    };

    let offset = u64::from(request.page - 1) * u64::from(request.page_size);
    let modern = format!(
        "SELECT {cols} FROM {table}{where_clause} ORDER BY {order} \
         OFFSET {offset} ROWS FETCH NEXT {fetch} ROWS ONLY",
        cols = cols,
        table = qualified_table,
        where_clause = where_clause,
        order = order_clause,
        offset = offset,
        fetch = request.page_size,
    );

    let legacy = format!(
        "SELECT {cols} FROM (SELECT {cols}, ROW_NUMBER() OVER (ORDER BY {order}) AS row_num \
         FROM {table}{where_clause}) AS paged \
         WHERE paged.row_num BETWEEN {first} AND {last} ORDER BY paged.row_num",
        cols = cols,
        table = qualified_table,
        where_clause = where_clause,
        order = order_clause,
        first = request.first_row(),
        last = request.last_row(),
    );

    PagedSelect { modern, legacy }
}

/// Render the ORDER BY body for a request over a pre-quoted column.
pub fn order_clause(quoted_column: Option<&str>, direction: OrderDirection) -> String {
    match quoted_column {
        Some(col) => format!("{} {}", col, direction.as_sql()),
        None => "(SELECT NULL)".to_string(),
    }
}
