//! Range scan statement builder.
//!
//! Turns a [`RangeRequest`] into a parameterized `SELECT` over `(k, v)`.
//! Bounds and the limit are always bound as arguments; the only text spliced
//! into the statement is the quoted table name, which the caller must have
//! validated.

use crate::models::RangeRequest;
use crate::storage::identifier::quote_identifier;
use crate::storage::traits::{Dialect, SqlValue};

/// A built range statement with its bound arguments, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Statement text.
    pub sql: String,
    /// Arguments for `?1`/`$1` onward.
    pub args: Vec<SqlValue>,
}

impl RangeQuery {
    /// Builds the statement for `req` in the given dialect.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlkv::RangeRequest;
    /// use sqlkv::storage::{Dialect, RangeQuery, SqlValue};
    ///
    /// let req = RangeRequest::new("t").min("b", true).max("d", false);
    /// let query = RangeQuery::build(&req, Dialect::Sqlite);
    /// assert_eq!(
    ///     query.sql,
    ///     "SELECT k, v FROM \"t\" WHERE k >= ?1 AND k < ?2 ORDER BY k ASC"
    /// );
    /// assert_eq!(query.args, vec![SqlValue::from("b"), SqlValue::from("d")]);
    /// ```
    #[must_use]
    pub fn build(req: &RangeRequest, dialect: Dialect) -> Self {
        let mut conditions = Vec::with_capacity(2);
        let mut args = Vec::with_capacity(3);

        if let Some(min) = req.min_bound() {
            let op = if req.min_include { ">=" } else { ">" };
            args.push(SqlValue::from(min));
            conditions.push(format!("k {op} {}", dialect.placeholder(args.len())));
        }

        if let Some(max) = req.max_bound() {
            let op = if req.max_include { "<=" } else { "<" };
            args.push(SqlValue::from(max));
            conditions.push(format!("k {op} {}", dialect.placeholder(args.len())));
        }

        let mut sql = format!("SELECT k, v FROM {}", quote_identifier(&req.table));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(if req.is_desc {
            " ORDER BY k DESC"
        } else {
            " ORDER BY k ASC"
        });

        if req.limit > 0 {
            args.push(SqlValue::Integer(i64::from(req.limit)));
            sql.push_str(" LIMIT ");
            sql.push_str(&dialect.placeholder(args.len()));
        }

        Self { sql, args }
    }
}
