//! Backend-agnostic query model.
//!
//! Queries are built with a small fluent surface and handed to the gateway,
//! which translates them into whatever its backend speaks. Condition
//! evaluation lives here so in-process gateways share one implementation.

use serde_json::Value;

use crate::row::Row;

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// Column equals value.
    Eq {
        /// Column name.
        column: String,
        /// Value to compare against.
        value: Value,
    },
    /// Column is present and non-null.
    NotNull {
        /// Column name.
        column: String,
    },
    /// Column is absent or null.
    IsNull {
        /// Column name.
        column: String,
    },
}

impl Cond {
    /// Equality condition.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether a row satisfies this condition.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Cond::Eq { column, value } => row.get(column) == Some(value),
            Cond::NotNull { column } => {
                matches!(row.get(column), Some(v) if !v.is_null())
            }
            Cond::IsNull { column } => {
                matches!(row.get(column), None | Some(Value::Null))
            }
        }
    }
}

/// A conjunction of conditions plus at most one disjunction group.
///
/// The disjunction group exists for the single "this side or that side"
/// query shape the data layer needs (exchange rows where the user is
/// sender or receiver).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Conditions that must all hold.
    pub all: Vec<Cond>,
    /// Conditions of which at least one must hold (empty means no group).
    pub any: Vec<Cond>,
}

impl Filter {
    /// An empty filter matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition to the conjunction.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.all.push(Cond::eq(column, value));
        self
    }

    /// Add a non-null condition to the conjunction.
    pub fn not_null(mut self, column: impl Into<String>) -> Self {
        self.all.push(Cond::NotNull {
            column: column.into(),
        });
        self
    }

    /// Set the disjunction group.
    pub fn any_of(mut self, conds: Vec<Cond>) -> Self {
        self.any = conds;
        self
    }

    /// Whether a row satisfies the whole filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.all.iter().all(|c| c.matches(row))
            && (self.any.is_empty() || self.any.iter().any(|c| c.matches(row)))
    }
}

/// An embedded-resource join.
///
/// The joined row appears in results as a nested object under `alias`.
/// A required join drops parent rows without a match (inner-join
/// semantics); an optional join embeds null instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Foreign collection to embed.
    pub table: String,
    /// Key the embedded object appears under in the result row.
    pub alias: String,
    /// Column on the queried collection holding the foreign key.
    pub local_column: String,
    /// Column on the foreign collection being referenced.
    pub foreign_column: String,
    /// Whether a missing counterpart embeds null instead of dropping the row.
    pub optional: bool,
}

impl Join {
    /// A required join against the foreign collection's `id` column.
    pub fn required(
        table: impl Into<String>,
        alias: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            local_column: local_column.into(),
            foreign_column: "id".to_string(),
            optional: false,
        }
    }

    /// An optional join against the foreign collection's `id` column.
    pub fn optional(
        table: impl Into<String>,
        alias: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Self {
        Self {
            optional: true,
            ..Self::required(table, alias, local_column)
        }
    }
}

/// Result ordering on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Column to order by.
    pub column: String,
    /// Ascending when true, descending when false.
    pub ascending: bool,
}

/// A query against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to query.
    pub table: String,
    /// Embedded-resource joins.
    pub joins: Vec<Join>,
    /// Row filter.
    pub filter: Filter,
    /// Optional ordering.
    pub order: Option<Order>,
    /// Optional row cap.
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query against a collection.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            joins: Vec::new(),
            filter: Filter::new(),
            order: None,
            limit: None,
        }
    }

    /// Add a join.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add an equality condition.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    /// Add a non-null condition.
    pub fn not_null(mut self, column: impl Into<String>) -> Self {
        self.filter = self.filter.not_null(column);
        self
    }

    /// Set the disjunction group.
    pub fn any_of(mut self, conds: Vec<Cond>) -> Self {
        self.filter = self.filter.any_of(conds);
        self
    }

    /// Order descending by a column.
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    /// Order ascending by a column.
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: true,
        });
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_matches() {
        let row = Row::new().set("user_id", "u1");
        assert!(Cond::eq("user_id", "u1").matches(&row));
        assert!(!Cond::eq("user_id", "u2").matches(&row));
    }

    #[test]
    fn test_null_conditions() {
        let row = Row::new().set_null("sent_to").set("title", "x");
        assert!(Cond::IsNull { column: "sent_to".into() }.matches(&row));
        assert!(Cond::IsNull { column: "absent".into() }.matches(&row));
        assert!(Cond::NotNull { column: "title".into() }.matches(&row));
        assert!(!Cond::NotNull { column: "sent_to".into() }.matches(&row));
    }

    #[test]
    fn test_filter_disjunction() {
        let filter = Filter::new().eq("status", "sent").any_of(vec![
            Cond::eq("sender_id", "me"),
            Cond::eq("receiver_id", "me"),
        ]);

        let hit = Row::new().set("status", "sent").set("receiver_id", "me");
        let miss = Row::new().set("status", "sent").set("receiver_id", "them");
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }
}
