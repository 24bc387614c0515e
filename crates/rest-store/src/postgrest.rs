//! Translation of the shared query model into PostgREST query strings.

use serde_json::Value;

use store_core::{Cond, Filter, Query};

/// Render a JSON value as a PostgREST operand.
fn operand(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn cond_pair(cond: &Cond) -> (String, String) {
    match cond {
        Cond::Eq { column, value } => (column.clone(), format!("eq.{}", operand(value))),
        Cond::NotNull { column } => (column.clone(), "not.is.null".to_string()),
        Cond::IsNull { column } => (column.clone(), "is.null".to_string()),
    }
}

/// Render a condition in `or=(...)` element syntax.
fn cond_element(cond: &Cond) -> String {
    match cond {
        Cond::Eq { column, value } => format!("{}.eq.{}", column, operand(value)),
        Cond::NotNull { column } => format!("{}.not.is.null", column),
        Cond::IsNull { column } => format!("{}.is.null", column),
    }
}

/// Filter conditions as query-string parameters.
pub(crate) fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filter.all.iter().map(cond_pair).collect();
    if !filter.any.is_empty() {
        let elements: Vec<String> = filter.any.iter().map(cond_element).collect();
        params.push(("or".to_string(), format!("({})", elements.join(","))));
    }
    params
}

/// Full query as query-string parameters, including the `select` clause
/// with embedded resources for joins.
pub(crate) fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut select = String::from("*");
    for join in &query.joins {
        let inner = if join.optional { "" } else { "!inner" };
        select.push_str(&format!(
            ",{}:{}!{}{}(*)",
            join.alias, join.table, join.local_column, inner
        ));
    }

    let mut params = vec![("select".to_string(), select)];
    params.extend(filter_params(&query.filter));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_core::Join;

    #[test]
    fn test_select_with_joins() {
        let query = Query::table("user_postcards")
            .join(Join::required("postcards", "postcard", "postcard_id"))
            .join(Join::optional("profiles", "profile", "friend_id"))
            .eq("user_id", "u1")
            .order_desc("collected_date")
            .limit(3);

        let params = query_params(&query);
        assert_eq!(
            params[0],
            (
                "select".to_string(),
                "*,postcard:postcards!postcard_id!inner(*),profile:profiles!friend_id(*)"
                    .to_string()
            )
        );
        assert!(params.contains(&("user_id".to_string(), "eq.u1".to_string())));
        assert!(params.contains(&("order".to_string(), "collected_date.desc".to_string())));
        assert!(params.contains(&("limit".to_string(), "3".to_string())));
    }

    #[test]
    fn test_disjunction_and_null_filters() {
        let filter = Filter::new().not_null("sent_to").any_of(vec![
            Cond::eq("sender_id", "me"),
            Cond::eq("receiver_id", "me"),
        ]);
        let params = filter_params(&filter);
        assert!(params.contains(&("sent_to".to_string(), "not.is.null".to_string())));
        assert!(params.contains(&(
            "or".to_string(),
            "(sender_id.eq.me,receiver_id.eq.me)".to_string()
        )));
    }
}
