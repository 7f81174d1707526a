use sea_orm::{
    Condition,
    sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr},
};

// Basic safety limits
const MAX_SEARCH_QUERY_LENGTH: usize = 1_000;

/// Escape LIKE wildcards so user input matches literally
/// Escapes: % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn truncate(query: &str) -> &str {
    if query.len() <= MAX_SEARCH_QUERY_LENGTH {
        return query;
    }
    let mut end = MAX_SEARCH_QUERY_LENGTH;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    &query[..end]
}

/// Case-insensitive substring match on `table.column`:
/// `UPPER(table.column) LIKE '%VALUE%' ESCAPE '\'`
#[must_use]
pub fn build_like_condition(table: &str, column: &str, value: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like_wildcards(value).to_uppercase());
    Expr::expr(Func::upper(Expr::col((Alias::new(table), Alias::new(column)))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

/// Build the `q` search condition: any of `fields` containing the query.
///
/// Returns `None` for blank queries or when no search fields are configured.
#[must_use]
pub fn build_search_condition(table: &str, fields: &[String], query: &str) -> Option<Condition> {
    let trimmed = truncate(query).trim();
    if trimmed.is_empty() || fields.is_empty() {
        return None;
    }

    let condition = fields.iter().fold(Condition::any(), |condition, field| {
        condition.add(build_like_condition(table, field, trimmed))
    });
    Some(condition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    fn render(condition: Condition) -> String {
        Query::select()
            .column(Alias::new("id"))
            .from(Alias::new("posts"))
            .cond_where(condition)
            .to_string(SqliteQueryBuilder)
    }

    #[test]
    fn test_wildcard_escaping() {
        assert_eq!(escape_like_wildcards("test"), "test");
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("test_value"), "test\\_value");
        assert_eq!(escape_like_wildcards("\\%"), "\\\\\\%");
    }

    #[test]
    fn test_search_across_fields() {
        let fields = vec!["title".to_string(), "body".to_string()];
        let sql = render(build_search_condition("posts", &fields, "rust").unwrap());

        assert!(sql.contains(r#"UPPER("posts"."title") LIKE '%RUST%'"#), "{sql}");
        assert!(sql.contains(r#"UPPER("posts"."body") LIKE '%RUST%'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
    }

    #[test]
    fn test_quotes_are_parameterized() {
        let fields = vec!["title".to_string()];
        let condition = build_search_condition("posts", &fields, "' OR '1'='1").unwrap();
        let (sql, values) = Query::select()
            .column(Alias::new("id"))
            .from(Alias::new("posts"))
            .cond_where(condition)
            .build(SqliteQueryBuilder);
        assert!(!sql.contains("'1'='1"), "{sql}");
        assert_eq!(values.0.len(), 1);
    }

    #[test]
    fn test_blank_query_or_no_fields() {
        assert!(build_search_condition("posts", &["title".to_string()], "   ").is_none());
        assert!(build_search_condition("posts", &[], "rust").is_none());
    }

    #[test]
    fn test_long_query_truncated_on_char_boundary() {
        let query = "é".repeat(MAX_SEARCH_QUERY_LENGTH);
        let truncated = truncate(&query);
        assert!(truncated.len() <= MAX_SEARCH_QUERY_LENGTH);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
