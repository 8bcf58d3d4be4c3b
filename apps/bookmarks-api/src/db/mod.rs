pub mod kv;
pub mod pool;
pub mod schema;

/// Point a database URL at the `_test` sibling database.
///
/// `postgres://u@h/bookmarks?sslmode=disable` becomes
/// `postgres://u@h/bookmarks_test?sslmode=disable`. URLs already ending in
/// `_test`, or without a database name, are returned unchanged.
pub fn test_database_url(database_url: &str) -> String {
    let (base, query) = match database_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (database_url, None),
    };

    let Some((prefix, db_name)) = base.rsplit_once('/') else {
        return database_url.to_string();
    };
    if db_name.is_empty() || db_name.ends_with("_test") {
        return database_url.to_string();
    }

    let mut updated = format!("{prefix}/{db_name}_test");
    if let Some(query) = query {
        updated.push('?');
        updated.push_str(query);
    }
    updated
}
