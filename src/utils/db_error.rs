/// Returns true when `e` is a unique violation on the named constraint.
///
/// Used by the persistence layer to tell a long-URL dedup race apart from a
/// short-code collision, so each can be handled as its own recoverable branch.
pub fn is_unique_violation_on(e: &sqlx::Error, constraint: &str) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some(c) if c == constraint)
}
