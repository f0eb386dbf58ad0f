//! Sequential, prefixed identifiers (`B001`, `U014`, `R120`, ...)
//!
//! The next ID is derived from the highest one stored at call time, inside
//! the caller's unit of work, so it follows out-of-band deletions and is
//! reserved until that unit of work ends.

use crate::{error::AppResult, models::EntityKind, repository::UnitOfWork};

/// Minimum number of digits after the prefix
const ID_WIDTH: usize = 3;

/// Next free ID for `kind`
pub async fn next_id(uow: &mut dyn UnitOfWork, kind: EntityKind) -> AppResult<String> {
    let highest = uow.highest_id(kind).await?;
    Ok(successor(kind, highest.as_deref()))
}

/// ID following `highest`, or the first ID when there is none
pub fn successor(kind: EntityKind, highest: Option<&str>) -> String {
    let next = highest
        .and_then(|id| id.strip_prefix(kind.prefix()))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    format!("{}{:0width$}", kind.prefix(), next, width = ID_WIDTH)
}
