//! Storage key scheme. The current generation scopes every key by user id;
//! the unscoped keys are the legacy generation, consumed once by migration.

pub(crate) const LEGACY_MEALS_KEY: &str = "@meals";
pub(crate) const LEGACY_CALORIE_GOAL_KEY: &str = "@calorie_goal";

/// Fixed scope id used when the store runs single-tenant.
pub(crate) const LOCAL_SCOPE: &str = "local";

pub(crate) fn meals_key(user_id: &str) -> String {
    format!("@meals:{user_id}")
}

pub(crate) fn calorie_goal_key(user_id: &str) -> String {
    format!("@calorie_goal:{user_id}")
}
