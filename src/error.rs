use thiserror::Error;

/// Errors surfaced by the meal store.
///
/// Read paths (`load_meals`, `load_calorie_goal`) only ever fail with
/// `InvalidUser`; storage and parse failures on those paths degrade to an
/// empty list or the default goal instead. Write paths also raise
/// `Persistence` so a failed save is never reported as success.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user id is missing or empty")]
    InvalidUser,
    #[error("storage write failed: {0}")]
    Persistence(anyhow::Error),
}
