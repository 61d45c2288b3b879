use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::storage::KeyValueStore;

use super::keys::{
    calorie_goal_key, meals_key, LEGACY_CALORIE_GOAL_KEY, LEGACY_MEALS_KEY, LOCAL_SCOPE,
};
use super::model::Meal;
use super::sanitize::sanitize_meals;

pub const DEFAULT_CALORIE_GOAL: u32 = 2000;

/// Per-user meal persistence over a [`KeyValueStore`].
///
/// Mutations are read-modify-write over the whole list: cost is linear in
/// meal count and two concurrent writers on the same user can lose an update.
/// Single-device usage is assumed.
#[derive(Clone)]
pub struct MealStore {
    kv: Arc<dyn KeyValueStore>,
    multi_tenant: bool,
}

impl MealStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, multi_tenant: bool) -> Self {
        Self { kv, multi_tenant }
    }

    /// Resolves the scope for an operation before any I/O happens.
    /// Multi-tenant mode requires a non-empty trimmed user id; single-tenant
    /// mode maps everything onto the fixed local scope.
    fn scope<'a>(&self, user_id: Option<&'a str>) -> Result<&'a str, StoreError> {
        if !self.multi_tenant {
            return Ok(LOCAL_SCOPE);
        }
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(StoreError::InvalidUser),
        }
    }

    /// One-time copy of a legacy unscoped record into its scoped key.
    ///
    /// No-op when the scoped key already holds a value or the legacy key is
    /// empty; otherwise the legacy value is copied verbatim and the legacy
    /// key removed, so a second run cannot duplicate data. The two reads are
    /// issued concurrently.
    async fn migrate_legacy_if_needed(
        &self,
        scoped_key: &str,
        legacy_key: &str,
    ) -> anyhow::Result<()> {
        let (scoped, legacy) = tokio::join!(
            self.kv.get_item(scoped_key),
            self.kv.get_item(legacy_key)
        );
        if scoped?.is_some() {
            return Ok(());
        }
        let Some(legacy_value) = legacy? else {
            return Ok(());
        };
        self.kv.set_item(scoped_key, &legacy_value).await?;
        self.kv.remove_item(legacy_key).await?;
        debug!(key = scoped_key, "migrated legacy record to scoped key");
        Ok(())
    }

    /// Sanitized, date-descending meal list. Storage or parse failures
    /// degrade to an empty list; only a missing user id is an error.
    pub async fn load_meals(&self, user_id: Option<&str>) -> Result<Vec<Meal>, StoreError> {
        let scope = self.scope(user_id)?;
        Ok(self.read_meals(scope).await)
    }

    async fn read_meals(&self, scope: &str) -> Vec<Meal> {
        let key = meals_key(scope);
        let result = async {
            self.migrate_legacy_if_needed(&key, LEGACY_MEALS_KEY).await?;
            self.kv.get_item(&key).await
        }
        .await;
        let raw = match result {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "meal read failed, treating store as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => sanitize_meals(&value),
            Err(e) => {
                warn!(error = %e, "stored meals are not valid JSON, dropping them");
                Vec::new()
            }
        }
    }

    pub async fn save_meals(
        &self,
        meals: &[Meal],
        user_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let scope = self.scope(user_id)?;
        self.write_meals(scope, meals).await.map(|_| ())
    }

    /// Sanitizes, sorts and persists, returning the list as stored.
    async fn write_meals(&self, scope: &str, meals: &[Meal]) -> Result<Vec<Meal>, StoreError> {
        let value = serde_json::to_value(meals).map_err(|e| StoreError::Persistence(e.into()))?;
        let clean = sanitize_meals(&value);
        let payload =
            serde_json::to_string(&clean).map_err(|e| StoreError::Persistence(e.into()))?;
        self.kv
            .set_item(&meals_key(scope), &payload)
            .await
            .map_err(StoreError::Persistence)?;
        Ok(clean)
    }

    pub async fn add_meal(
        &self,
        meal: Meal,
        user_id: Option<&str>,
    ) -> Result<Vec<Meal>, StoreError> {
        let scope = self.scope(user_id)?;
        let mut meals = self.read_meals(scope).await;
        meals.insert(0, meal);
        self.write_meals(scope, &meals).await
    }

    /// Removes every meal matching `meal_id` and returns the stored list.
    pub async fn delete_meal(
        &self,
        meal_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<Meal>, StoreError> {
        let scope = self.scope(user_id)?;
        let mut meals = self.read_meals(scope).await;
        meals.retain(|meal| meal.id != meal_id);
        self.write_meals(scope, &meals).await
    }

    /// Replaces the first meal whose id matches; a miss leaves the list
    /// unchanged (apart from the save's sanitize-and-sort).
    pub async fn update_meal(
        &self,
        meal: Meal,
        user_id: Option<&str>,
    ) -> Result<Vec<Meal>, StoreError> {
        let scope = self.scope(user_id)?;
        let mut meals = self.read_meals(scope).await;
        if let Some(slot) = meals.iter_mut().find(|m| m.id == meal.id) {
            *slot = meal;
        }
        self.write_meals(scope, &meals).await
    }

    /// Stored goal as a positive integer, or `default` when the key is
    /// absent, unreadable or holds a non-positive value.
    pub async fn load_calorie_goal(
        &self,
        default: u32,
        user_id: Option<&str>,
    ) -> Result<u32, StoreError> {
        let scope = self.scope(user_id)?;
        let key = calorie_goal_key(scope);
        let result = async {
            self.migrate_legacy_if_needed(&key, LEGACY_CALORIE_GOAL_KEY)
                .await?;
            self.kv.get_item(&key).await
        }
        .await;
        let raw = match result {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(default),
            Err(e) => {
                warn!(error = %e, "calorie goal read failed, using default");
                return Ok(default);
            }
        };
        Ok(match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => v.round() as u32,
            _ => default,
        })
    }

    /// Normalizes the goal (non-finite or non-positive values become the
    /// default, everything else rounds to an integer), persists it as a
    /// decimal string and returns what was stored.
    pub async fn save_calorie_goal(
        &self,
        goal: f64,
        user_id: Option<&str>,
    ) -> Result<u32, StoreError> {
        let scope = self.scope(user_id)?;
        let normalized = if goal.is_finite() && goal > 0.0 {
            goal.round() as u32
        } else {
            DEFAULT_CALORIE_GOAL
        };
        self.kv
            .set_item(&calorie_goal_key(scope), &normalized.to_string())
            .await
            .map_err(StoreError::Persistence)?;
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::model::Food;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    fn store() -> (Arc<MemoryStore>, MealStore) {
        let kv = Arc::new(MemoryStore::default());
        let store = MealStore::new(kv.clone(), true);
        (kv, store)
    }

    fn meal(id: &str, date: &str) -> Meal {
        Meal {
            id: id.to_string(),
            name: "Dejeuner".to_string(),
            date: date.to_string(),
            foods: vec![Food {
                id: "f1".to_string(),
                name: "Pomme".to_string(),
                brand: "Marque inconnue".to_string(),
                image_url: String::new(),
                nutriscore: "A".to_string(),
                calories: 52.0,
                proteins: 0.3,
                carbs: 14.0,
                fats: 0.2,
            }],
        }
    }

    #[tokio::test]
    async fn load_from_empty_store_is_empty() {
        let (_, store) = store();
        let meals = store.load_meals(Some("u1")).await.expect("load");
        assert!(meals.is_empty());
    }

    #[tokio::test]
    async fn add_then_load_positions_by_date_descending() {
        let (_, store) = store();
        store
            .add_meal(meal("old", "2026-08-20T12:00:00.000Z"), Some("u1"))
            .await
            .expect("add old");
        store
            .add_meal(meal("newest", "2026-08-25T12:00:00.000Z"), Some("u1"))
            .await
            .expect("add newest");
        let returned = store
            .add_meal(meal("middle", "2026-08-22T12:00:00.000Z"), Some("u1"))
            .await
            .expect("add middle");

        let ids: Vec<&str> = returned.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["newest", "middle", "old"]);

        let loaded = store.load_meals(Some("u1")).await.expect("load");
        assert_eq!(loaded, returned);
        assert_eq!(loaded.iter().filter(|m| m.id == "middle").count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_every_matching_id() {
        let (_, store) = store();
        store
            .save_meals(
                &[
                    meal("keep", "2026-08-25T12:00:00.000Z"),
                    meal("dup", "2026-08-24T12:00:00.000Z"),
                    meal("dup", "2026-08-23T12:00:00.000Z"),
                ],
                Some("u1"),
            )
            .await
            .expect("seed");

        let after = store.delete_meal("dup", Some("u1")).await.expect("delete");
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, "keep");
        assert!(store
            .load_meals(Some("u1"))
            .await
            .expect("load")
            .iter()
            .all(|m| m.id != "dup"));
    }

    #[tokio::test]
    async fn update_replaces_first_match_only() {
        let (_, store) = store();
        store
            .save_meals(
                &[
                    meal("dup", "2026-08-25T12:00:00.000Z"),
                    meal("dup", "2026-08-24T12:00:00.000Z"),
                ],
                Some("u1"),
            )
            .await
            .expect("seed");

        let mut replacement = meal("dup", "2026-08-25T12:00:00.000Z");
        replacement.name = "Diner".to_string();
        let after = store
            .update_meal(replacement, Some("u1"))
            .await
            .expect("update");
        assert_eq!(after[0].name, "Diner");
        assert_eq!(after[1].name, "Dejeuner");
    }

    #[tokio::test]
    async fn scoped_calls_reject_blank_user_ids() {
        let (_, store) = store();
        for user in [None, Some(""), Some("   ")] {
            let err = store.load_meals(user).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidUser));
        }
        let err = store
            .save_calorie_goal(1800.0, Some(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUser));
    }

    #[tokio::test]
    async fn users_do_not_see_each_others_meals() {
        let (_, store) = store();
        store
            .add_meal(meal("mine", "2026-08-25T12:00:00.000Z"), Some("u1"))
            .await
            .expect("add");
        assert!(store.load_meals(Some("u2")).await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn single_tenant_mode_uses_the_local_scope() {
        let kv = Arc::new(MemoryStore::default());
        let store = MealStore::new(kv.clone(), false);
        store
            .add_meal(meal("m1", "2026-08-25T12:00:00.000Z"), None)
            .await
            .expect("add");
        // Any caller-supplied id maps onto the same data.
        let meals = store.load_meals(Some("ignored")).await.expect("load");
        assert_eq!(meals.len(), 1);
        assert!(kv
            .get_item("@meals:local")
            .await
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn legacy_meals_migrate_once_and_legacy_key_is_removed() {
        let (kv, store) = store();
        let legacy = serde_json::to_string(&vec![meal("legacy", "2026-08-01T08:00:00.000Z")])
            .expect("serialize");
        kv.set_item(LEGACY_MEALS_KEY, &legacy).await.expect("seed");

        let meals = store.load_meals(Some("u1")).await.expect("first load");
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].id, "legacy");
        assert!(kv.get_item(LEGACY_MEALS_KEY).await.expect("get").is_none());
        assert!(kv
            .get_item("@meals:u1")
            .await
            .expect("get")
            .is_some());

        // Second call sees the same state.
        let again = store.load_meals(Some("u1")).await.expect("second load");
        assert_eq!(again, meals);
    }

    #[tokio::test]
    async fn migration_never_overwrites_scoped_data() {
        let (kv, store) = store();
        let scoped = serde_json::to_string(&vec![meal("scoped", "2026-08-25T08:00:00.000Z")])
            .expect("serialize");
        kv.set_item("@meals:u1", &scoped).await.expect("seed scoped");
        kv.set_item(LEGACY_MEALS_KEY, "[]").await.expect("seed legacy");

        let meals = store.load_meals(Some("u1")).await.expect("load");
        assert_eq!(meals[0].id, "scoped");
        // Legacy key stays put; the scoped key already had a value.
        assert!(kv.get_item(LEGACY_MEALS_KEY).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn legacy_goal_migrates_with_the_same_rules() {
        let (kv, store) = store();
        kv.set_item(LEGACY_CALORIE_GOAL_KEY, "1800")
            .await
            .expect("seed");
        let goal = store
            .load_calorie_goal(DEFAULT_CALORIE_GOAL, Some("u1"))
            .await
            .expect("load");
        assert_eq!(goal, 1800);
        assert!(kv
            .get_item(LEGACY_CALORIE_GOAL_KEY)
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn corrupt_meal_json_degrades_to_empty() {
        let (kv, store) = store();
        kv.set_item("@meals:u1", "{not json").await.expect("seed");
        assert!(store.load_meals(Some("u1")).await.expect("load").is_empty());

        kv.set_item("@meals:u1", "{\"an\": \"object\"}")
            .await
            .expect("seed");
        assert!(store.load_meals(Some("u1")).await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn malformed_records_are_dropped_on_load() {
        let (kv, store) = store();
        kv.set_item(
            "@meals:u1",
            r#"[{"id":"ok","name":"Diner","date":"2026-08-25T19:00:00.000Z","foods":[]},
                {"id":"no-date","name":"Diner","foods":[]}]"#,
        )
        .await
        .expect("seed");
        let meals = store.load_meals(Some("u1")).await.expect("load");
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].id, "ok");
    }

    #[tokio::test]
    async fn goal_defaults_when_absent_or_invalid() {
        let (kv, store) = store();
        assert_eq!(
            store
                .load_calorie_goal(DEFAULT_CALORIE_GOAL, Some("u1"))
                .await
                .expect("load"),
            2000
        );
        for bad in ["abc", "-100", "0", "NaN"] {
            kv.set_item("@calorie_goal:u1", bad).await.expect("seed");
            assert_eq!(
                store
                    .load_calorie_goal(DEFAULT_CALORIE_GOAL, Some("u1"))
                    .await
                    .expect("load"),
                2000,
                "stored value {bad:?} should fall back"
            );
        }
    }

    #[tokio::test]
    async fn goal_save_normalizes_and_returns_stored_value() {
        let (kv, store) = store();
        assert_eq!(
            store.save_calorie_goal(-5.0, Some("u1")).await.expect("save"),
            2000
        );
        assert_eq!(
            store
                .save_calorie_goal(1850.7, Some("u1"))
                .await
                .expect("save"),
            1851
        );
        assert_eq!(
            kv.get_item("@calorie_goal:u1").await.expect("get"),
            Some("1851".to_string())
        );
        assert_eq!(
            store
                .load_calorie_goal(DEFAULT_CALORIE_GOAL, Some("u1"))
                .await
                .expect("load"),
            1851
        );
    }

    struct FailingWrites;

    #[async_trait]
    impl KeyValueStore for FailingWrites {
        async fn get_item(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
        async fn set_item(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn remove_item(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn write_failures_surface_as_persistence_errors() {
        let store = MealStore::new(Arc::new(FailingWrites), true);
        let err = store
            .add_meal(meal("m1", "2026-08-25T12:00:00.000Z"), Some("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        let err = store.save_calorie_goal(1800.0, Some("u1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        // Read paths still degrade instead of failing.
        assert!(store.load_meals(Some("u1")).await.expect("load").is_empty());
    }

    struct FailingReads;

    #[async_trait]
    impl KeyValueStore for FailingReads {
        async fn get_item(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("io error")
        }
        async fn set_item(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn remove_item(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn read_failures_degrade_to_defaults() {
        let store = MealStore::new(Arc::new(FailingReads), true);
        assert!(store.load_meals(Some("u1")).await.expect("load").is_empty());
        assert_eq!(
            store
                .load_calorie_goal(1500, Some("u1"))
                .await
                .expect("load"),
            1500
        );
    }
}
