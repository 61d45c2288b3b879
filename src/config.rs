use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding the key-value files.
    pub data_dir: String,
    /// When false the store runs single-tenant and every operation uses the
    /// fixed `local` scope instead of a caller-supplied user id.
    pub multi_tenant: bool,
    pub default_calorie_goal: u32,
    pub food_facts_base_url: String,
    pub food_facts_user_agent: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()),
            multi_tenant: std::env::var("MULTI_TENANT")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            default_calorie_goal: std::env::var("DEFAULT_CALORIE_GOAL")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|goal| *goal > 0)
                .unwrap_or(2000),
            food_facts_base_url: std::env::var("FOOD_FACTS_BASE_URL")
                .unwrap_or_else(|_| "https://fr.openfoodfacts.org".into()),
            food_facts_user_agent: std::env::var("FOOD_FACTS_USER_AGENT")
                .unwrap_or_else(|_| "nutritrack/0.1 (server)".into()),
        })
    }
}
