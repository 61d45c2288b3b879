use std::sync::Arc;

use crate::config::AppConfig;
use crate::foods::openfoodfacts::FoodFactsClient;
use crate::meals::store::MealStore;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub meals: MealStore,
    pub foods: FoodFactsClient,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let kv = Arc::new(FileStore::new(&config.data_dir)) as Arc<dyn KeyValueStore>;
        let meals = MealStore::new(kv, config.multi_tenant);
        let foods = FoodFactsClient::new(
            config.food_facts_base_url.as_str(),
            &config.food_facts_user_agent,
        )?;
        Ok(Self {
            config,
            meals,
            foods,
        })
    }

    pub fn from_parts(config: Arc<AppConfig>, meals: MealStore, foods: FoodFactsClient) -> Self {
        Self {
            config,
            meals,
            foods,
        }
    }

    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            data_dir: "unused".into(),
            multi_tenant: true,
            default_calorie_goal: 2000,
            food_facts_base_url: "http://fake.invalid".into(),
            food_facts_user_agent: "nutritrack-tests".into(),
        });
        let kv = Arc::new(MemoryStore::default()) as Arc<dyn KeyValueStore>;
        let meals = MealStore::new(kv, config.multi_tenant);
        let foods = FoodFactsClient::new(
            config.food_facts_base_url.as_str(),
            &config.food_facts_user_agent,
        )
        .expect("fake http client");
        Self {
            config,
            meals,
            foods,
        }
    }
}
