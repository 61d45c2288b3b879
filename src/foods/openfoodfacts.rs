//! Open Food Facts lookup. Products come back with loosely typed nutriment
//! values (numbers or localized strings), so everything funnels through the
//! same lenient coercion the sanitizer uses.

use anyhow::Context;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::meals::model::{random_suffix, Food};
use crate::meals::sanitize::{to_number, DEFAULT_BRAND};

const PRODUCT_FIELDS: &str =
    "code,product_name,product_name_fr,product_name_en,brands,nutriments,image_url,nutriscore_grade";

#[derive(Clone)]
pub struct FoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Nutriments {
    #[serde(rename = "energy-kcal_100g")]
    energy_kcal_100g: Option<serde_json::Value>,
    proteins_100g: Option<serde_json::Value>,
    carbohydrates_100g: Option<serde_json::Value>,
    fat_100g: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Product {
    code: Option<String>,
    product_name: Option<String>,
    product_name_fr: Option<String>,
    product_name_en: Option<String>,
    brands: Option<String>,
    image_url: Option<String>,
    nutriscore_grade: Option<String>,
    #[serde(default)]
    nutriments: Nutriments,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    status: Option<i64>,
    product: Option<Product>,
}

impl FoodFactsClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("building food facts http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Text search, first ten hits. A blank query returns no results without
    /// touching the network.
    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<Food>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/cgi/search.pl", self.base_url);
        let body: SearchResponse = self
            .http
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("fields", PRODUCT_FIELDS),
                ("page_size", "10"),
                ("page", "1"),
            ])
            .send()
            .await
            .context("food search request")?
            .error_for_status()
            .context("food search response status")?
            .json()
            .await
            .context("food search response body")?;
        Ok(body.products.into_iter().map(product_to_food).collect())
    }

    /// Product lookup by barcode. `Ok(None)` means the database does not
    /// know the code.
    pub async fn by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Food>> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }
        let url = format!("{}/api/v2/product/{}.json", self.base_url, barcode);
        let body: ProductResponse = self
            .http
            .get(&url)
            .query(&[("fields", PRODUCT_FIELDS)])
            .send()
            .await
            .context("barcode request")?
            .error_for_status()
            .context("barcode response status")?
            .json()
            .await
            .context("barcode response body")?;
        if body.status != Some(1) {
            return Ok(None);
        }
        Ok(body.product.map(product_to_food))
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn opt_number(value: &Option<serde_json::Value>) -> f64 {
    value.as_ref().map(to_number).unwrap_or(0.0)
}

fn product_to_food(product: Product) -> Food {
    let name = trimmed(&product.product_name)
        .or_else(|| trimmed(&product.product_name_fr))
        .or_else(|| trimmed(&product.product_name_en))
        .unwrap_or("Sans nom")
        .to_string();
    Food {
        id: trimmed(&product.code)
            .map(str::to_string)
            .unwrap_or_else(fallback_food_id),
        name,
        brand: trimmed(&product.brands).unwrap_or(DEFAULT_BRAND).to_string(),
        image_url: trimmed(&product.image_url).unwrap_or("").to_string(),
        nutriscore: trimmed(&product.nutriscore_grade)
            .map(str::to_uppercase)
            .unwrap_or_else(|| "-".to_string()),
        calories: opt_number(&product.nutriments.energy_kcal_100g),
        proteins: opt_number(&product.nutriments.proteins_100g),
        carbs: opt_number(&product.nutriments.carbohydrates_100g),
        fats: opt_number(&product.nutriments.fat_100g),
    }
}

fn fallback_food_id() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("off-{}-{}", millis, random_suffix(6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(value: serde_json::Value) -> Product {
        serde_json::from_value(value).expect("product json")
    }

    #[test]
    fn maps_a_full_product() {
        let food = product_to_food(product(json!({
            "code": " 3017620422003 ",
            "product_name": "Pate a tartiner",
            "brands": "Ferrero",
            "image_url": "https://images.example/p.jpg",
            "nutriscore_grade": "e",
            "nutriments": {
                "energy-kcal_100g": 539,
                "proteins_100g": "6,3",
                "carbohydrates_100g": "57.5",
                "fat_100g": 30.9
            }
        })));
        assert_eq!(food.id, "3017620422003");
        assert_eq!(food.name, "Pate a tartiner");
        assert_eq!(food.brand, "Ferrero");
        assert_eq!(food.nutriscore, "E");
        assert_eq!(food.calories, 539.0);
        assert_eq!(food.proteins, 6.3);
        assert_eq!(food.carbs, 57.5);
        assert_eq!(food.fats, 30.9);
    }

    #[test]
    fn falls_back_through_localized_names() {
        let food = product_to_food(product(json!({
            "code": "1",
            "product_name": "  ",
            "product_name_fr": "Camembert"
        })));
        assert_eq!(food.name, "Camembert");

        let food = product_to_food(product(json!({"code": "2"})));
        assert_eq!(food.name, "Sans nom");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let food = product_to_food(product(json!({"code": "5", "product_name": "Eau"})));
        assert_eq!(food.brand, "Marque inconnue");
        assert_eq!(food.image_url, "");
        assert_eq!(food.nutriscore, "-");
        assert_eq!(food.calories, 0.0);
    }

    #[test]
    fn blank_code_gets_a_generated_id() {
        let food = product_to_food(product(json!({"code": "  ", "product_name": "Vrac"})));
        assert!(food.id.starts_with("off-"));
    }

    #[test]
    fn unparseable_nutriments_coerce_to_zero() {
        let food = product_to_food(product(json!({
            "code": "6",
            "product_name": "Mystere",
            "nutriments": {"energy-kcal_100g": "beaucoup", "fat_100g": null}
        })));
        assert_eq!(food.calories, 0.0);
        assert_eq!(food.fats, 0.0);
    }

    #[tokio::test]
    async fn blank_search_and_barcode_short_circuit() {
        let client = FoodFactsClient::new("http://unused.invalid", "nutritrack-tests")
            .expect("client");
        assert!(client.search("   ").await.expect("search").is_empty());
        assert!(client.by_barcode("").await.expect("barcode").is_none());
    }
}
