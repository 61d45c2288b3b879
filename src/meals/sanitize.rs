//! Validation layer between raw persisted JSON and domain entities.
//!
//! Persisted blobs can be damaged by version skew or truncated writes, so
//! everything read back from storage passes through here. Records that fail
//! the shape check are dropped rather than reported; the rest of the crate
//! only ever sees well-formed meals.

use serde_json::Value;

use super::model::{Food, Meal};

pub(crate) const DEFAULT_BRAND: &str = "Marque inconnue";

/// Lenient numeric coercion: JSON numbers pass through, strings accept both
/// `.` and `,` as decimal separator, anything else becomes 0.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn required_text(value: &Value, key: &str) -> Option<String> {
    let text = value.get(key)?.as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn text_or(value: &Value, key: &str, fallback: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn number_field(value: &Value, key: &str) -> f64 {
    value.get(key).map(to_number).unwrap_or(0.0)
}

/// `id` and `name` are required; every other field falls back to a default.
pub fn sanitize_food(value: &Value) -> Option<Food> {
    let id = required_text(value, "id")?;
    let name = required_text(value, "name")?;
    Some(Food {
        id,
        name,
        brand: text_or(value, "brand", DEFAULT_BRAND),
        image_url: text_or(value, "image_url", ""),
        nutriscore: text_or(value, "nutriscore", "-"),
        calories: number_field(value, "calories"),
        proteins: number_field(value, "proteins"),
        carbs: number_field(value, "carbs"),
        fats: number_field(value, "fats"),
    })
}

/// Rejects the meal when `id`, `name` or `date` is missing or `foods` is not
/// an array. Bad entries inside `foods` are dropped without rejecting the
/// meal itself.
pub fn sanitize_meal(value: &Value) -> Option<Meal> {
    let id = required_text(value, "id")?;
    let name = required_text(value, "name")?;
    let date = required_text(value, "date")?;
    let foods = value.get("foods")?.as_array()?;
    Some(Meal {
        id,
        name,
        date,
        foods: foods.iter().filter_map(sanitize_food).collect(),
    })
}

/// Non-arrays sanitize to an empty list. Valid meals keep their relative
/// order through the filter, then get the store's date-descending sort.
pub fn sanitize_meals(value: &Value) -> Vec<Meal> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let mut meals: Vec<Meal> = items.iter().filter_map(sanitize_meal).collect();
    meals.sort_by(|a, b| b.date.cmp(&a.date));
    meals
}
