use serde::{Deserialize, Serialize};

use super::aggregate::{meal_calories, totals, GoalProgress};
use super::model::{Food, Meal, Totals};

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub name: String,
    #[serde(default)]
    pub foods: Vec<Food>,
}

#[derive(Debug, Serialize)]
pub struct MealListItem {
    pub id: String,
    pub name: String,
    pub date: String,
    pub calories: f64,
    pub food_count: usize,
}

impl MealListItem {
    pub fn from_meal(meal: &Meal) -> Self {
        Self {
            id: meal.id.clone(),
            name: meal.name.clone(),
            date: meal.date.clone(),
            calories: meal_calories(meal),
            food_count: meal.foods.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealDetails {
    pub id: String,
    pub name: String,
    pub date: String,
    pub foods: Vec<Food>,
    pub totals: Totals,
}

impl MealDetails {
    pub fn from_meal(meal: Meal) -> Self {
        let sums = totals(&meal.foods);
        Self {
            id: meal.id,
            name: meal.name,
            date: meal.date,
            foods: meal.foods,
            totals: sums,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedMealResponse {
    pub id: String,
    pub date: String,
    pub meals: Vec<MealListItem>,
}

#[derive(Debug, Deserialize)]
pub struct PutGoalRequest {
    pub goal: f64,
}

#[derive(Debug, Serialize)]
pub struct GoalResponse {
    pub goal: u32,
}

#[derive(Debug, Serialize)]
pub struct TodaySummary {
    pub date: String,
    pub calories: f64,
    pub goal: u32,
    #[serde(flatten)]
    pub progress: GoalProgress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::aggregate::goal_progress;

    #[test]
    fn list_item_carries_meal_calories() {
        let meal = Meal {
            id: "m1".to_string(),
            name: "Diner".to_string(),
            date: "2026-08-25T19:00:00.000Z".to_string(),
            foods: vec![Food {
                id: "f1".to_string(),
                name: "Pates".to_string(),
                brand: "Marque inconnue".to_string(),
                image_url: String::new(),
                nutriscore: "B".to_string(),
                calories: 350.0,
                proteins: 12.0,
                carbs: 70.0,
                fats: 1.5,
            }],
        };
        let item = MealListItem::from_meal(&meal);
        assert_eq!(item.calories, 350.0);
        assert_eq!(item.food_count, 1);
    }

    #[test]
    fn today_summary_flattens_progress_fields() {
        let summary = TodaySummary {
            date: "2026-08-25".to_string(),
            calories: 2500.0,
            goal: 2000,
            progress: goal_progress(2500.0, 2000),
        };
        let json = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(json["ratio"], 1.25);
        assert_eq!(json["display"], 1.0);
        assert_eq!(json["over_goal"], true);
    }
}
