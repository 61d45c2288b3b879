//! Derived nutrition values. Pure functions over well-formed meals, no I/O.

use serde::Serialize;
use time::OffsetDateTime;

use super::model::{Food, Meal, Totals};

pub fn totals(foods: &[Food]) -> Totals {
    foods.iter().fold(Totals::default(), |acc, food| Totals {
        calories: acc.calories + food.calories,
        proteins: acc.proteins + food.proteins,
        carbs: acc.carbs + food.carbs,
        fats: acc.fats + food.fats,
    })
}

pub fn meal_calories(meal: &Meal) -> f64 {
    meal.foods.iter().map(|food| food.calories).sum()
}

/// Calories of every meal whose timestamp falls on `day` (`YYYY-MM-DD`),
/// matched on the date prefix of the ISO string.
pub fn calories_on(meals: &[Meal], day: &str) -> f64 {
    meals
        .iter()
        .filter(|meal| meal.date.get(..10) == Some(day))
        .map(meal_calories)
        .sum()
}

pub fn today_calories(meals: &[Meal]) -> f64 {
    calories_on(meals, &local_day())
}

/// Current civil date as `YYYY-MM-DD`. Falls back to UTC when the local
/// offset cannot be determined.
pub fn local_day() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!(
        "{:04}-{:02}-{:02}",
        now.year(),
        u8::from(now.month()),
        now.day()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    /// Raw intake/goal ratio, can exceed 1.
    pub ratio: f64,
    /// Ratio clamped to [0, 1] for fixed-width progress indicators.
    pub display: f64,
    pub over_goal: bool,
}

pub fn goal_progress(calories: f64, goal: u32) -> GoalProgress {
    let ratio = if goal > 0 { calories / f64::from(goal) } else { 0.0 };
    GoalProgress {
        ratio,
        display: ratio.clamp(0.0, 1.0),
        over_goal: ratio > 1.0,
    }
}
