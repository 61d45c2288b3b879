use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One line item of a meal, as delivered by the food database or a barcode
/// scan. Ids are only unique per product; the same food may appear twice in
/// one meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub image_url: String,
    pub nutriscore: String,
    pub calories: f64,
    pub proteins: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// A named, timestamped eating occasion. `date` is fixed at creation; the
/// persisted meal list is kept sorted descending by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub date: String,
    pub foods: Vec<Food>,
}

impl Meal {
    pub fn new(name: impl Into<String>, foods: Vec<Food>) -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        Self {
            id: format!("meal-{}-{}", millis, random_suffix(6)),
            name: name.into(),
            date: iso_timestamp(now),
            foods,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub calories: f64,
    pub proteins: f64,
    pub carbs: f64,
    pub fats: f64,
}

pub(crate) fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`. Millisecond precision, always UTC, so lexical
/// order on the string equals chronological order.
pub(crate) fn iso_timestamp(at: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond(),
    )
}
