//! Metrics calculator — BMI and maintenance calories.
//!
//! Pure arithmetic over a fully defined [`CalculatorInput`]. BMR uses the
//! Mifflin-St Jeor equation (male constant); maintenance calories scale it by
//! the activity multiplier. Nothing here touches the network.

#[cfg(test)]
#[path = "calculator_test.rs"]
mod calculator_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const LB_TO_KG: f64 = 0.453_592;
pub const IN_TO_CM: f64 = 2.54;

// =============================================================================
// UNITS & RANGES
// =============================================================================

/// Closed range a front end should offer for an input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputRange {
    pub min: f64,
    pub max: f64,
}

impl InputRange {
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const AGE_RANGE: InputRange = InputRange { min: 16.0, max: 80.0 };

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn weight_unit(self) -> &'static str {
        match self {
            Self::Imperial => "lb",
            Self::Metric => "kg",
        }
    }

    pub fn height_unit(self) -> &'static str {
        match self {
            Self::Imperial => "in",
            Self::Metric => "cm",
        }
    }

    pub fn weight_range(self) -> InputRange {
        match self {
            Self::Imperial => InputRange { min: 100.0, max: 350.0 },
            Self::Metric => InputRange { min: 45.0, max: 160.0 },
        }
    }

    pub fn height_range(self) -> InputRange {
        match self {
            Self::Imperial => InputRange { min: 60.0, max: 84.0 },
            Self::Metric => InputRange { min: 150.0, max: 210.0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseInputError {
    #[error("unknown unit system `{0}` (expected imperial or metric)")]
    UnitSystem(String),
    #[error("unknown activity level `{0}`")]
    ActivityLevel(String),
}

impl FromStr for UnitSystem {
    type Err = ParseInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imperial" => Ok(Self::Imperial),
            "metric" => Ok(Self::Metric),
            _ => Err(ParseInputError::UnitSystem(s.to_owned())),
        }
    }
}

// =============================================================================
// ACTIVITY
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Active,
    VeryActive,
    Elite,
}

impl ActivityLevel {
    pub const ALL: [Self; 5] = [Self::Sedentary, Self::Light, Self::Active, Self::VeryActive, Self::Elite];

    pub fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Active => 1.55,
            Self::VeryActive => 1.725,
            Self::Elite => 1.9,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sedentary => "Sedentary (Little/no exercise)",
            Self::Light => "Light Active (1-3 days/wk)",
            Self::Active => "Active (3-5 days/wk)",
            Self::VeryActive => "Very Active (6-7 days/wk)",
            Self::Elite => "Elite Athlete (2x day)",
        }
    }

    /// Level whose multiplier equals `multiplier`.
    pub fn from_multiplier(multiplier: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.multiplier() - multiplier).abs() < 1e-9)
    }
}

impl FromStr for ActivityLevel {
    type Err = ParseInputError;

    /// Accepts a level name (`very-active`) or its multiplier (`1.725`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let by_name = match key.as_str() {
            "sedentary" => Some(Self::Sedentary),
            "light" => Some(Self::Light),
            "active" => Some(Self::Active),
            "very-active" | "very_active" => Some(Self::VeryActive),
            "elite" => Some(Self::Elite),
            _ => None,
        };
        by_name
            .or_else(|| key.parse::<f64>().ok().and_then(Self::from_multiplier))
            .ok_or_else(|| ParseInputError::ActivityLevel(s.to_owned()))
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// COMPUTATION
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorInput {
    pub unit_system: UnitSystem,
    pub age: u32,
    /// Pounds or kilograms, per `unit_system`.
    pub weight: f64,
    /// Inches or centimetres, per `unit_system`.
    pub height: f64,
    /// Serialized as its multiplier, `activityMultiplier`.
    #[serde(rename = "activityMultiplier", with = "activity_multiplier")]
    pub activity: ActivityLevel,
}

mod activity_multiplier {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::ActivityLevel;

    pub fn serialize<S: Serializer>(level: &ActivityLevel, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(level.multiplier())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActivityLevel, D::Error> {
        let multiplier = f64::deserialize(deserializer)?;
        ActivityLevel::from_multiplier(multiplier)
            .ok_or_else(|| de::Error::custom(format!("unsupported activity multiplier {multiplier}")))
    }
}

impl Default for CalculatorInput {
    fn default() -> Self {
        Self { unit_system: UnitSystem::Imperial, age: 25, weight: 180.0, height: 70.0, activity: ActivityLevel::Active }
    }
}

impl CalculatorInput {
    pub fn weight_kg(&self) -> f64 {
        match self.unit_system {
            UnitSystem::Imperial => self.weight * LB_TO_KG,
            UnitSystem::Metric => self.weight,
        }
    }

    pub fn height_cm(&self) -> f64 {
        match self.unit_system {
            UnitSystem::Imperial => self.height * IN_TO_CM,
            UnitSystem::Metric => self.height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorResult {
    /// Body-mass index to one decimal. `None` when height is not positive.
    pub bmi: Option<f64>,
    pub maintenance_calories: i64,
}

/// Basal metabolic rate in kcal/day.
pub fn bmr(input: &CalculatorInput) -> f64 {
    10.0 * input.weight_kg() + 6.25 * input.height_cm() - 5.0 * f64::from(input.age) + 5.0
}

#[allow(clippy::cast_possible_truncation)]
pub fn compute(input: &CalculatorInput) -> CalculatorResult {
    let weight_kg = input.weight_kg();
    let height_cm = input.height_cm();

    let bmi = (height_cm > 0.0).then(|| {
        let height_m = height_cm / 100.0;
        round_to_tenth(weight_kg / (height_m * height_m))
    });
    let maintenance_calories = (bmr(input) * input.activity.multiplier()).round() as i64;

    CalculatorResult { bmi, maintenance_calories }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// =============================================================================
// STATE
// =============================================================================

/// Calculator input plus the result derived from it.
///
/// Fields are private so every change goes through a setter that recomputes.
/// Changing the unit system relabels the stored numbers; it does not convert
/// them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalculatorState {
    input: CalculatorInput,
    result: CalculatorResult,
}

impl Default for CalculatorState {
    fn default() -> Self {
        Self::new(CalculatorInput::default())
    }
}

impl CalculatorState {
    pub fn new(input: CalculatorInput) -> Self {
        Self { input, result: compute(&input) }
    }

    pub fn input(&self) -> &CalculatorInput {
        &self.input
    }

    pub fn result(&self) -> &CalculatorResult {
        &self.result
    }

    pub fn set_unit_system(&mut self, unit_system: UnitSystem) {
        self.update(|input| input.unit_system = unit_system);
    }

    pub fn set_age(&mut self, age: u32) {
        self.update(|input| input.age = age);
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.update(|input| input.weight = weight);
    }

    pub fn set_height(&mut self, height: f64) {
        self.update(|input| input.height = height);
    }

    pub fn set_activity(&mut self, activity: ActivityLevel) {
        self.update(|input| input.activity = activity);
    }

    fn update(&mut self, change: impl FnOnce(&mut CalculatorInput)) {
        change(&mut self.input);
        self.result = compute(&self.input);
    }
}

// =============================================================================
// DISPLAY
// =============================================================================

/// `5'10"` for imperial, `178 cm` for metric.
pub fn format_height(unit_system: UnitSystem, height: f64) -> String {
    match unit_system {
        UnitSystem::Imperial => {
            let feet = (height / 12.0).floor();
            let inches = height % 12.0;
            format!("{feet}'{inches}\"")
        }
        UnitSystem::Metric => format!("{height} cm"),
    }
}

/// The rounded value as-is (`25`, `25.8`), or `--` when unset.
pub fn format_bmi(bmi: Option<f64>) -> String {
    match bmi {
        Some(value) if value > 0.0 => format!("{value}"),
        _ => "--".to_owned(),
    }
}

/// Whole calories, or `----` when not positive.
pub fn format_calories(calories: i64) -> String {
    if calories > 0 { calories.to_string() } else { "----".to_owned() }
}
