//! Stay search types shared by the widget and the `explore_stays` operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How results are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Highest rating first.
    #[default]
    Rating,
    /// Cheapest nightly price first.
    Price,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Rating => "rating",
            SortOrder::Price => "price",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rating" => Ok(SortOrder::Rating),
            "price" => Ok(SortOrder::Price),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// A single bookable stay.
///
/// Stays are immutable once received; a new result set replaces the old one
/// wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    pub id: String,
    pub name: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub price_per_night: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Arguments of the `explore_stays` operation.
///
/// Optional fields are omitted from the JSON when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchArgs {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_id: Option<String>,
}

impl SearchArgs {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            ..Default::default()
        }
    }

    pub fn with_min_rating(mut self, min_rating: f64) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_selected_id(mut self, id: impl Into<String>) -> Self {
        self.selected_id = Some(id.into());
        self
    }
}

/// Filters the backend actually applied, which may differ from the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilters {
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

/// Structured result of `explore_stays`, as exposed through `toolOutput`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutput {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub results: Vec<Stay>,
    #[serde(default)]
    pub selected: Option<Stay>,
    #[serde(default)]
    pub applied_filters: Option<AppliedFilters>,
}

/// State the widget persists through the host.
///
/// Visible to the model as well as the UI, so it stays small and flat. All
/// fields are always serialized, with `null` for unset values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub selected_id: Option<String>,
}

impl WidgetState {
    /// Seed state from the arguments the operation was launched with.
    ///
    /// Fields that are missing or of the wrong type fall back to defaults.
    pub fn from_tool_input(input: Option<&Value>) -> Self {
        let Some(Value::Object(input)) = input else {
            return Self::default();
        };
        let city = input
            .get("city")
            .and_then(Value::as_str)
            .map(|city| city.trim().to_string())
            .unwrap_or_default();
        let min_rating = input
            .get("min_rating")
            .and_then(Value::as_f64)
            .filter(|rating| rating.is_finite());
        let sort = input
            .get("sort")
            .and_then(Value::as_str)
            .and_then(|sort| sort.parse().ok())
            .unwrap_or_default();
        let selected_id = input
            .get("selected_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            city,
            min_rating,
            sort,
            selected_id,
        }
    }

    /// Lay a stored state blob over `defaults`, field by field.
    ///
    /// `city` and `sort` fall back when missing, null or malformed. The
    /// nullable fields fall back only when missing or malformed: a stored
    /// `null` is a cleared filter or selection and is kept. Returns `None`
    /// when `stored` is not an object.
    pub fn overlay(stored: &Value, defaults: &WidgetState) -> Option<Self> {
        let Value::Object(stored) = stored else {
            return None;
        };
        let city = stored
            .get("city")
            .and_then(Value::as_str)
            .map_or_else(|| defaults.city.clone(), str::to_string);
        let sort = stored
            .get("sort")
            .and_then(Value::as_str)
            .and_then(|sort| sort.parse().ok())
            .unwrap_or(defaults.sort);
        let min_rating = match stored.get("min_rating") {
            Some(Value::Null) => None,
            Some(value) => value
                .as_f64()
                .filter(|rating| rating.is_finite())
                .or(defaults.min_rating),
            None => defaults.min_rating,
        };
        let selected_id = match stored.get("selected_id") {
            Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            _ => defaults.selected_id.clone(),
        };
        Some(Self {
            city,
            min_rating,
            sort,
            selected_id,
        })
    }
}
