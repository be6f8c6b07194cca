//! Stay catalog and the `explore_stays` operation.

use std::path::Path;

use protocol::{AppliedFilters, SearchArgs, SearchOutput, SortOrder, Stay};

use crate::Result;

const BUILTIN: &str = include_str!("../data/stays.json");

/// A fixed set of stays to search.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    stays: Vec<Stay>,
}

impl Catalog {
    pub fn new(stays: Vec<Stay>) -> Self {
        Self { stays }
    }

    /// The catalog bundled with this crate.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN)
    }

    /// Load a catalog from a JSON file holding an array of stays.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn stays(&self) -> &[Stay] {
        &self.stays
    }

    pub fn len(&self) -> usize {
        self.stays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stays.is_empty()
    }

    /// Run a search.
    ///
    /// Cities match case-insensitively after trimming. Rating order is
    /// highest first, price order cheapest first; ties keep catalog order.
    /// `selected` is only filled when the id is among the filtered results.
    pub fn explore(&self, args: &SearchArgs) -> SearchOutput {
        let city = args.city.trim();
        let city_norm = city.to_lowercase();
        let sort = args.sort.unwrap_or_default();

        let mut results: Vec<Stay> = self
            .stays
            .iter()
            .filter(|stay| stay.city.to_lowercase() == city_norm)
            .filter(|stay| args.min_rating.is_none_or(|min| stay.rating >= min))
            .cloned()
            .collect();

        match sort {
            SortOrder::Rating => results.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortOrder::Price => {
                results.sort_by(|a, b| a.price_per_night.total_cmp(&b.price_per_night))
            }
        }

        let selected = args
            .selected_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| results.iter().find(|stay| stay.id == id))
            .cloned();

        SearchOutput {
            city: Some(city.to_string()),
            results,
            selected,
            applied_filters: Some(AppliedFilters {
                min_rating: args.min_rating,
                sort: Some(sort),
            }),
        }
    }
}
