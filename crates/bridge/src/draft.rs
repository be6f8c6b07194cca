//! Uncommitted search input.

use protocol::{SearchArgs, SortOrder, WidgetState};

/// What the user has typed but not yet applied.
///
/// Never persisted or sent anywhere. Reseeded from the committed state after
/// every successful commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub city: String,
    /// Raw text of the minimum-rating field.
    pub min_rating: String,
    pub sort: SortOrder,
}

impl Draft {
    /// A draft showing exactly what was committed.
    pub fn from_committed(state: &WidgetState) -> Self {
        Self {
            city: state.city.clone(),
            min_rating: state.min_rating.map(|r| r.to_string()).unwrap_or_default(),
            sort: state.sort,
        }
    }

    /// Normalize into operation arguments.
    ///
    /// The city is trimmed and the rating parsed with [`parse_min_rating`].
    /// `selected_id` is always left unset.
    pub fn normalize(&self) -> SearchArgs {
        SearchArgs {
            city: self.city.trim().to_string(),
            min_rating: parse_min_rating(&self.min_rating),
            sort: Some(self.sort),
            selected_id: None,
        }
    }
}

/// Lenient minimum-rating parse.
///
/// Blank input means no filter. Anything that is not a finite number is
/// treated as no filter rather than an error.
pub fn parse_min_rating(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|rating| rating.is_finite())
}
