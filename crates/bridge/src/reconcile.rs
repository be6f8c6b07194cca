//! Field-level merge of backend output, persisted state and defaults.

use protocol::{
    AppliedFilters, DisplayMode, HostGlobals, SearchOutput, SortOrder, Stay, Theme, WidgetState,
};
use serde_json::Value;
use tracing::debug;

use crate::selection::{Selection, resolve_selection};

/// What the rest of the widget renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveView {
    pub city: String,
    pub min_rating: Option<f64>,
    pub sort: SortOrder,
    /// Results of the last backend output, in backend order.
    pub results: Vec<Stay>,
    /// The active selection, resolved against `results`.
    pub selected: Option<Stay>,
    /// Whether `selected` was asserted by the backend rather than looked up.
    pub selected_explicitly: bool,
    /// The persisted selection id, which may be stale.
    pub selected_id: Option<String>,
    pub theme: Option<Theme>,
    pub display_mode: Option<DisplayMode>,
    pub response_metadata: Option<Value>,
}

impl EffectiveView {
    pub fn has_output(&self) -> bool {
        !self.results.is_empty() || self.selected.is_some()
    }
}

/// Parse `toolOutput` field by field.
///
/// A malformed field is treated as absent without discarding the others, and
/// a malformed result entry is dropped from the list. Output that is not an
/// object is absent altogether.
pub fn backend_output(globals: &HostGlobals) -> Option<SearchOutput> {
    let value = globals.tool_output.as_ref()?;
    let Value::Object(output) = value else {
        debug!(%value, "ignoring tool output that is not an object");
        return None;
    };

    let city = output.get("city").and_then(Value::as_str).map(str::to_string);
    let results = output
        .get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_stay).collect())
        .unwrap_or_default();
    let selected = output.get("selected").and_then(parse_stay);
    let applied_filters = output
        .get("applied_filters")
        .and_then(Value::as_object)
        .map(|filters| AppliedFilters {
            min_rating: filters
                .get("min_rating")
                .and_then(Value::as_f64)
                .filter(|rating| rating.is_finite()),
            sort: filters
                .get("sort")
                .and_then(Value::as_str)
                .and_then(|sort| sort.parse().ok()),
        });

    Some(SearchOutput {
        city,
        results,
        selected,
        applied_filters,
    })
}

fn parse_stay(value: &Value) -> Option<Stay> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(stay) => Some(stay),
        Err(e) => {
            debug!(error = %e, "skipping malformed stay");
            None
        }
    }
}

/// Compute the effective view.
///
/// For each of city, minimum rating and sort order, a non-null backend
/// value wins, then the persisted value. `persisted` already carries the
/// component defaults when nothing was ever persisted. Pure: the same inputs
/// always give the same view.
pub fn reconcile(globals: &HostGlobals, persisted: &WidgetState) -> EffectiveView {
    let output = backend_output(globals).unwrap_or_default();
    let applied = output.applied_filters.clone().unwrap_or_default();

    let city = output.city.clone().unwrap_or_else(|| persisted.city.clone());
    let min_rating = applied.min_rating.or(persisted.min_rating);
    let sort = applied.sort.unwrap_or(persisted.sort);

    let selection = resolve_selection(
        output.selected.as_ref(),
        persisted.selected_id.as_deref(),
        &output.results,
    );
    let selected_explicitly = matches!(selection, Selection::Explicit(_));
    let selected = selection.stay().cloned();

    EffectiveView {
        city,
        min_rating,
        sort,
        selected,
        selected_explicitly,
        selected_id: persisted.selected_id.clone(),
        results: output.results,
        theme: globals.theme,
        display_mode: globals.display_mode,
        response_metadata: globals.tool_response_metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn persisted(city: &str, sort: SortOrder) -> WidgetState {
        WidgetState {
            city: city.into(),
            sort,
            ..Default::default()
        }
    }

    fn stay_json(id: &str) -> Value {
        json!({"id": id, "name": format!("Stay {id}"), "city": "Lyon", "rating": 4.0, "price_per_night": 90.0})
    }

    #[test]
    fn persisted_sort_used_when_backend_silent() {
        let globals = HostGlobals {
            tool_output: Some(json!({"city": "Lyon", "results": [], "applied_filters": {}})),
            ..Default::default()
        };
        let view = reconcile(&globals, &persisted("Lyon", SortOrder::Price));
        assert_eq!(view.sort, SortOrder::Price);
    }

    #[test]
    fn backend_sort_overrides_persisted() {
        let globals = HostGlobals {
            tool_output: Some(json!({"city": "Lyon", "results": [], "applied_filters": {"sort": "rating"}})),
            ..Default::default()
        };
        let view = reconcile(&globals, &persisted("Lyon", SortOrder::Price));
        assert_eq!(view.sort, SortOrder::Rating);
    }

    #[test]
    fn fallback_is_per_field() {
        let globals = HostGlobals {
            tool_output: Some(json!({
                "city": "Lyon",
                "results": [],
                "applied_filters": {"min_rating": null, "sort": "price"}
            })),
            ..Default::default()
        };
        let state = WidgetState {
            city: "Paris".into(),
            min_rating: Some(4.0),
            sort: SortOrder::Rating,
            selected_id: None,
        };
        let view = reconcile(&globals, &state);
        assert_eq!(view.city, "Lyon");
        assert_eq!(view.min_rating, Some(4.0));
        assert_eq!(view.sort, SortOrder::Price);
    }

    #[test]
    fn fresh_mount_uses_persisted_defaults() {
        let globals = HostGlobals {
            tool_input: Some(json!({"city": "Paris"})),
            ..Default::default()
        };
        let state = WidgetState::from_tool_input(globals.tool_input.as_ref());
        let view = reconcile(&globals, &state);
        assert_eq!(view.city, "Paris");
        assert!(view.results.is_empty());
        assert_eq!(view.selected, None);
        assert!(!view.has_output());
    }

    #[test]
    fn stale_selected_id_resolves_to_none() {
        let globals = HostGlobals {
            tool_output: Some(json!({"city": "Lyon", "results": [stay_json("a"), stay_json("b")]})),
            ..Default::default()
        };
        let state = WidgetState {
            selected_id: Some("c".into()),
            ..persisted("Lyon", SortOrder::Rating)
        };
        let view = reconcile(&globals, &state);
        assert_eq!(view.results.len(), 2);
        assert_eq!(view.selected, None);
        assert_eq!(view.selected_id.as_deref(), Some("c"));
    }

    #[test]
    fn explicit_backend_selection_is_kept() {
        let globals = HostGlobals {
            tool_output: Some(json!({"city": "Lyon", "results": [], "selected": stay_json("z")})),
            ..Default::default()
        };
        let view = reconcile(&globals, &persisted("Lyon", SortOrder::Rating));
        assert_eq!(view.selected.map(|s| s.id), Some("z".to_string()));
        assert!(view.selected_explicitly);
    }

    #[test]
    fn malformed_output_is_ignored() {
        let globals = HostGlobals {
            tool_output: Some(json!({"results": "not a list"})),
            ..Default::default()
        };
        let view = reconcile(&globals, &persisted("Nice", SortOrder::Price));
        assert_eq!(view.city, "Nice");
        assert_eq!(view.sort, SortOrder::Price);
        assert!(view.results.is_empty());
    }

    #[test]
    fn malformed_fields_do_not_discard_the_rest() {
        let globals = HostGlobals {
            tool_output: Some(json!({
                "city": "Lyon",
                "results": [stay_json("a"), {"id": "b", "city": "Lyon"}, stay_json("c")],
                "selected": null,
                "applied_filters": {"min_rating": 4.0, "sort": "stars"}
            })),
            ..Default::default()
        };
        let view = reconcile(&globals, &persisted("Nice", SortOrder::Price));
        assert_eq!(view.city, "Lyon");
        let ids: Vec<_> = view.results.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(view.min_rating, Some(4.0));
        assert_eq!(view.sort, SortOrder::Price);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let globals = HostGlobals {
            tool_output: Some(json!({"city": "Lyon", "results": [stay_json("a")]})),
            theme: Some(Theme::Dark),
            ..Default::default()
        };
        let state = persisted("Lyon", SortOrder::Rating);
        assert_eq!(reconcile(&globals, &state), reconcile(&globals, &state));
    }
}
