//! Maps a persisted selection id back onto the current results.

use protocol::Stay;

/// Where the active selection came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    /// The backend named a selected stay explicitly.
    Explicit(&'a Stay),
    /// The persisted id matched a stay in the current results.
    Persisted(&'a Stay),
    None,
}

impl<'a> Selection<'a> {
    pub fn stay(self) -> Option<&'a Stay> {
        match self {
            Selection::Explicit(stay) | Selection::Persisted(stay) => Some(stay),
            Selection::None => None,
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, Selection::None)
    }
}

/// Resolve the active selection.
///
/// An explicit backend selection is used as-is, even if it is not part of
/// `results`. Otherwise `selected_id` is looked up in `results`; an id that no
/// longer matches anything resolves to [`Selection::None`]. Nothing is cached,
/// so a new result set is reflected on the next call.
pub fn resolve_selection<'a>(
    explicit: Option<&'a Stay>,
    selected_id: Option<&str>,
    results: &'a [Stay],
) -> Selection<'a> {
    if let Some(stay) = explicit {
        return Selection::Explicit(stay);
    }
    selected_id
        .and_then(|id| results.iter().find(|stay| stay.id == id))
        .map_or(Selection::None, Selection::Persisted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay(id: &str) -> Stay {
        Stay {
            id: id.into(),
            name: format!("Stay {id}"),
            city: "Lyon".into(),
            neighborhood: None,
            rating: 4.0,
            price_per_night: 100.0,
            currency: None,
            amenities: Vec::new(),
            tags: Vec::new(),
            description: None,
        }
    }

    #[test]
    fn explicit_selection_wins_even_outside_results() {
        let results = vec![stay("a"), stay("b")];
        let detail = stay("z");
        let selection = resolve_selection(Some(&detail), Some("a"), &results);
        assert_eq!(selection, Selection::Explicit(&detail));
    }

    #[test]
    fn persisted_id_is_looked_up() {
        let results = vec![stay("a"), stay("b")];
        let selection = resolve_selection(None, Some("b"), &results);
        assert_eq!(selection.stay().map(|s| s.id.as_str()), Some("b"));
        assert!(matches!(selection, Selection::Persisted(_)));
    }

    #[test]
    fn stale_id_resolves_to_none() {
        let results = vec![stay("a"), stay("b")];
        assert!(resolve_selection(None, Some("c"), &results).is_none());
    }

    #[test]
    fn nothing_selected() {
        let results = vec![stay("a")];
        assert!(resolve_selection(None, None, &results).is_none());
        assert!(resolve_selection(None, Some("a"), &[]).is_none());
    }

    #[test]
    fn new_results_invalidate_previous_match() {
        let before = vec![stay("a"), stay("b")];
        assert!(!resolve_selection(None, Some("a"), &before).is_none());

        let after = vec![stay("c")];
        assert!(resolve_selection(None, Some("a"), &after).is_none());
    }

    #[test]
    fn idempotent() {
        let results = vec![stay("a"), stay("b")];
        for id in [Some("a"), Some("missing"), None] {
            let first = resolve_selection(None, id, &results);
            let second = resolve_selection(None, id, &results);
            assert_eq!(first, second);
        }
    }
}
