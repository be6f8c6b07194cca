//! Plain-text rendering of the widget view.

use std::fmt::Write as _;

use bridge::WidgetView;
use protocol::{DisplayMode, Stay, Theme};

/// Render one frame of the widget.
pub fn render(view: &WidgetView) -> String {
    let effective = &view.effective;
    let mut out = String::new();

    let city = if effective.city.is_empty() {
        "(no city)"
    } else {
        effective.city.as_str()
    };
    let rating = effective
        .min_rating
        .map_or_else(|| "any".to_string(), |r| format!("{r}+"));
    let _ = writeln!(out, "{city} | rating {rating} | sort {}", effective.sort);

    let mut status = Vec::new();
    if let Some(theme) = effective.theme {
        status.push(theme_name(theme));
    }
    if let Some(mode) = effective.display_mode {
        status.push(display_mode_name(mode));
    }
    if !view.host_available {
        status.push("no host");
    } else if !view.can_search {
        status.push("search unavailable");
    }
    if view.pending > 0 {
        status.push("loading");
    }
    if !status.is_empty() {
        let _ = writeln!(out, "[{}]", status.join(", "));
    }

    if effective.results.is_empty() {
        out.push_str("  no results\n");
    }
    for stay in &effective.results {
        let marker = if effective.selected.as_ref().is_some_and(|s| s.id == stay.id) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, "{marker} {}", stay_line(stay));
    }

    if let Some(selected) = &effective.selected {
        out.push('\n');
        let _ = writeln!(out, "{} ({})", selected.name, selected.id);
        if let Some(neighborhood) = &selected.neighborhood {
            let _ = writeln!(out, "  {neighborhood}, {}", selected.city);
        }
        if let Some(description) = &selected.description {
            let _ = writeln!(out, "  {description}");
        }
        if !selected.amenities.is_empty() {
            let _ = writeln!(out, "  amenities: {}", selected.amenities.join(", "));
        }
    }

    let draft = &view.draft;
    let _ = write!(
        out,
        "draft: city={:?} rating={:?} sort={}",
        draft.city, draft.min_rating, draft.sort
    );
    out
}

fn stay_line(stay: &Stay) -> String {
    let currency = stay.currency.as_deref().unwrap_or("EUR");
    format!(
        "{:<6} {:<28} {:.1}  {:.0} {currency}/night",
        stay.id, stay.name, stay.rating, stay.price_per_night
    )
}

fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
    }
}

fn display_mode_name(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::Inline => "inline",
        DisplayMode::Pip => "pip",
        DisplayMode::Fullscreen => "fullscreen",
    }
}
