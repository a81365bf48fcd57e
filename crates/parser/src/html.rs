use scraper::{ElementRef, Selector};

/// Parse a selector that is a compile-time constant of this crate.
pub(crate) fn static_selector(s: &'static str) -> Selector {
    Selector::parse(s).unwrap_or_else(|e| panic!("invalid built-in selector {s:?}: {e:?}"))
}

/// Parse a caller-supplied selector.
pub fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Visible text of an element with runs of whitespace collapsed.
pub fn element_text(el: &ElementRef) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the element's class list contains `class` as a substring of one entry.
pub fn class_contains(el: &ElementRef, class: &str) -> bool {
    el.value()
        .attr("class")
        .map(|c| c.split_whitespace().any(|entry| entry.contains(class)))
        .unwrap_or(false)
}
