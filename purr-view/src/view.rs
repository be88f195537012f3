//! Derived views over the canonical collection
//!
//! A view is the canonical order filtered by type and search term. It is never
//! re-sorted, and deriving it never touches the store.

use std::sync::Arc;

use crate::models::Entry;

/// Type selector applied before the search predicate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    /// Lowercased needle matched as a substring of `content_type`
    Coarse(String),
    /// `type:subtype`; only the subtype decides membership
    Compound { content_type: String, subtype: String },
}

impl TypeFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return TypeFilter::All;
        }
        match trimmed.split_once(':') {
            Some((content_type, subtype)) => TypeFilter::Compound {
                content_type: content_type.trim().to_lowercase(),
                subtype: subtype.trim().to_string(),
            },
            None => TypeFilter::Coarse(trimmed.to_lowercase()),
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Coarse(needle) => entry.content_type.to_lowercase().contains(needle.as_str()),
            TypeFilter::Compound { subtype, .. } => {
                entry.content_subtype.as_deref() == Some(subtype.as_str())
            }
        }
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeFilter::All => write!(f, "all"),
            TypeFilter::Coarse(needle) => write!(f, "{}", needle),
            TypeFilter::Compound { content_type, subtype } => write!(f, "{}:{}", content_type, subtype),
        }
    }
}

fn matches_search(entry: &Entry, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    let hit = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|value| value.to_lowercase().contains(needle_lower))
    };
    hit(&entry.content_data) || hit(&entry.source_app)
}

/// Filter `entries` by type and trimmed, case-insensitive search term.
pub fn derive_view(entries: &[Entry], filter: &TypeFilter, search_term: &str) -> Vec<Entry> {
    let needle = search_term.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| filter.matches(entry) && matches_search(entry, &needle))
        .cloned()
        .collect()
}

/// Memoizes the last derived view keyed on snapshot identity, filter and term.
#[derive(Debug, Default)]
pub struct ViewCache {
    source: Option<Arc<Vec<Entry>>>,
    filter: TypeFilter,
    term: String,
    view: Arc<Vec<Entry>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the view for these inputs, re-deriving only when one changed.
    pub fn get(&mut self, snapshot: &Arc<Vec<Entry>>, filter: &TypeFilter, term: &str) -> Arc<Vec<Entry>> {
        let fresh = self
            .source
            .as_ref()
            .is_some_and(|source| Arc::ptr_eq(source, snapshot))
            && self.filter == *filter
            && self.term == term;

        if !fresh {
            self.view = Arc::new(derive_view(snapshot, filter, term));
            self.source = Some(Arc::clone(snapshot));
            self.filter = filter.clone();
            self.term = term.to_string();
            tracing::trace!(filter = %filter, len = self.view.len(), "Derived view");
        }
        Arc::clone(&self.view)
    }

    pub fn invalidate(&mut self) {
        self.source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ContentSubtype;

    fn text(data: &str, subtype: ContentSubtype, app: Option<&str>) -> Entry {
        Entry::new_text(data, app.map(String::from)).with_subtype(subtype)
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(TypeFilter::parse("all"), TypeFilter::All);
        assert_eq!(TypeFilter::parse("  "), TypeFilter::All);
        assert_eq!(TypeFilter::parse("Image"), TypeFilter::Coarse("image".to_string()));
        assert_eq!(
            TypeFilter::parse("text:url"),
            TypeFilter::Compound { content_type: "text".to_string(), subtype: "url".to_string() }
        );
        assert_eq!(TypeFilter::parse("text:url").to_string(), "text:url");
    }

    #[test]
    fn test_coarse_filter_is_case_insensitive() {
        let mut image = Entry::new_image("imgs/a.png", None);
        image.content_type = "Image".to_string();
        let entries = vec![image.clone(), Entry::new_text("hello", None)];

        let view = derive_view(&entries, &TypeFilter::parse("image"), "");
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, image.id);
    }

    #[test]
    fn test_filter_conjunction() {
        let entries = vec![
            text("https://foo.example", ContentSubtype::Url, None),
            text("https://bar.example", ContentSubtype::Url, Some("FooBrowser")),
            text("https://bar.example/2", ContentSubtype::Url, None),
            text("foo plain", ContentSubtype::PlainText, None),
            Entry::new_text("FOO no subtype", None),
        ];
        let view = derive_view(&entries, &TypeFilter::parse("text:url"), "foo");

        let expected: Vec<&Entry> = entries
            .iter()
            .filter(|e| {
                e.content_subtype.as_deref() == Some("url")
                    && (e.content_data.as_deref().unwrap_or("").to_lowercase().contains("foo")
                        || e.source_app.as_deref().unwrap_or("").to_lowercase().contains("foo"))
            })
            .collect();
        assert_eq!(view.len(), 2);
        assert_eq!(view.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_search_term_is_trimmed_and_order_kept() {
        let entries = vec![
            Entry::new_text("alpha one", None),
            Entry::new_text("beta", None),
            Entry::new_text("ALPHA two", None),
        ];
        let view = derive_view(&entries, &TypeFilter::All, "  alpha ");
        let data: Vec<_> = view.iter().map(|e| e.content_data.as_deref().unwrap()).collect();
        assert_eq!(data, vec!["alpha one", "ALPHA two"]);

        assert_eq!(derive_view(&entries, &TypeFilter::All, "").len(), 3);
    }

    #[test]
    fn test_view_cache_memoizes_on_identity() {
        let snapshot = Arc::new(vec![Entry::new_text("a", None), Entry::new_text("b", None)]);
        let mut cache = ViewCache::new();

        let first = cache.get(&snapshot, &TypeFilter::All, "");
        let second = cache.get(&snapshot, &TypeFilter::All, "");
        assert!(Arc::ptr_eq(&first, &second));

        let narrowed = cache.get(&snapshot, &TypeFilter::All, "a");
        assert_eq!(narrowed.len(), 1);

        // Same contents, new identity: re-derived.
        let copy = Arc::new(snapshot.as_ref().clone());
        let third = cache.get(&copy, &TypeFilter::All, "a");
        assert!(!Arc::ptr_eq(&narrowed, &third));
        assert_eq!(*narrowed, *third);
    }
}
