use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchEngine {
    Google,
    Wikipedia,
}

impl SearchEngine {
    pub const ALL: [SearchEngine; 2] = [SearchEngine::Google, SearchEngine::Wikipedia];

    pub fn label(self) -> &'static str {
        match self {
            SearchEngine::Google => "Google",
            SearchEngine::Wikipedia => "Wikipedia",
        }
    }

    fn endpoint(self) -> (&'static str, &'static str) {
        match self {
            SearchEngine::Google => ("https://www.google.com/search", "q"),
            SearchEngine::Wikipedia => ("https://en.wikipedia.org/w/index.php", "search"),
        }
    }
}

/// Results page for `query`, or `None` when the query is blank.
pub fn search_url(engine: SearchEngine, query: &str) -> Option<Url> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let (base, param) = engine.endpoint();
    Url::parse_with_params(base, &[(param, query)]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_are_ignored() {
        assert_eq!(search_url(SearchEngine::Google, "   "), None);
    }

    #[test]
    fn query_is_encoded() {
        let url = search_url(SearchEngine::Google, " rust & tui ").unwrap();
        assert_eq!(url.as_str(), "https://www.google.com/search?q=rust+%26+tui");
    }

    #[test]
    fn wikipedia_uses_its_own_endpoint() {
        let url = search_url(SearchEngine::Wikipedia, "Ferris").unwrap();
        assert_eq!(url.host_str(), Some("en.wikipedia.org"));
        assert_eq!(url.query(), Some("search=Ferris"));
    }
}
