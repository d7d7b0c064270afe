//! Per-utterance choice between the search engine and the chat model.

/// Phrases that suggest the user wants fresh, web-sourced information.
/// Matched as case-insensitive substrings, so "find" also fires on "finding"
/// and "what is" fires mid-sentence.
pub const SEARCH_KEYWORDS: [&str; 13] = [
    "search", "look up", "find", "what is", "who is", "when did", "latest", "current", "news",
    "today", "weather", "stock", "price",
];

/// Answer engine selected for an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Search,
    Chat,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Chat => "chat",
        }
    }
}

/// Routes to search only when a keyword matches and search is configured.
pub fn route(utterance: &str, search_configured: bool) -> Route {
    if search_configured && needs_search(utterance) {
        Route::Search
    } else {
        Route::Chat
    }
}

pub fn needs_search(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    SEARCH_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
