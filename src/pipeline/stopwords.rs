//! Stopword sets applied after normalisation.
use rustc_hash::FxHashSet;

/// Standard English stopwords (NLTK list).
pub(crate) const ENGLISH: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

/// Review-specific noise: park names and contractions whose apostrophe was
/// removed during normalisation.
pub(crate) const REVIEW_CUSTOM: &[&str] = &[
    "disney", "disneyland", "disneylands", "park", "parks", "hong", "kong", "hk", "hkdl",
    "paris", "dlp", "california", "anaheim", "dont", "didnt", "doesnt", "isnt", "wasnt",
    "werent", "arent", "cant", "couldnt", "wouldnt", "shouldnt", "wont", "im", "ive", "id",
    "youre", "youve", "theyre", "thats", "theres", "also", "would", "could",
];

/// Builds the lookup set: standard + custom + caller-provided extras.
#[must_use]
pub(crate) fn stopword_set(extra: &[String]) -> FxHashSet<String> {
    ENGLISH
        .iter()
        .chain(REVIEW_CUSTOM)
        .map(|word| (*word).to_string())
        .chain(extra.iter().map(|word| word.trim().to_lowercase()))
        .filter(|word| !word.is_empty())
        .collect()
}
