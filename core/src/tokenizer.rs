use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\w+").expect("valid regex");
}

/// Tokenize text into normalized terms: NFKC normalization, lowercase,
/// alphanumeric runs. No stopword removal, no stemming, so a query term
/// matches exactly when the same token appears in an indexed document.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|mat| mat.as_str().to_string())
        .collect()
}
