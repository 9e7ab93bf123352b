use once_cell::sync::Lazy;
use regex::Regex;

static STAMP_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]{2}\s+\d{1,2}\s+\d{4}$").expect("stamp date pattern"));
static ALL_CAPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z\s'&-]+$").expect("all caps pattern"));

const ALL_CAPS_MAX: usize = 40;
const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "data:", "vbscript:"];

/// Government receipt stamps date a page as `Jan 5 2026`.
pub fn is_stamp_date(text: &str) -> bool {
    STAMP_DATE.is_match(text)
}

/// Short upper-case lines such as agency names printed inside a stamp.
pub fn is_all_caps_short(text: &str) -> bool {
    ALL_CAPS.is_match(text) && text.chars().count() <= ALL_CAPS_MAX
}

pub fn is_safe_url(url: &str) -> bool {
    let trimmed = url.trim().to_lowercase();
    if trimmed.is_empty() {
        return false;
    }
    if BLOCKED_SCHEMES
        .iter()
        .any(|scheme| trimmed.starts_with(scheme))
    {
        return false;
    }
    trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with('/')
        || !trimmed.contains(':')
}
