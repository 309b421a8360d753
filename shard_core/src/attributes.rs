use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#).unwrap_or_else(|e| panic!("invalid attribute regex: {e}"))
});

/// Extract `key="value"` pairs from the inside of an opening tag such as
/// `<card title="Hi" lang="en">`. Only double-quoted values are recognized.
/// When a key repeats, the last value wins.
pub fn extract_attributes(tag: &str) -> BTreeMap<String, String> {
	ATTRIBUTE
		.captures_iter(tag)
		.map(|captures| (captures[1].to_string(), captures[2].to_string()))
		.collect()
}
