//! URL templating.
//!
//! Path parameters are written `:name` or `{name}` and are substituted from
//! [`Params`]; query parameters are appended form-encoded.

use crate::{Error, Result};
use std::collections::BTreeMap;
use url::form_urlencoded;
use url::Url;

/// Path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    /// Substituted by name.
    Named(BTreeMap<String, String>),
    /// Substituted into `:name` / `{name}` placeholders from left to right.
    Positional(Vec<String>),
}

impl Params {
    /// Builds named params from key/value pairs.
    pub fn named<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.to_string()))
                .collect(),
        )
    }

    pub(crate) fn to_value(&self) -> serde_json::Value {
        match self {
            Params::Named(map) => serde_json::json!(map),
            Params::Positional(list) => serde_json::json!(list),
        }
    }

    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self> {
        let invalid = || Error::ConfigurationError("params must be strings".to_string());
        match value {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| scalar(value).map(|value| (key, value)).ok_or_else(invalid))
                .collect::<Result<_>>()
                .map(Params::Named),
            serde_json::Value::Array(list) => list
                .into_iter()
                .map(|value| scalar(value).ok_or_else(invalid))
                .collect::<Result<_>>()
                .map(Params::Positional),
            _ => Err(invalid()),
        }
    }
}

fn scalar(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Substitutes `params` into `url` and appends `query`.
///
/// Placeholders without a matching parameter are left as they are.
///
/// # Examples
///
/// ```
/// use callhook::url::{apply_params, Params};
///
/// let url = apply_params(
///     "/widgets/:id/parts/{part}",
///     Some(&Params::named([("id", 42), ("part", 7)])),
///     &[("expand".to_string(), "owner name".to_string())],
/// );
/// assert_eq!(url, "/widgets/42/parts/7?expand=owner+name");
///
/// let url = apply_params(
///     "/users/:user/posts/:post",
///     Some(&Params::Positional(vec!["ana".into(), "9".into()])),
///     &[],
/// );
/// assert_eq!(url, "/users/ana/posts/9");
/// ```
pub fn apply_params(url: &str, params: Option<&Params>, query: &[(String, String)]) -> String {
    let (path, existing_query) = match url.split_once('?') {
        Some((path, existing)) => (path, Some(existing)),
        None => (url, None),
    };

    let positional_values: &[String] = match params {
        Some(Params::Positional(values)) => values,
        _ => &[],
    };
    let mut positional = positional_values.iter();

    let substituted: Vec<String> = path
        .split('/')
        .map(|segment| {
            let Some(name) = placeholder(segment) else {
                return segment.to_string();
            };
            let value = match params {
                Some(Params::Named(map)) => map.get(name).cloned(),
                Some(Params::Positional(_)) => positional.next().cloned(),
                None => None,
            };
            value
                .map(|value| encode_segment(&value))
                .unwrap_or_else(|| segment.to_string())
        })
        .collect();
    let mut resolved = substituted.join("/");

    let mut pairs = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        pairs.append_pair(key, value);
    }
    let encoded = pairs.finish();

    match (existing_query, encoded.is_empty()) {
        (Some(existing), true) => {
            resolved.push('?');
            resolved.push_str(existing);
        }
        (Some(existing), false) => {
            resolved.push('?');
            resolved.push_str(existing);
            resolved.push('&');
            resolved.push_str(&encoded);
        }
        (None, false) => {
            resolved.push('?');
            resolved.push_str(&encoded);
        }
        (None, true) => {}
    }
    resolved
}

// Literal '+' is emitted as %2B, so any remaining '+' stands for a space.
fn encode_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn placeholder(segment: &str) -> Option<&str> {
    if let Some(name) = segment.strip_prefix(':') {
        return (!name.is_empty()).then_some(name);
    }
    segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Joins `url` onto `base_url`. Absolute URLs are returned unchanged.
///
/// # Errors
///
/// Returns an error if the resulting URL does not parse.
///
/// # Examples
///
/// ```
/// use callhook::url::resolve_full_url;
///
/// assert_eq!(
///     resolve_full_url(Some("https://api.example.com/v1"), "/widgets/42").unwrap(),
///     "https://api.example.com/v1/widgets/42"
/// );
/// assert_eq!(
///     resolve_full_url(Some("https://api.example.com"), "https://other.example.com/x").unwrap(),
///     "https://other.example.com/x"
/// );
/// ```
pub fn resolve_full_url(base_url: Option<&str>, url: &str) -> Result<String> {
    if Url::parse(url).is_ok() {
        return Ok(url.to_string());
    }
    let base = base_url.ok_or_else(|| {
        Error::ConfigurationError(format!("Relative URL '{}' requires a base URL", url))
    })?;

    let joined = match (base.ends_with('/'), url.starts_with('/')) {
        (true, true) => format!("{}{}", base, &url[1..]),
        (false, false) if !url.is_empty() && !url.starts_with('?') => format!("{}/{}", base, url),
        _ => format!("{}{}", base, url),
    };
    Url::parse(&joined)?;
    Ok(joined)
}
