//! Timed-text parsing for YouTube caption tracks.
//!
//! The payload looks like
//! `<transcript><text start="0.5" dur="1.2">Hello &amp;amp; welcome</text>...</transcript>`.
//! Text content is escaped twice (once by the XML layer, once as HTML) and may contain
//! formatting tags such as `<font>` or `<i>`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::Fragment;

static TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("valid text element regex")
});

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)="([^"]*)""#).expect("valid attribute regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").expect("valid entity regex")
});

static FORMATTING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Error produced when the caption payload cannot be understood
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid `{attribute}` value {value:?} in caption element")]
pub struct CaptionParseError {
    pub attribute: &'static str,
    pub value: String,
}

/// Parse a timed-text document into fragments, in document order.
///
/// Elements without text content are skipped.
pub fn parse_timed_text(xml: &str) -> Result<Vec<Fragment>, CaptionParseError> {
    let mut fragments = Vec::new();

    for element in TEXT_ELEMENT.captures_iter(xml) {
        let raw_text = match element.get(2) {
            Some(content) if !content.as_str().is_empty() => content.as_str(),
            _ => continue,
        };

        let attributes = element.get(1).map_or("", |m| m.as_str());
        let start = parse_seconds(attributes, "start", None)?;
        let duration = parse_seconds(attributes, "dur", Some(0.0))?;

        fragments.push(Fragment {
            text: clean_text(raw_text),
            start,
            duration,
        });
    }

    Ok(fragments)
}

/// Decode the XML layer, then the HTML layer, then drop formatting tags
pub fn clean_text(raw: &str) -> String {
    let decoded = unescape_entities(&unescape_entities(raw));
    FORMATTING_TAG.replace_all(&decoded, "").into_owned()
}

/// Replace character references and the common named entities.
///
/// Named entities cover the XML set plus Latin-1 letters, punctuation and
/// currency signs seen in captions, not the full HTML table. Unknown entities
/// are left untouched.
pub fn unescape_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let reference = &caps[1];
            decode_reference(reference)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_reference(reference: &str) -> Option<char> {
    if let Some(numeric) = reference.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code);
    }

    let decoded = match reference {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "bull" => '\u{2022}',
        "middot" => '\u{b7}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "deg" => '\u{b0}',
        "sect" => '\u{a7}',
        "para" => '\u{b6}',
        "iexcl" => '\u{a1}',
        "iquest" => '\u{bf}',
        "times" => '\u{d7}',
        "divide" => '\u{f7}',
        "plusmn" => '\u{b1}',
        "frac12" => '\u{bd}',
        "frac14" => '\u{bc}',
        "frac34" => '\u{be}',
        "sup2" => '\u{b2}',
        "sup3" => '\u{b3}',
        "micro" => '\u{b5}',
        "cent" => '\u{a2}',
        "pound" => '\u{a3}',
        "yen" => '\u{a5}',
        "euro" => '\u{20ac}',
        "agrave" => '\u{e0}',
        "aacute" => '\u{e1}',
        "acirc" => '\u{e2}',
        "auml" => '\u{e4}',
        "aring" => '\u{e5}',
        "aelig" => '\u{e6}',
        "ccedil" => '\u{e7}',
        "egrave" => '\u{e8}',
        "eacute" => '\u{e9}',
        "ecirc" => '\u{ea}',
        "euml" => '\u{eb}',
        "igrave" => '\u{ec}',
        "iacute" => '\u{ed}',
        "icirc" => '\u{ee}',
        "iuml" => '\u{ef}',
        "ntilde" => '\u{f1}',
        "ograve" => '\u{f2}',
        "oacute" => '\u{f3}',
        "ocirc" => '\u{f4}',
        "otilde" => '\u{f5}',
        "ouml" => '\u{f6}',
        "oslash" => '\u{f8}',
        "ugrave" => '\u{f9}',
        "uacute" => '\u{fa}',
        "ucirc" => '\u{fb}',
        "uuml" => '\u{fc}',
        "yacute" => '\u{fd}',
        "szlig" => '\u{df}',
        "Agrave" => '\u{c0}',
        "Aacute" => '\u{c1}',
        "Auml" => '\u{c4}',
        "Ccedil" => '\u{c7}',
        "Eacute" => '\u{c9}',
        "Ntilde" => '\u{d1}',
        "Ouml" => '\u{d6}',
        "Uuml" => '\u{dc}',
        _ => return None,
    };
    Some(decoded)
}

fn parse_seconds(
    attributes: &str,
    name: &'static str,
    default: Option<f64>,
) -> Result<f64, CaptionParseError> {
    let value = ATTRIBUTE
        .captures_iter(attributes)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string());

    match (value, default) {
        (Some(value), _) => value.trim().parse().map_err(|_| CaptionParseError {
            attribute: name,
            value,
        }),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(CaptionParseError {
            attribute: name,
            value: String::new(),
        }),
    }
}
