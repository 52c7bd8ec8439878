use crate::types::{Category, PostRecord, ReconciledRecord, ValidationVerdict, MISMATCH_MARKER};
use serde_json::Value;
use std::iter::Peekable;
use std::str::Chars;
use tracing::{debug, warn};

/// Parse the validation model's reply into a verdict.
///
/// Accepts a JSON object, or a mapping literal written with single quotes
/// (`{'Mail': 'Airmail', 'Notes': None}`), optionally surrounded by prose or
/// code fences. The text is only ever tokenized. Anything unparseable is
/// treated as "no verdict" and yields an empty map, as do keys that are not
/// category labels.
pub fn parse_verdict(raw_response: &str) -> ValidationVerdict {
    let mut verdict = ValidationVerdict::new();

    let Some(body) = object_slice(raw_response) else {
        if !raw_response.trim().is_empty() {
            warn!("Validation response contained no mapping, ignoring it");
        }
        return verdict;
    };

    let pairs = match serde_json::from_str::<serde_json::Map<String, Value>>(body) {
        Ok(object) => object
            .into_iter()
            .filter_map(|(key, value)| json_app(value).map(|app| (key, app)))
            .collect(),
        Err(e) => {
            debug!("Verdict is not JSON ({}), trying literal mapping", e);
            match parse_literal_mapping(&body[1..body.len() - 1]) {
                Some(pairs) => pairs,
                None => {
                    warn!("Could not parse validation response, treating as no verdict");
                    return verdict;
                }
            }
        }
    };

    for (key, app) in pairs {
        if let Some(category) = Category::from_label(key.trim()) {
            verdict.insert_first(category, app);
        }
    }

    verdict
}

/// Compare a record against a verdict and mark disputed values.
///
/// Categories missing from the verdict are left as they are. A disputed
/// value becomes `"XXX" + original`. The input record is not modified.
pub fn reconcile(verdict: &ValidationVerdict, record: &PostRecord) -> ReconciledRecord {
    let mut reconciled = record.clone();
    let mut disputed = Vec::new();
    let mut unverified = Vec::new();

    for (category, stored) in record.defaults.iter() {
        let Some(judged) = verdict.get(category) else {
            debug!("No verdict for {} on {}, keeping '{}'", category, record.link, stored);
            unverified.push(category);
            continue;
        };

        if judged.trim() != stored.trim() {
            debug!("{} disputed on {}: stored '{}', verdict '{}'", category, record.link, stored, judged);
            reconciled
                .defaults
                .set(category, format!("{}{}", MISMATCH_MARKER, stored));
            disputed.push(category);
        }
    }

    ReconciledRecord {
        record: reconciled,
        disputed,
        unverified,
    }
}

fn object_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn json_app(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses `'key': 'value', ...` pairs. Bare `None`/`null` values become empty.
fn parse_literal_mapping(body: &str) -> Option<Vec<(String, String)>> {
    let mut chars = body.chars().peekable();
    let mut pairs = Vec::new();

    loop {
        skip_whitespace(&mut chars);
        if chars.peek().is_none() {
            break;
        }

        let key = read_quoted(&mut chars)?;
        skip_whitespace(&mut chars);
        if chars.next()? != ':' {
            return None;
        }
        skip_whitespace(&mut chars);

        let value = match chars.peek()? {
            '\'' | '"' => read_quoted(&mut chars)?,
            _ => {
                let bare: String = chars
                    .by_ref()
                    .take_while(|c| *c != ',')
                    .collect();
                pairs.push((key, bare_value(bare.trim())?));
                continue;
            }
        };
        pairs.push((key, value));

        skip_whitespace(&mut chars);
        match chars.next() {
            Some(',') | None => {}
            Some(_) => return None,
        }
    }

    Some(pairs)
}

fn bare_value(token: &str) -> Option<String> {
    match token {
        "None" | "null" | "" => Some(String::new()),
        _ => None,
    }
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
    let mut out = String::new();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                other => out.push(other),
            },
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }

    None
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}
