//! Placeholder tokens in cell text and hyperlink targets.
//!
//! Two forms are recognized: `${path}` for a value and `${table:path}` for
//! a row-repeating table column. Anything that does not parse cleanly
//! (`${`, `${}`, `${table:}`, `${image:logo}`) is ordinary text.

use std::ops::Range;

use crate::context::Path;

/// What a placeholder asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    Value,
    Table,
}

/// One recognized token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder {
    /// Byte range of the whole `${...}` token in the source text.
    pub(crate) span: Range<usize>,
    pub(crate) directive: Directive,
    pub(crate) path: Path,
    /// The token is the entire text, nothing before or after it.
    pub(crate) full: bool,
}

/// Find every placeholder in `text`, left to right.
pub(crate) fn parse(text: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find("${") {
        let start = pos + offset;
        let body_start = start + 2;
        let Some(close) = text[body_start..].find('}') else {
            break;
        };
        let body_end = body_start + close;
        let body = &text[body_start..body_end];

        // `${a ${b}`: the inner token is the real one.
        if let Some(inner) = body.rfind("${") {
            pos = body_start + inner;
            continue;
        }

        let end = body_end + 1;
        if let Some((directive, path)) = parse_body(body) {
            found.push(Placeholder {
                span: start..end,
                directive,
                path,
                full: start == 0 && end == text.len(),
            });
        }
        pos = end;
    }

    found
}

fn parse_body(body: &str) -> Option<(Directive, Path)> {
    match body.split_once(':') {
        Some((prefix, path)) if prefix.trim() == "table" => {
            Some((Directive::Table, Path::parse(path)?))
        }
        Some(_) => None,
        None => Some((Directive::Value, Path::parse(body)?)),
    }
}

/// Rebuild `text` with each placeholder replaced by `render`'s output.
///
/// A `None` from `render` leaves that token's text as it was.
pub(crate) fn interpolate<F>(text: &str, placeholders: &[Placeholder], mut render: F) -> String
where
    F: FnMut(&Placeholder) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for placeholder in placeholders {
        out.push_str(&text[pos..placeholder.span.start]);
        match render(placeholder) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&text[placeholder.span.clone()]),
        }
        pos = placeholder.span.end;
    }
    out.push_str(&text[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(text: &str) -> Vec<String> {
        parse(text).iter().map(|p| p.path.to_string()).collect()
    }

    // ── parse ────────────────────────────────────────────────────

    #[test]
    fn full_value_token() {
        let found = parse("${revision}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].directive, Directive::Value);
        assert!(found[0].full);
        assert_eq!(found[0].span, 0..11);
    }

    #[test]
    fn full_table_token() {
        let found = parse("${table:planData.role.name}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].directive, Directive::Table);
        assert_eq!(found[0].path.to_string(), "planData.role.name");
        assert!(found[0].full);
    }

    #[test]
    fn partial_tokens() {
        let found = parse("Extracted on ${demo.extractDate}");
        assert_eq!(found.len(), 1);
        assert!(!found[0].full);
        assert_eq!(paths("${a} and ${b.c}"), ["a", "b.c"]);
    }

    #[test]
    fn whitespace_is_trimmed() {
        let found = parse("${ revision }");
        assert_eq!(found[0].path.to_string(), "revision");
        assert!(found[0].full);
    }

    #[test]
    fn surrounding_whitespace_is_not_full() {
        assert!(!parse(" ${revision}")[0].full);
    }

    #[test]
    fn malformed_tokens_are_literal() {
        for text in ["${", "${}", "${table:}", "${image:logo}", "$ {a}", "{a}", "${a..b}"] {
            assert!(parse(text).is_empty(), "{text:?}");
        }
    }

    #[test]
    fn nested_opener_uses_inner_token() {
        assert_eq!(paths("${a ${b}"), ["b"]);
    }

    #[test]
    fn indexed_paths() {
        assert_eq!(paths("${data[1].name}"), ["data[1].name"]);
    }

    // ── interpolate ──────────────────────────────────────────────

    #[test]
    fn interpolate_replaces_in_order() {
        let text = "Hi ${a}, meet ${b}!";
        let found = parse(text);
        let out = interpolate(text, &found, |p| Some(p.path.to_string().to_uppercase()));
        assert_eq!(out, "Hi A, meet B!");
    }

    #[test]
    fn interpolate_keeps_unrendered() {
        let text = "mailto:${to}?subject=${subject}";
        let found = parse(text);
        let out = interpolate(text, &found, |p| {
            (p.path.to_string() == "to").then(|| "x@y.z".to_string())
        });
        assert_eq!(out, "mailto:x@y.z?subject=${subject}");
    }

    #[test]
    fn interpolate_keeps_literals() {
        let text = "${} and ${x}";
        let found = parse(text);
        assert_eq!(interpolate(text, &found, |_| Some(String::new())), "${} and ");
    }
}
