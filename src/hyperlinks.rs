//! Placeholder substitution in hyperlink targets.
//!
//! External hyperlinks live in the sheet's relationship part, percent-encoded,
//! so `${path}` usually appears as `$%7Bpath%7D`. Tokens are found in the
//! decoded target; only the substituted values are encoded, the way a
//! browser's `encodeURI` would. Everything else is copied from the stored
//! target byte for byte. Inside the query of a `mailto:` link values are
//! encoded as URI components, so a subject containing `&` or `=` stays one
//! parameter.

use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::context::ContextValue;
use crate::placeholder::{self, Directive};
use crate::xml_util::Relationships;

/// Escaped by `encodeURIComponent`: all but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escaped by `encodeURI`: the component set minus the URI delimiters.
const URI: &AsciiSet = &URI_COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

fn encode(text: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(text, set).to_string()
}

/// Percent-decode `raw`, recording for every decoded byte the offset of
/// the raw text it came from (plus one trailing entry for the end).
///
/// `None` when the decoded bytes are not UTF-8.
fn decode_mapped(raw: &str) -> Option<(String, Vec<usize>)> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut origin = Vec::with_capacity(bytes.len() + 1);
    let mut i = 0;
    while i < bytes.len() {
        let escape = bytes[i] == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        let width = if escape { 3 } else { 1 };
        origin.push(i);
        decoded.extend(percent_decode(&bytes[i..i + width]));
        i += width;
    }
    origin.push(bytes.len());
    String::from_utf8(decoded).ok().map(|text| (text, origin))
}

/// Substitute placeholders in one hyperlink target.
///
/// Returns `None` when the target has no placeholder that resolves, in
/// which case it should be left exactly as it was.
pub(crate) fn substitute_target(target: &str, context: &ContextValue) -> Option<String> {
    let Some((decoded, origin)) = decode_mapped(target) else {
        debug!(%target, "hyperlink target is not UTF-8 once decoded, leaving it");
        return None;
    };
    let found = placeholder::parse(&decoded);
    if found.is_empty() {
        return None;
    }
    let raw = |span: std::ops::Range<usize>| &target[origin[span.start]..origin[span.end]];

    let query_start = decoded
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
        .then(|| decoded.find('?'))
        .flatten();

    let mut resolved = 0;
    let mut out = String::with_capacity(target.len());
    let mut pos = 0;
    for token in &found {
        out.push_str(raw(pos..token.span.start));
        let text = match token.directive {
            Directive::Value => context.resolve(&token.path).map(ContextValue::to_text),
            Directive::Table => {
                debug!(path = %token.path, "table placeholder in hyperlink, dropping it");
                Some(String::new())
            }
        };
        match text {
            Some(text) => {
                resolved += 1;
                let set = match query_start {
                    Some(q) if token.span.start > q => URI_COMPONENT,
                    _ => URI,
                };
                out.push_str(&encode(&text, set));
            }
            None => {
                debug!(path = %token.path, "unresolved placeholder in hyperlink");
                out.push_str(raw(token.span.clone()));
            }
        }
        pos = token.span.end;
    }
    out.push_str(raw(pos..decoded.len()));

    (resolved > 0).then_some(out)
}

/// Rewrite every hyperlink relationship in `rels`. Returns how many changed.
pub(crate) fn substitute_all(rels: &mut Relationships, context: &ContextValue) -> usize {
    let rewrites: Vec<(String, String)> = rels
        .iter()
        .filter(|rel| rel.is("hyperlink"))
        .filter_map(|rel| {
            let target = substitute_target(rel.target, context)?;
            (target != rel.target).then(|| (rel.id.to_string(), target))
        })
        .collect();

    for (id, target) in &rewrites {
        debug!(%id, %target, "hyperlink target rewritten");
        rels.set_target(id, target);
    }
    rewrites.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ContextValue {
        ContextValue::record([
            ("email", ContextValue::from("john@bob.com")),
            ("subject", ContextValue::from("hello")),
            ("url", ContextValue::from("http://www.google.com")),
            ("query", ContextValue::from("a&b=c d")),
            ("tags", ContextValue::list(["x", "y"])),
        ])
    }

    // ── substitute_target ────────────────────────────────────────

    #[test]
    fn whole_target() {
        assert_eq!(
            substitute_target("$%7Burl%7D", &context()).as_deref(),
            Some("http://www.google.com")
        );
    }

    #[test]
    fn mailto_with_encoded_literal() {
        assert_eq!(
            substitute_target("mailto:$%7Bemail%7D?subject=Hello%20$%7Bsubject%7D", &context())
                .as_deref(),
            Some("mailto:john@bob.com?subject=Hello%20hello")
        );
    }

    #[test]
    fn mailto_query_uses_component_encoding() {
        assert_eq!(
            substitute_target("mailto:${email}?subject=${query}", &context()).as_deref(),
            Some("mailto:john@bob.com?subject=a%26b%3Dc%20d")
        );
    }

    #[test]
    fn path_uses_uri_encoding() {
        assert_eq!(
            substitute_target("https://example.com/${query}", &context()).as_deref(),
            Some("https://example.com/a&b=c%20d")
        );
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_target("https://example.com/a%20b", &context()), None);
    }

    #[test]
    fn unresolved_only() {
        assert_eq!(substitute_target("https://x.test/${missing}", &context()), None);
    }

    #[test]
    fn unresolved_kept_beside_resolved() {
        assert_eq!(
            substitute_target("https://x.test/${missing}/${subject}", &context()).as_deref(),
            Some("https://x.test/${missing}/hello")
        );
        assert_eq!(
            substitute_target("https://x.test/$%7Bmissing%7D/$%7Bsubject%7D", &context()).as_deref(),
            Some("https://x.test/$%7Bmissing%7D/hello")
        );
    }

    #[test]
    fn literal_escapes_are_kept() {
        assert_eq!(
            substitute_target("https://x.test/a%2Fb%20c/$%7Bsubject%7D?q=%26", &context()).as_deref(),
            Some("https://x.test/a%2Fb%20c/hello?q=%26")
        );
    }

    #[test]
    fn non_utf8_target_is_left_alone() {
        assert_eq!(substitute_target("https://x.test/%FF/$%7Bsubject%7D", &context()), None);
    }

    #[test]
    fn stray_percent_is_literal() {
        assert_eq!(
            substitute_target("https://x.test/100%/${subject}%zz", &context()).as_deref(),
            Some("https://x.test/100%/hello%zz")
        );
    }

    #[test]
    fn lists_and_tables_give_empty_text() {
        assert_eq!(
            substitute_target("https://x.test/${tags}${table:tags}", &context()).as_deref(),
            Some("https://x.test/")
        );
    }

    // ── substitute_all ───────────────────────────────────────────

    #[test]
    fn rewrites_hyperlink_relationships_only() {
        let mut rels = Relationships::parse(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="mailto:$%7Bemail%7D" TargetMode="External"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/$%7Burl%7D.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/></Relationships>"#,
        )
        .unwrap();
        assert_eq!(substitute_all(&mut rels, &context()), 1);
        assert_eq!(rels.get("rId1").unwrap().target, "mailto:john@bob.com");
        assert_eq!(rels.get("rId2").unwrap().target, "../tables/$%7Burl%7D.xml");
        assert_eq!(rels.get("rId3").unwrap().target, "https://example.com");
    }
}
