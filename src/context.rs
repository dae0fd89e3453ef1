//! Data context: the values placeholders resolve against.
//!
//! A [`ContextValue`] is a tagged tree built once, usually from JSON.
//! Placeholder paths (`planData[0].role.name`, `items.0.name`) are parsed
//! into [`Path`]s and walked segment by segment.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::dateconv;

/// A value in the data context.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContextValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    List(Vec<ContextValue>),
    Record(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Build a record from key/value pairs.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list from anything convertible.
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Self>,
        I: IntoIterator<Item = V>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Convert JSON, turning ISO-8601 date strings into [`ContextValue::Date`].
    ///
    /// Recognized forms: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` (optionally with
    /// fractional seconds) and RFC 3339 timestamps, whose wall-clock time is
    /// kept as written.
    pub fn from_json_with_dates(value: serde_json::Value) -> Self {
        from_json(value, true)
    }

    /// Walk `path` from this value. `None` when any segment is missing.
    pub fn resolve(&self, path: &Path) -> Option<&Self> {
        path.segments
            .iter()
            .try_fold(self, |current, segment| current.child(segment))
    }

    fn child(&self, segment: &Segment) -> Option<&Self> {
        match (self, segment) {
            (Self::Record(fields), Segment::Key(key)) => fields.get(key),
            (Self::List(items), Segment::Key(key)) => items.get(key.parse::<usize>().ok()?),
            (Self::List(items), Segment::Index(i)) => items.get(*i),
            (Self::Record(fields), Segment::Index(i)) => fields.get(&i.to_string()),
            _ => None,
        }
    }

    /// Split a table path at the shortest prefix that names a list.
    ///
    /// Returns the list items and the remaining field path, or `None` if no
    /// prefix resolves to a list.
    pub fn find_list<'a>(&'a self, path: &Path) -> Option<(&'a [Self], Path)> {
        let mut current = self;
        for (i, segment) in path.segments.iter().enumerate() {
            current = current.child(segment)?;
            if let Self::List(items) = current {
                let rest = Path {
                    segments: path.segments[i + 1..].to_vec(),
                };
                return Some((items.as_slice(), rest));
            }
        }
        None
    }

    /// Text used when a value is spliced into longer text.
    ///
    /// Dates become their serial number, booleans `1`/`0`; lists, records
    /// and nulls contribute nothing.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => dateconv::format_number(*n),
            Self::Date(d) => dateconv::format_number(dateconv::date_to_serial(*d)),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Null | Self::List(_) | Self::Record(_) => String::new(),
        }
    }
}

// ── Conversions ────────────────────────────────────────────────────

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for ContextValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for ContextValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        #[allow(clippy::cast_precision_loss)] // spreadsheet numbers are doubles
        Self::Number(n as f64)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDateTime> for ContextValue {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDate> for ContextValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Self>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for ContextValue {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        from_json(value, false)
    }
}

fn from_json(value: serde_json::Value, dates: bool) -> ContextValue {
    use serde_json::Value;
    match value {
        Value::Null => ContextValue::Null,
        Value::Bool(b) => ContextValue::Bool(b),
        Value::Number(n) => n.as_f64().map_or(ContextValue::Null, ContextValue::Number),
        Value::String(s) => match dates.then(|| parse_date(&s)).flatten() {
            Some(date) => ContextValue::Date(date),
            None => ContextValue::Text(s),
        },
        Value::Array(items) => {
            ContextValue::List(items.into_iter().map(|v| from_json(v, dates)).collect())
        }
        Value::Object(fields) => ContextValue::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k, from_json(v, dates)))
                .collect(),
        ),
    }
}

/// Parse an ISO-8601 date or date-time string.
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(chrono::NaiveTime::MIN));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_local())
}

// ── Paths ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed placeholder path such as `data[1].name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse a dotted path with optional `[n]` indices.
    ///
    /// Returns `None` for empty paths, empty segments (`a..b`), and
    /// unbalanced or non-numeric brackets.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let mut segments = Vec::new();
        for part in s.split('.') {
            let (key, mut brackets) = match part.find('[') {
                Some(i) => part.split_at(i),
                None => (part, ""),
            };
            let key = key.trim();
            if key.is_empty() && brackets.is_empty() {
                return None;
            }
            if key.contains(|c: char| matches!(c, ']' | '{' | '}' | '$' | ':')) {
                return None;
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            } else if segments.is_empty() {
                // A path may not start with an index.
                return None;
            }
            while !brackets.is_empty() {
                let inner = brackets.strip_prefix('[')?;
                let (index, rest) = inner.split_once(']')?;
                segments.push(Segment::Index(index.trim().parse().ok()?));
                brackets = rest;
            }
        }
        Some(Self { segments })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn sample() -> ContextValue {
        ContextValue::from(json!({
            "revision": 10,
            "demo": { "extractDate": "2013-01-02" },
            "data": ["First row", { "name": "B" }],
            "planData": [
                { "name": "John", "role": { "name": "Developer" }, "days": [8, 8, 4] }
            ],
            "flag": true,
            "nothing": null
        }))
    }

    // ── Path::parse ──────────────────────────────────────────────

    #[test]
    fn parse_dotted_and_indexed() {
        assert_eq!(path("data[1].name").to_string(), "data[1].name");
        assert_eq!(path(" planData.role.name ").to_string(), "planData.role.name");
        assert_eq!(path("m[0][2]").to_string(), "m[0][2]");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "  ", "a..b", ".a", "a.", "a[", "a[x]", "a]", "[0]", "a[1", "a${b"] {
            assert_eq!(Path::parse(bad), None, "{bad:?}");
        }
    }

    // ── resolve ──────────────────────────────────────────────────

    #[test]
    fn resolve_scalars() {
        let ctx = sample();
        assert_eq!(ctx.resolve(&path("revision")), Some(&ContextValue::Number(10.0)));
        assert_eq!(
            ctx.resolve(&path("planData[0].role.name")),
            Some(&ContextValue::from("Developer"))
        );
    }

    #[test]
    fn resolve_numeric_key_as_index() {
        let ctx = sample();
        assert_eq!(ctx.resolve(&path("data.0")), Some(&ContextValue::from("First row")));
        assert_eq!(ctx.resolve(&path("data[1].name")), Some(&ContextValue::from("B")));
    }

    #[test]
    fn resolve_missing() {
        let ctx = sample();
        assert_eq!(ctx.resolve(&path("missing")), None);
        assert_eq!(ctx.resolve(&path("revision.x")), None);
        assert_eq!(ctx.resolve(&path("data[9]")), None);
        assert_eq!(ctx.resolve(&path("nothing")), Some(&ContextValue::Null));
    }

    // ── find_list ────────────────────────────────────────────────

    #[test]
    fn find_list_shortest_prefix() {
        let ctx = sample();
        let (items, rest) = ctx.find_list(&path("planData.role.name")).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(rest.to_string(), "role.name");
    }

    #[test]
    fn find_list_whole_path() {
        let ctx = sample();
        let (items, rest) = ctx.find_list(&path("planData")).unwrap();
        assert_eq!(items.len(), 1);
        assert!(rest.is_empty());
    }

    #[test]
    fn find_list_none() {
        let ctx = sample();
        assert!(ctx.find_list(&path("demo.extractDate")).is_none());
        assert!(ctx.find_list(&path("nope.x")).is_none());
    }

    // ── to_text ──────────────────────────────────────────────────

    #[test]
    fn to_text_forms() {
        let date = NaiveDate::from_ymd_opt(2013, 1, 2).unwrap();
        assert_eq!(ContextValue::from(date).to_text(), "41276");
        assert_eq!(ContextValue::from(10).to_text(), "10");
        assert_eq!(ContextValue::from(2.5).to_text(), "2.5");
        assert_eq!(ContextValue::from(true).to_text(), "1");
        assert_eq!(ContextValue::Null.to_text(), "");
        assert_eq!(ContextValue::list([1, 2]).to_text(), "");
    }

    // ── JSON ─────────────────────────────────────────────────────

    #[test]
    fn json_without_dates_keeps_text() {
        let ctx = sample();
        assert_eq!(
            ctx.resolve(&path("demo.extractDate")),
            Some(&ContextValue::from("2013-01-02"))
        );
    }

    #[test]
    fn json_with_dates() {
        let ctx = ContextValue::from_json_with_dates(json!({
            "d": "2013-01-02",
            "dt": "2024-01-01T12:00:00",
            "tz": "2024-01-01T06:00:00+02:00",
            "text": "2013-13-45"
        }));
        let day = NaiveDate::from_ymd_opt(2013, 1, 2).unwrap();
        assert_eq!(ctx.resolve(&path("d")), Some(&ContextValue::from(day)));
        let noon = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(ctx.resolve(&path("dt")), Some(&ContextValue::from(noon)));
        let six = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
        assert_eq!(ctx.resolve(&path("tz")), Some(&ContextValue::from(six)));
        assert_eq!(ctx.resolve(&path("text")), Some(&ContextValue::from("2013-13-45")));
    }

    #[test]
    fn record_builder() {
        let ctx = ContextValue::record([("a", ContextValue::from(1)), ("b", "x".into())]);
        assert_eq!(ctx.resolve(&path("b")), Some(&ContextValue::from("x")));
    }
}
