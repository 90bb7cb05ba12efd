//! Document query model
//!
//! A [`QuerySpec`] is the single representation every query form compiles
//! to. A query-language string is parsed into one ([`QuerySpec::parse_sql`]),
//! a declarative [`Filter`] is wrapped in one ([`QuerySpec::filtered`]),
//! and the functional form builds one from closures over a [`Doc`] accessor
//! ([`QuerySpec::filter_by`], [`QuerySpec::select_with`]). Backends only ever
//! see a `QuerySpec`: the memory backend evaluates it directly and the Azure
//! backend renders it back to parameterized SQL with [`QuerySpec::to_sql`].

mod sql;

pub use sql::{SqlParameter, SqlQuery};

use crate::error::Result;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Dotted path to a field inside a document (e.g. `address.city`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Name a projected value is stored under
    pub fn last(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Walk `doc` along the path; `None` if any segment is missing
    pub fn resolve<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(doc, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Operator with its operands swapped (`1 < f.grade` is `f.grade > 1`)
    pub fn flipped(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    /// `None` when the operands do not order against each other
    fn holds(self, lhs: &Value, rhs: &Value) -> Option<bool> {
        match self {
            CompareOp::Eq => Some(values_equal(lhs, rhs)),
            CompareOp::Ne => Some(!values_equal(lhs, rhs)),
            _ => {
                let ordering = compare_values(lhs, rhs)?;
                Some(match (ordering, self) {
                    (Ordering::Less, CompareOp::Lt | CompareOp::Le) => true,
                    (Ordering::Equal, CompareOp::Le | CompareOp::Ge) => true,
                    (Ordering::Greater, CompareOp::Gt | CompareOp::Ge) => true,
                    _ => false,
                })
            }
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

/// Ordering between two values of the same kind; mixed kinds do not compare
fn compare_values(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Declarative filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    All,
    Compare {
        path: FieldPath,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(path: impl Into<FieldPath>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Eq, value)
    }

    pub fn ne(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Ne, value)
    }

    pub fn lt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Lt, value)
    }

    pub fn le(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Le, value)
    }

    pub fn gt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Gt, value)
    }

    pub fn ge(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Ge, value)
    }

    /// Conjunction, flattening nested `And`s and dropping `All`
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (f, Filter::And(mut b)) => {
                b.insert(0, f);
                Filter::And(b)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Disjunction, flattening nested `Or`s
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, _) | (_, Filter::All) => Filter::All,
            (Filter::Or(mut a), Filter::Or(b)) => {
                a.extend(b);
                Filter::Or(a)
            }
            (Filter::Or(mut a), f) => {
                a.push(f);
                Filter::Or(a)
            }
            (f, Filter::Or(mut b)) => {
                b.insert(0, f);
                Filter::Or(b)
            }
            (a, b) => Filter::Or(vec![a, b]),
        }
    }

    /// Whether `doc` satisfies the filter. A comparison against a missing
    /// field never matches, whatever the operator, even under `NOT`.
    pub fn matches(&self, doc: &Value) -> bool {
        self.eval(doc) == Some(true)
    }

    /// Three-valued result: `None` is undefined, as for a missing field
    fn eval(&self, doc: &Value) -> Option<bool> {
        match self {
            Filter::All => Some(true),
            Filter::Compare { path, op, value } => op.holds(path.resolve(doc)?, value),
            Filter::And(filters) => {
                let results: Vec<Option<bool>> = filters.iter().map(|f| f.eval(doc)).collect();
                if results.contains(&Some(false)) {
                    Some(false)
                } else if results.contains(&None) {
                    None
                } else {
                    Some(true)
                }
            }
            Filter::Or(filters) => {
                let results: Vec<Option<bool>> = filters.iter().map(|f| f.eval(doc)).collect();
                if results.contains(&Some(true)) {
                    Some(true)
                } else if results.contains(&None) {
                    None
                } else {
                    Some(false)
                }
            }
            Filter::Not(inner) => inner.eval(doc).map(|matched| !matched),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        match self {
            Filter::Not(inner) => *inner,
            f => Filter::Not(Box::new(f)),
        }
    }
}

/// Which parts of a matching document are returned
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projection {
    /// The whole document (`SELECT *`)
    #[default]
    All,
    /// Selected fields, each keyed by the last segment of its path
    Fields(Vec<FieldPath>),
}

impl Projection {
    pub fn apply(&self, doc: &Value) -> Value {
        match self {
            Projection::All => doc.clone(),
            Projection::Fields(paths) => {
                let mut out = Map::new();
                for path in paths {
                    if let Some(value) = path.resolve(doc) {
                        out.insert(path.last().to_string(), value.clone());
                    }
                }
                Value::Object(out)
            }
        }
    }
}

/// Field accessor handed to the functional query closures
#[derive(Debug, Clone, Copy, Default)]
pub struct Doc;

impl Doc {
    pub fn field(&self, path: &str) -> Field {
        Field(FieldPath::parse(path))
    }

    pub fn id(&self) -> Field {
        self.field("id")
    }

    /// Project the whole document
    pub fn whole(&self) -> Projection {
        Projection::All
    }

    /// Project only the given fields
    pub fn pick(&self, fields: impl IntoIterator<Item = Field>) -> Projection {
        Projection::Fields(fields.into_iter().map(|f| f.0).collect())
    }
}

/// A document field reached through [`Doc`]
#[derive(Debug, Clone, PartialEq)]
pub struct Field(FieldPath);

impl Field {
    pub fn field(self, segment: &str) -> Field {
        let mut segments = self.0.0;
        segments.push(segment.to_string());
        Field(FieldPath::new(segments))
    }

    pub fn eq(self, value: impl Into<Value>) -> Filter {
        Filter::compare(self.0, CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        Filter::compare(self.0, CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        Filter::compare(self.0, CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Filter {
        Filter::compare(self.0, CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        Filter::compare(self.0, CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Filter {
        Filter::compare(self.0, CompareOp::Ge, value)
    }
}

/// A read query over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub projection: Projection,
    pub filter: Filter,
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl QuerySpec {
    /// Every document, whole
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document matching `filter`, whole
    pub fn filtered(filter: Filter) -> Self {
        Self {
            projection: Projection::All,
            filter,
        }
    }

    /// Parse a query-language string (`SELECT * FROM Families f WHERE f.id = "x"`)
    pub fn parse_sql(query: &str) -> Result<Self> {
        sql::parse(query)
    }

    /// Narrow the query with a filter built from a document accessor
    pub fn filter_by(mut self, build: impl FnOnce(&Doc) -> Filter) -> Self {
        let filter = std::mem::take(&mut self.filter);
        self.filter = filter.and(build(&Doc));
        self
    }

    /// Replace the projection with one built from a document accessor
    pub fn select_with(mut self, build: impl FnOnce(&Doc) -> Projection) -> Self {
        self.projection = build(&Doc);
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.filter.matches(doc)
    }

    /// Filter then project, preserving input order
    pub fn evaluate<'a>(&self, docs: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
        docs.into_iter()
            .filter(|doc| self.matches(doc))
            .map(|doc| self.projection.apply(doc))
            .collect()
    }

    /// Render as a parameterized query against `alias`
    pub fn to_sql(&self, alias: &str) -> SqlQuery {
        sql::render(self, alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn petkovi() -> Value {
        json!({
            "id": "FamilyPetkovi",
            "lastName": "Petkov",
            "address": { "county": "Bulgaria", "city": "Sofia" },
            "children": [
                { "firstName": "George", "grade": 6, "pets": [] },
                { "firstName": "Antonia", "grade": 3, "pets": [{ "givenName": "Rio" }] }
            ],
            "isRegistered": true
        })
    }

    fn ivanovi() -> Value {
        json!({
            "id": "FamilyIvanovi",
            "lastName": "Ivanov",
            "address": { "county": "Englnd", "city": "Coventry" },
            "children": [{ "firstName": "Alexandra", "grade": 9 }],
            "isRegistered": true
        })
    }

    #[test]
    fn test_field_path_resolve() {
        let doc = petkovi();
        assert_eq!(FieldPath::parse("address.city").resolve(&doc), Some(&json!("Sofia")));
        assert_eq!(
            FieldPath::parse("children.1.pets.0.givenName").resolve(&doc),
            Some(&json!("Rio"))
        );
        assert_eq!(FieldPath::parse("address.street").resolve(&doc), None);
        assert_eq!(FieldPath::parse("lastName.length").resolve(&doc), None);
    }

    #[test]
    fn test_filter_eq_selects_only_matching() {
        let docs = [petkovi(), ivanovi()];
        let spec = QuerySpec::filtered(Filter::eq("id", "FamilyPetkovi"));

        let result = spec.evaluate(&docs);
        assert_eq!(result, vec![petkovi()]);
    }

    #[test]
    fn test_missing_field_never_matches() {
        let doc = petkovi();
        assert!(!Filter::eq("nickname", "x").matches(&doc));
        assert!(!Filter::ne("nickname", "x").matches(&doc));
        assert!(!Filter::lt("nickname", 1).matches(&doc));
    }

    #[test]
    fn test_not_over_missing_field_does_not_match() {
        let doc = json!({ "id": "FamilyPetkovi" });
        assert!(!(!Filter::eq("nickname", "x")).matches(&doc));
        assert!(!(!Filter::lt("id", 1)).matches(&doc));

        let spec = QuerySpec::parse_sql("SELECT * FROM c WHERE NOT c.nickname = 'x'").unwrap();
        assert!(spec.evaluate([&doc]).is_empty());
    }

    #[test]
    fn test_undefined_inside_and_or() {
        let doc = petkovi();
        let missing = Filter::eq("nickname", "x");
        let sofia = Filter::eq("address.city", "Sofia");
        let ivanov = Filter::eq("lastName", "Ivanov");

        // true OR undefined is true, false AND undefined is false
        assert!(sofia.clone().or(missing.clone()).matches(&doc));
        assert!((!ivanov.clone().and(missing.clone())).matches(&doc));
        // true AND undefined stays undefined, so its negation does not match
        assert!(!(!sofia.clone().and(missing.clone())).matches(&doc));
        assert!(!(!ivanov.or(missing)).matches(&doc));
    }

    #[test]
    fn test_numeric_comparisons() {
        let doc = json!({ "grade": 6 });
        assert!(Filter::eq("grade", 6.0).matches(&doc));
        assert!(Filter::gt("grade", 5).matches(&doc));
        assert!(Filter::ge("grade", 6).matches(&doc));
        assert!(!Filter::lt("grade", 6).matches(&doc));
        assert!(Filter::le("grade", 6).matches(&doc));
        // mixed kinds never order
        assert!(!Filter::lt("grade", "7").matches(&doc));
    }

    #[test]
    fn test_and_or_not() {
        let doc = petkovi();
        let sofia = Filter::eq("address.city", "Sofia");
        let ivanov = Filter::eq("lastName", "Ivanov");

        assert!(!sofia.clone().and(ivanov.clone()).matches(&doc));
        assert!(sofia.clone().or(ivanov.clone()).matches(&doc));
        assert!((!ivanov.clone()).matches(&doc));
        assert_eq!(!!ivanov.clone(), ivanov);
    }

    #[test]
    fn test_and_flattens_and_drops_all() {
        let a = Filter::eq("a", 1);
        let b = Filter::eq("b", 2);
        let c = Filter::eq("c", 3);

        assert_eq!(Filter::All.and(a.clone()), a);
        assert_eq!(
            a.clone().and(b.clone()).and(c.clone()),
            Filter::And(vec![a, b, c])
        );
    }

    #[test]
    fn test_projection_fields() {
        let doc = petkovi();
        let projection = Projection::Fields(vec!["id".into(), "address.city".into(), "missing".into()]);

        assert_eq!(
            projection.apply(&doc),
            json!({ "id": "FamilyPetkovi", "city": "Sofia" })
        );
    }

    #[test]
    fn test_functional_form_matches_declarative() {
        let functional = QuerySpec::new()
            .filter_by(|f| f.id().eq("FamilyPetkovi"))
            .select_with(|f| f.whole());
        let declarative = QuerySpec::filtered(Filter::eq("id", "FamilyPetkovi"));

        assert_eq!(functional, declarative);
    }

    #[test]
    fn test_functional_nested_field_and_pick() {
        let spec = QuerySpec::new()
            .filter_by(|f| f.field("address").field("county").eq("Englnd"))
            .select_with(|f| f.pick([f.id(), f.field("lastName")]));

        let result = spec.evaluate(&[petkovi(), ivanovi()]);
        assert_eq!(result, vec![json!({ "id": "FamilyIvanovi", "lastName": "Ivanov" })]);
    }
}
