use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type Map = BTreeMap<String, String>;

pub type Expressions = Vec<Expression>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Expression {
    key: String,
    operator: Operator,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    values: BTreeSet<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// A Kubernetes label selector.
///
/// An empty selector (`{}`) selects everything. Whether a selector is present
/// at all is modeled by the caller with `Option<Selector>`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_labels: Option<Map>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_expressions: Option<Expressions>,
}

/// Returns true iff `selector` is a plain label match whose labels are exactly
/// `labels`.
///
/// This is map equality, not subset matching: a selector for `{app: foo}`
/// does not match the label set `{app: foo, tier: web}`. Selectors carrying
/// match expressions never match.
pub fn labels_match(selector: &Selector, labels: &Map) -> bool {
    if selector.match_expressions.iter().flatten().next().is_some() {
        return false;
    }
    match selector.match_labels.as_ref() {
        Some(match_labels) => match_labels == labels,
        None => labels.is_empty(),
    }
}

// === Selector ===

impl Selector {
    pub fn new(match_labels: Option<Map>, match_expressions: Option<Expressions>) -> Self {
        Self {
            match_labels,
            match_expressions,
        }
    }

    pub fn from_expressions(exprs: Expressions) -> Self {
        Self {
            match_labels: None,
            match_expressions: Some(exprs),
        }
    }

    pub fn from_map(map: Map) -> Self {
        Self {
            match_labels: Some(map),
            match_expressions: None,
        }
    }

    /// Indicates whether this selector selects everything.
    pub fn is_empty(&self) -> bool {
        self.match_labels.as_ref().map_or(true, Map::is_empty)
            && self.match_expressions.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn matches(&self, labels: &Map) -> bool {
        for expr in self.match_expressions.iter().flatten() {
            if !expr.matches(labels) {
                return false;
            }
        }

        if let Some(match_labels) = self.match_labels.as_ref() {
            for (k, v) in match_labels.iter() {
                if labels.get(k) != Some(v) {
                    return false;
                }
            }
        }

        true
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl std::iter::FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self::from_expressions(iter.into_iter().collect())
    }
}

// === Expression ===

impl Expression {
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, labels: &Map) -> bool {
        match self.operator {
            Operator::In => labels
                .get(&self.key)
                .map_or(false, |v| self.values.contains(v)),
            Operator::NotIn => labels
                .get(&self.key)
                .map_or(true, |v| !self.values.contains(v)),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}
