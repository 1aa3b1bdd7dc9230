use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Dotted name such as `instance.schema.table` or `t.col`.
///
/// Segments keep the case they were written with. Equality and hashing are
/// case-insensitive so that `T.col` resolves against a table aliased `t`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName {
    parts: Vec<String>,
}

impl QualifiedName {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn of(part: impl Into<String>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// Segments in textual order, original case preserved
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }

    /// Last segment, the name of the table or column itself
    pub fn suffix(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// Everything but the last segment, if there is anything
    pub fn prefix(&self) -> Option<QualifiedName> {
        if self.parts.len() < 2 {
            return None;
        }
        Some(Self::new(self.parts[..self.parts.len() - 1].to_vec()))
    }

    fn normalized(&self) -> impl Iterator<Item = String> + '_ {
        self.parts.iter().map(|part| part.to_lowercase())
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.parts.len() == other.parts.len() && self.normalized().eq(other.normalized())
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.len().hash(state);
        for part in self.normalized() {
            part.hash(state);
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

impl From<Vec<&str>> for QualifiedName {
    fn from(parts: Vec<&str>) -> Self {
        Self::new(parts.into_iter().map(str::to_string).collect())
    }
}

/// A selected column found in the outermost select list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedColumn {
    pub identifier: String,
    pub qualified_name: QualifiedName,
    pub alias: Option<String>,
    /// 1-based position in the select list
    pub position: usize,
}

impl ParsedColumn {
    pub fn new(qualified_name: QualifiedName, alias: Option<String>, position: usize) -> Self {
        Self {
            identifier: qualified_name.suffix().to_string(),
            qualified_name,
            alias,
            position,
        }
    }
}

/// A concrete table referenced by the outermost FROM clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedTable {
    pub identifier: String,
    pub qualified_name: QualifiedName,
    pub alias: Option<String>,
    /// 1-based left-to-right position in the FROM clause
    pub position: usize,
}

impl ParsedTable {
    pub fn new(qualified_name: QualifiedName, alias: Option<String>, position: usize) -> Self {
        Self {
            identifier: qualified_name.suffix().to_string(),
            qualified_name,
            alias,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_qualified_name_keeps_case_but_compares_insensitively() {
        let upper = QualifiedName::from(vec!["Foo", "Bar"]);
        let lower = QualifiedName::from(vec!["foo", "bar"]);

        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "Foo.Bar");

        let mut map = HashMap::new();
        map.insert(upper, 1);
        assert_eq!(map.get(&lower), Some(&1));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let name = QualifiedName::from(vec!["inst", "sch", "tbl"]);
        assert_eq!(name.suffix(), "tbl");
        assert_eq!(name.prefix(), Some(QualifiedName::from(vec!["inst", "sch"])));
        assert_eq!(QualifiedName::of("tbl").prefix(), None);
    }

    #[test]
    fn test_parsed_column_identifier_is_last_segment() {
        let column = ParsedColumn::new(QualifiedName::from(vec!["t", "*"]), None, 1);
        assert_eq!(column.identifier, "*");
    }
}
