use serde::{Deserialize, Serialize};

/// A database instance registered in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub id: i64,
    pub database_id: i64,
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub schema_id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Catalog description of a column, including its UCD semantic tag and unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub table_id: i64,
    pub name: String,
    pub datatype: String,
    pub description: Option<String>,
    pub ucd: Option<String>,
    pub unit: Option<String>,
    pub table_name: String,
    pub ordinal: i64,
}

/// Column definition used when registering columns in the catalog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewColumn {
    pub name: String,
    pub datatype: String,
    pub description: Option<String>,
    pub ucd: Option<String>,
    pub unit: Option<String>,
}

impl NewColumn {
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_ucd(mut self, ucd: impl Into<String>) -> Self {
        self.ucd = Some(ucd.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}
