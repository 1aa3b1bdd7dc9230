// Metadata Reconciler
//
// Combines the backend's column descriptors with catalog metadata for the
// tables and columns the analyzer found, producing the output column metadata.

use std::collections::HashMap;

use crate::models::{BackendColumn, Column, ColumnMetadata, ParsedColumn, ParsedTable, QualifiedName};
use crate::services::analyzer::Analysis;
use crate::storage::TableColumns;

/// MySQL wire type codes, as reported in result column definitions
mod type_code {
    pub const DECIMAL: i32 = 0;
    pub const TINY: i32 = 1;
    pub const SHORT: i32 = 2;
    pub const LONG: i32 = 3;
    pub const FLOAT: i32 = 4;
    pub const DOUBLE: i32 = 5;
    pub const TIMESTAMP: i32 = 7;
    pub const LONGLONG: i32 = 8;
    pub const INT24: i32 = 9;
    pub const DATE: i32 = 10;
    pub const TIME: i32 = 11;
    pub const DATETIME: i32 = 12;
    pub const YEAR: i32 = 13;
    pub const NEWDATE: i32 = 14;
    pub const BIT: i32 = 16;
    pub const TIMESTAMP2: i32 = 17;
    pub const DATETIME2: i32 = 18;
    pub const TIME2: i32 = 19;
    pub const NEWDECIMAL: i32 = 246;
    pub const TINY_BLOB: i32 = 249;
    pub const MEDIUM_BLOB: i32 = 250;
    pub const LONG_BLOB: i32 = 251;
    pub const BLOB: i32 = 252;
    pub const GEOMETRY: i32 = 255;
}

/// Catalog datatype for a backend wire type code, used when no catalog column matched
pub fn backend_type_to_datatype(code: i32) -> &'static str {
    use type_code::*;
    match code {
        TINY | SHORT | INT24 | LONG | YEAR => "int",
        LONGLONG => "long",
        FLOAT => "float",
        DOUBLE | DECIMAL | NEWDECIMAL => "double",
        BIT => "boolean",
        TIMESTAMP | DATE | TIME | DATETIME | NEWDATE | TIMESTAMP2 | DATETIME2 | TIME2 => "timestamp",
        TINY_BLOB | MEDIUM_BLOB | LONG_BLOB | BLOB | GEOMETRY => "binary",
        _ => "string",
    }
}

pub struct QueryMetadataHelper<'a> {
    analysis: &'a Analysis,
}

impl<'a> QueryMetadataHelper<'a> {
    pub fn new(analysis: &'a Analysis) -> Self {
        Self { analysis }
    }

    /// Build one `ColumnMetadata` per backend column, in backend ordinal order
    pub fn associate_metadata(
        &self,
        backend_columns: &[BackendColumn],
        possible_tables_and_columns: &TableColumns,
    ) -> Vec<ColumnMetadata> {
        let parsed_table_mapping = self.build_table_name_and_alias_mapping();

        let parsed_table_to_columns: HashMap<&ParsedTable, HashMap<&str, &Column>> =
            possible_tables_and_columns
                .iter()
                .map(|(parsed_table, (_, columns))| {
                    let by_name = columns.iter().map(|c| (c.name.as_str(), c)).collect();
                    (parsed_table, by_name)
                })
                .collect();

        let mut parsed_column_to_column: HashMap<&ParsedColumn, &Column> = HashMap::new();
        for column in &self.analysis.columns {
            let Some(prefix) = column.qualified_name.prefix() else {
                continue;
            };
            let Some(parsed_table) = parsed_table_mapping.get(&prefix) else {
                continue;
            };
            if let Some(catalog_column) = parsed_table_to_columns
                .get(parsed_table)
                .and_then(|columns| columns.get(column.identifier.as_str()))
            {
                parsed_column_to_column.insert(column, catalog_column);
            }
        }

        // Fallback by lowercased name across every table, first table in FROM order wins
        let mut default_column_map: HashMap<String, &Column> = HashMap::new();
        for parsed_table in &self.analysis.tables {
            if let Some((_, columns)) = possible_tables_and_columns.get(parsed_table) {
                for column in columns {
                    default_column_map
                        .entry(column.name.to_lowercase())
                        .or_insert(column);
                }
            }
        }

        let column_position_mapping: HashMap<usize, &ParsedColumn> = self
            .analysis
            .columns
            .iter()
            .map(|column| (column.position, column))
            .collect();

        let mut ordered: Vec<&BackendColumn> = backend_columns.iter().collect();
        ordered.sort_by_key(|column| column.ordinal);

        ordered
            .into_iter()
            .map(|backend_column| {
                let parsed_column = column_position_mapping.get(&backend_column.ordinal).copied();
                let backend_name = backend_column.name.to_lowercase();

                let catalog_column = parsed_column
                    .and_then(|parsed| parsed_column_to_column.get(parsed).copied())
                    .or_else(|| {
                        parsed_column.and_then(|parsed| {
                            default_column_map.get(&parsed.identifier.to_lowercase()).copied()
                        })
                    })
                    .or_else(|| {
                        if self.analysis.all_columns {
                            default_column_map.get(&backend_name).copied()
                        } else {
                            None
                        }
                    })
                    .or_else(|| {
                        if !self.analysis.all_column_tables.is_empty() {
                            default_column_map.get(&backend_name).copied()
                        } else {
                            None
                        }
                    });

                Self::column_metadata(backend_column, catalog_column)
            })
            .collect()
    }

    fn column_metadata(backend_column: &BackendColumn, catalog_column: Option<&Column>) -> ColumnMetadata {
        ColumnMetadata {
            name: backend_column.name.clone(),
            datatype: catalog_column
                .map(|c| c.datatype.clone())
                .unwrap_or_else(|| backend_type_to_datatype(backend_column.jdbc_type).to_string()),
            description: catalog_column
                .and_then(|c| c.description.clone())
                .unwrap_or_default(),
            ucd: catalog_column.and_then(|c| c.ucd.clone()),
            unit: catalog_column.and_then(|c| c.unit.clone()),
            table_name: catalog_column
                .map(|c| c.table_name.clone())
                .unwrap_or_else(|| backend_column.table_name.clone()),
            jdbc_type: backend_column.jdbc_type,
        }
    }

    /// Alias and full name of every parsed table; later tables win on collision
    pub fn build_table_name_and_alias_mapping(&self) -> HashMap<QualifiedName, &'a ParsedTable> {
        let mut table_name_mapping = HashMap::new();
        for table in &self.analysis.tables {
            if let Some(alias) = &table.alias {
                table_name_mapping.insert(QualifiedName::of(alias.clone()), table);
            }
            table_name_mapping.insert(table.qualified_name.clone(), table);
        }
        table_name_mapping
    }
}
