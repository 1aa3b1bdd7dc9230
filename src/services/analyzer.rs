// Statement Analyzer
//
// Extracts the tables and columns referenced by the outermost SELECT of a
// query without executing anything. Subqueries are not descended into.

use sqlparser::ast::Query;

use crate::models::{ParsedColumn, ParsedTable, QualifiedName};
use crate::services::statement::{Expression, QuerySpecification, Relation, SelectItem};

/// Tables and columns extracted from one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Select-list columns in textual order
    pub columns: Vec<ParsedColumn>,
    /// Prefixes of every `prefix.*` item
    pub all_column_tables: Vec<QualifiedName>,
    /// Named tables in left-to-right FROM order
    pub tables: Vec<ParsedTable>,
    /// Set when the select list contains a bare `*`
    pub all_columns: bool,
}

pub struct Analyzer;

impl Analyzer {
    /// Analyze the outermost query specification of a parsed query
    pub fn analyze_query(query: &Query) -> Analysis {
        Self::analyze(&QuerySpecification::from_query(query))
    }

    pub fn analyze(specification: &QuerySpecification) -> Analysis {
        let mut analysis = Analysis::default();

        for (index, item) in specification.select.iter().enumerate() {
            let position = index + 1;
            match item {
                SelectItem::Single { expression, alias } => {
                    if let Some(parts) = Self::dotted_parts(expression) {
                        analysis.columns.push(ParsedColumn::new(
                            QualifiedName::new(parts),
                            alias.clone(),
                            position,
                        ));
                    }
                }
                SelectItem::AllColumns { prefix: Some(prefix) } => {
                    analysis.all_column_tables.push(prefix.clone());
                    let mut parts = prefix.parts().to_vec();
                    parts.push("*".to_string());
                    analysis
                        .columns
                        .push(ParsedColumn::new(QualifiedName::new(parts), None, position));
                }
                SelectItem::AllColumns { prefix: None } => {
                    analysis
                        .columns
                        .push(ParsedColumn::new(QualifiedName::of("*"), None, position));
                    analysis.all_columns = true;
                }
            }
        }

        if let Some(from) = &specification.from {
            for (index, relation) in Self::flatten_relations(from).into_iter().enumerate() {
                let position = index + 1;
                let (relation, alias) = match relation {
                    Relation::Aliased { relation, alias } => (relation.as_ref(), Some(alias.clone())),
                    other => (other, None),
                };
                if let Relation::Table(name) = relation {
                    analysis
                        .tables
                        .push(ParsedTable::new(name.clone(), alias, position));
                }
            }
        }

        analysis
    }

    /// Name segments of a plain name or a chain of field accesses.
    ///
    /// The chain is walked from the outermost field inward, so segments are
    /// collected right to left and reversed at the end.
    fn dotted_parts(expression: &Expression) -> Option<Vec<String>> {
        match expression {
            Expression::Identifier(name) => Some(vec![name.clone()]),
            Expression::Dereference { base, field } => {
                let mut parts = vec![field.clone()];
                let mut base = base.as_ref();
                while let Expression::Dereference { base: inner, field } = base {
                    parts.push(field.clone());
                    base = inner.as_ref();
                }
                if let Expression::Identifier(name) = base {
                    parts.push(name.clone());
                }
                parts.reverse();
                Some(parts)
            }
            Expression::Subquery | Expression::Other => None,
        }
    }

    /// Flatten a left-deep join tree into left-to-right relation order.
    ///
    /// Walking down the left spine visits right children from last to first,
    /// so the collected sequence is reversed before returning.
    fn flatten_relations(from: &Relation) -> Vec<&Relation> {
        let mut relations = Vec::new();
        if let Relation::Join { left, right } = from {
            relations.push(right.as_ref());
            let mut left = left.as_ref();
            while let Relation::Join {
                left: inner_left,
                right: inner_right,
            } = left
            {
                relations.push(inner_right.as_ref());
                left = inner_left.as_ref();
            }
            relations.push(left);
        } else {
            relations.push(from);
        }
        relations.reverse();
        relations
    }
}
