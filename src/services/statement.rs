// Statement shapes consumed by the analyzer
//
// The sqlparser AST is lowered into this closed set before analysis. Joins
// become a left-deep binary tree and dotted column references become a chain
// of field accesses, matching the way the analyzer walks them.

use sqlparser::ast::{
    self, AccessExpr, ObjectName, ObjectNamePart, SelectItemQualifiedWildcardKind, SetExpr,
    TableFactor, TableWithJoins,
};

use crate::models::QualifiedName;

/// Expression shapes that can appear in a select item
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A plain name, `col`
    Identifier(String),
    /// Field access on a base expression, `base.field`
    Dereference { base: Box<Expression>, field: String },
    /// A scalar subquery; never descended into
    Subquery,
    /// Anything else: literals, function calls, arithmetic
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Single {
        expression: Expression,
        alias: Option<String>,
    },
    /// `*` when `prefix` is absent, `prefix.*` otherwise
    AllColumns { prefix: Option<QualifiedName> },
}

/// Relation shapes that can appear in a FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    Table(QualifiedName),
    Aliased {
        relation: Box<Relation>,
        alias: String,
    },
    /// Left-deep join: `left` may itself be a join, `right` never is
    Join {
        left: Box<Relation>,
        right: Box<Relation>,
    },
    /// Derived table, table function or other relation that is not a named table
    Derived,
}

/// Top-level query specification: the select list and the FROM clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpecification {
    pub select: Vec<SelectItem>,
    pub from: Option<Relation>,
}

impl QuerySpecification {
    /// Lower the outermost SELECT of a parsed query.
    ///
    /// Parenthesized queries are unwrapped. For set operations the leftmost
    /// branch is used since it names the output columns. Query bodies with no
    /// SELECT (e.g. `VALUES`) yield an empty specification.
    pub fn from_query(query: &ast::Query) -> Self {
        Self::from_set_expr(&query.body)
    }

    fn from_set_expr(body: &SetExpr) -> Self {
        match body {
            SetExpr::Select(select) => Self {
                select: select.projection.iter().map(lower_select_item).collect(),
                from: lower_from(&select.from),
            },
            SetExpr::Query(query) => Self::from_query(query),
            SetExpr::SetOperation { left, .. } => Self::from_set_expr(left),
            _ => Self::default(),
        }
    }
}

/// Segments of an object name, keeping their written case
pub fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0.iter().map(object_name_part_value).collect()
}

pub fn object_name_part_value(part: &ObjectNamePart) -> String {
    match part {
        ObjectNamePart::Identifier(ident) => ident.value.clone(),
        other => other.to_string(),
    }
}

fn lower_select_item(item: &ast::SelectItem) -> SelectItem {
    match item {
        ast::SelectItem::UnnamedExpr(expr) => SelectItem::Single {
            expression: lower_expr(expr),
            alias: None,
        },
        ast::SelectItem::ExprWithAlias { expr, alias } => SelectItem::Single {
            expression: lower_expr(expr),
            alias: Some(alias.value.clone()),
        },
        ast::SelectItem::QualifiedWildcard(kind, _) => match kind {
            SelectItemQualifiedWildcardKind::ObjectName(name) => SelectItem::AllColumns {
                prefix: Some(QualifiedName::new(object_name_parts(name))),
            },
            _ => SelectItem::Single {
                expression: Expression::Other,
                alias: None,
            },
        },
        ast::SelectItem::Wildcard(_) => SelectItem::AllColumns { prefix: None },
        _ => SelectItem::Single {
            expression: Expression::Other,
            alias: None,
        },
    }
}

fn lower_expr(expr: &ast::Expr) -> Expression {
    match expr {
        ast::Expr::Identifier(ident) => Expression::Identifier(ident.value.clone()),
        ast::Expr::CompoundIdentifier(idents) => {
            let mut idents = idents.iter();
            let Some(root) = idents.next() else {
                return Expression::Other;
            };
            idents.fold(Expression::Identifier(root.value.clone()), |base, ident| {
                Expression::Dereference {
                    base: Box::new(base),
                    field: ident.value.clone(),
                }
            })
        }
        ast::Expr::CompoundFieldAccess { root, access_chain } => {
            let mut lowered = lower_expr(root);
            for access in access_chain {
                match access {
                    AccessExpr::Dot(ast::Expr::Identifier(ident)) => {
                        lowered = Expression::Dereference {
                            base: Box::new(lowered),
                            field: ident.value.clone(),
                        };
                    }
                    _ => return Expression::Other,
                }
            }
            lowered
        }
        ast::Expr::Nested(inner) => lower_expr(inner),
        ast::Expr::Subquery(_) => Expression::Subquery,
        _ => Expression::Other,
    }
}

/// Fold the FROM list into one left-deep join tree.
///
/// Comma separated items are implicit joins; each explicit join is appended
/// to the same chain so that the right child of every join is a single relation.
fn lower_from(from: &[TableWithJoins]) -> Option<Relation> {
    let mut relations = from.iter().flat_map(|table_with_joins| {
        std::iter::once(&table_with_joins.relation)
            .chain(table_with_joins.joins.iter().map(|join| &join.relation))
    });

    let first = lower_table_factor(relations.next()?);
    Some(relations.fold(first, |left, factor| Relation::Join {
        left: Box::new(left),
        right: Box::new(lower_table_factor(factor)),
    }))
}

fn lower_table_factor(factor: &TableFactor) -> Relation {
    let (relation, alias) = match factor {
        TableFactor::Table { name, alias, .. } => {
            (Relation::Table(QualifiedName::new(object_name_parts(name))), alias)
        }
        TableFactor::Derived { alias, .. } => (Relation::Derived, alias),
        TableFactor::NestedJoin {
            table_with_joins,
            alias,
            ..
        } => {
            let nested = lower_from(std::slice::from_ref(table_with_joins.as_ref()))
                .unwrap_or(Relation::Derived);
            (nested, alias)
        }
        _ => return Relation::Derived,
    };

    match alias {
        Some(alias) => Relation::Aliased {
            relation: Box::new(relation),
            alias: alias.name.value.clone(),
        },
        None => relation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::SqlValidator;

    fn specification(sql: &str) -> QuerySpecification {
        let query = SqlValidator::parse_select(sql).unwrap();
        QuerySpecification::from_query(&query)
    }

    #[test]
    fn test_compound_identifier_becomes_dereference_chain() {
        let spec = specification("SELECT Foo.Bar.baz FROM t");
        let expected = Expression::Dereference {
            base: Box::new(Expression::Dereference {
                base: Box::new(Expression::Identifier("Foo".to_string())),
                field: "Bar".to_string(),
            }),
            field: "baz".to_string(),
        };
        assert_eq!(
            spec.select,
            vec![SelectItem::Single {
                expression: expected,
                alias: None
            }]
        );
    }

    #[test]
    fn test_joins_fold_left_deep() {
        let spec = specification("SELECT * FROM a JOIN b ON a.id = b.id, c");
        let table = |name: &str| Box::new(Relation::Table(QualifiedName::of(name)));
        assert_eq!(
            spec.from,
            Some(Relation::Join {
                left: Box::new(Relation::Join {
                    left: table("a"),
                    right: table("b"),
                }),
                right: table("c"),
            })
        );
    }

    #[test]
    fn test_derived_table_keeps_alias() {
        let spec = specification("SELECT x FROM (SELECT 1 AS x) AS sub");
        assert_eq!(
            spec.from,
            Some(Relation::Aliased {
                relation: Box::new(Relation::Derived),
                alias: "sub".to_string(),
            })
        );
    }

    #[test]
    fn test_select_items() {
        let spec = specification("SELECT *, t.*, (SELECT 1), count(*) AS n FROM t");
        assert_eq!(spec.select[0], SelectItem::AllColumns { prefix: None });
        assert_eq!(
            spec.select[1],
            SelectItem::AllColumns {
                prefix: Some(QualifiedName::of("t"))
            }
        );
        assert_eq!(
            spec.select[2],
            SelectItem::Single {
                expression: Expression::Subquery,
                alias: None
            }
        );
        assert_eq!(
            spec.select[3],
            SelectItem::Single {
                expression: Expression::Other,
                alias: Some("n".to_string())
            }
        );
    }

    #[test]
    fn test_set_operation_uses_leftmost_branch() {
        let spec = specification("SELECT a FROM x UNION SELECT b FROM y");
        assert_eq!(spec.from, Some(Relation::Table(QualifiedName::of("x"))));
    }
}
