// Table name rewriter
//
// Removes instance and schema qualifiers from three-part table names so the
// statement can run on the backend the instance resolves to, where the
// schema is the connection default.

use std::ops::ControlFlow;

use sqlparser::ast::{
    visit_expressions_mut, visit_relations_mut, Expr, ObjectName, Query, SelectItem,
    SelectItemQualifiedWildcardKind, SetExpr, VisitMut, VisitorMut,
};

use crate::services::statement::object_name_parts;

pub struct TableNameRewriter;

impl TableNameRewriter {
    /// Rewrite a copy of `query`; everything but the stripped qualifiers is preserved
    pub fn process(query: &Query) -> Query {
        let mut rewritten = query.clone();
        let mut stripped: Vec<Vec<String>> = Vec::new();

        let _ = visit_relations_mut(&mut rewritten, |name: &mut ObjectName| {
            if name.0.len() == 3 {
                let qualified = Self::normalized(&object_name_parts(name));
                name.0.drain(..2);
                if !stripped.contains(&qualified) {
                    stripped.push(qualified);
                }
            }
            ControlFlow::<()>::Continue(())
        });

        if stripped.is_empty() {
            return rewritten;
        }

        // `inst.sch.tbl.col` -> `tbl.col`
        let _ = visit_expressions_mut(&mut rewritten, |expr: &mut Expr| {
            if let Expr::CompoundIdentifier(idents) = expr {
                if idents.len() == 4 {
                    let table: Vec<String> = idents[..3].iter().map(|i| i.value.to_lowercase()).collect();
                    if stripped.contains(&table) {
                        idents.drain(..2);
                    }
                }
            }
            ControlFlow::<()>::Continue(())
        });

        // `inst.sch.tbl.*` -> `tbl.*`, in every query block
        let _ = rewritten.visit(&mut WildcardStripper { stripped: &stripped });

        rewritten
    }

    fn normalized(parts: &[String]) -> Vec<String> {
        parts.iter().map(|part| part.to_lowercase()).collect()
    }
}

/// Removes instance and schema from `prefix.*` items naming a rewritten table
struct WildcardStripper<'a> {
    stripped: &'a [Vec<String>],
}

impl WildcardStripper<'_> {
    /// Set operation branches are not queries of their own, so they are walked
    /// here; parenthesized bodies are reached as separate queries by the visitor.
    fn strip_set_expr(&self, body: &mut SetExpr) {
        match body {
            SetExpr::Select(select) => {
                for item in select.projection.iter_mut() {
                    if let SelectItem::QualifiedWildcard(SelectItemQualifiedWildcardKind::ObjectName(name), _) = item {
                        if name.0.len() == 3
                            && self
                                .stripped
                                .contains(&TableNameRewriter::normalized(&object_name_parts(name)))
                        {
                            name.0.drain(..2);
                        }
                    }
                }
            }
            SetExpr::SetOperation { left, right, .. } => {
                self.strip_set_expr(left);
                self.strip_set_expr(right);
            }
            _ => {}
        }
    }
}

impl VisitorMut for WildcardStripper<'_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        self.strip_set_expr(&mut query.body);
        ControlFlow::Continue(())
    }
}
