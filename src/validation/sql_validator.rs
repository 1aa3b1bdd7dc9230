use sqlparser::ast::{Query, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use crate::api::middleware::{AppError, SourcePosition};

/// SQL validation service for ensuring submitted text is a single SELECT statement
pub struct SqlValidator;

impl SqlValidator {
    /// Parse SQL text and ensure it's a SELECT statement
    ///
    /// Syntax problems surface as `AppError::Syntax`; any other statement kind
    /// surfaces as `AppError::NotSelectStatement`.
    pub fn parse_select(sql: &str) -> Result<Box<Query>, AppError> {
        let dialect = MySqlDialect {};
        let mut statements = Parser::parse_sql(&dialect, sql)?;

        if statements.len() != 1 {
            return Err(AppError::Syntax {
                message: format!("Expected exactly one statement, found {}", statements.len()),
                position: Some(SourcePosition { line: 1, column: 1 }),
            });
        }

        match statements.remove(0) {
            Statement::Query(query) => Ok(query),
            other => Err(AppError::NotSelectStatement(Self::statement_kind(&other))),
        }
    }

    /// Leading keyword of a statement, used in error messages
    fn statement_kind(statement: &Statement) -> String {
        statement
            .to_string()
            .split_whitespace()
            .next()
            .unwrap_or("UNKNOWN")
            .to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        assert!(SqlValidator::parse_select("SELECT * FROM users").is_ok());
        assert!(SqlValidator::parse_select("SELECT a.id FROM inst.sch.users a;").is_ok());
        assert!(SqlValidator::parse_select("SELECT 1 UNION SELECT 2").is_ok());
    }

    #[test]
    fn test_rejects_non_select_statements() {
        for sql in [
            "INSERT INTO users VALUES (1)",
            "UPDATE users SET name = 'test'",
            "DELETE FROM users",
            "DROP TABLE users",
        ] {
            match SqlValidator::parse_select(sql) {
                Err(AppError::NotSelectStatement(kind)) => {
                    assert!(sql.starts_with(&kind), "{} reported as {}", sql, kind)
                }
                other => panic!("expected NotSelectStatement for {}, got {:?}", sql, other),
            }
        }
    }

    #[test]
    fn test_syntax_error_is_reported() {
        match SqlValidator::parse_select("SELECT FROM WHERE") {
            Err(AppError::Syntax { message, .. }) => {
                assert!(!message.is_empty());
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_multiple_statements_are_syntax_errors() {
        assert!(matches!(
            SqlValidator::parse_select(""),
            Err(AppError::Syntax { .. })
        ));
        assert!(matches!(
            SqlValidator::parse_select("SELECT 1; SELECT 2"),
            Err(AppError::Syntax { .. })
        ));
    }
}
