//! SQL parser implementation.

use super::error::ParseError;
use super::pratt::{
    infix_binding_power, prefix_binding_power, token_to_binary_op, token_to_unary_op,
};
use crate::ast::{
    AggregateFunc, ColumnDef, ColumnRef, CreateTableStatement, DataType, Expr, FromItem,
    InsertStatement, Literal, Query, SelectItem, SelectStatement, SetOp, Statement, TableSource,
};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

/// SQL parser over a single statement.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    /// Parses a single SQL statement terminated by `;`.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the input is not a valid SQL statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let statement = match &self.current.kind {
            TokenKind::Keyword(Keyword::Create) => {
                Statement::CreateTable(self.parse_create_table()?)
            }
            TokenKind::Keyword(Keyword::Insert) => Statement::Insert(self.parse_insert()?),
            TokenKind::Keyword(Keyword::Select) | TokenKind::LeftParen => {
                Statement::Query(self.parse_query()?)
            }
            _ => {
                return Err(ParseError::unexpected(
                    "CREATE, INSERT, or SELECT",
                    self.current.kind.clone(),
                    self.current.span,
                ));
            }
        };
        self.expect(&TokenKind::Semicolon)?;
        if !self.current.is_eof() {
            return Err(ParseError::unexpected(
                "end of statement",
                self.current.kind.clone(),
                self.current.span,
            ));
        }
        Ok(statement)
    }

    // --- CREATE TABLE ---

    fn parse_create_table(&mut self) -> Result<CreateTableStatement, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;
        let name = self.expect_identifier()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut columns = vec![self.parse_column_def()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            columns.push(self.parse_column_def()?);
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(CreateTableStatement { name, columns })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;

        // Nullability: absent and NULL both mean nullable.
        let nullable = if self.check_keyword(Keyword::Null) {
            self.advance();
            true
        } else if self.check_keyword(Keyword::Not) {
            self.advance();
            self.expect_keyword(Keyword::Null)?;
            false
        } else {
            true
        };

        let mut def = ColumnDef::new(name, data_type);
        if !nullable {
            def = def.not_null();
        }
        Ok(def)
    }

    fn parse_data_type(&mut self) -> Result<DataType, ParseError> {
        let data_type = match &self.current.kind {
            TokenKind::Keyword(Keyword::Boolean) => DataType::Boolean,
            TokenKind::Keyword(Keyword::Integer) => DataType::Integer,
            TokenKind::Keyword(Keyword::Float) => DataType::Float,
            TokenKind::Keyword(Keyword::String) => DataType::String,
            _ => {
                return Err(ParseError::unexpected(
                    "data type",
                    self.current.kind.clone(),
                    self.current.span,
                ));
            }
        };
        self.advance();
        Ok(data_type)
    }

    // --- INSERT ---

    fn parse_insert(&mut self) -> Result<InsertStatement, ParseError> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier()?;
        self.expect_keyword(Keyword::Values)?;

        let mut rows = vec![self.parse_row()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            rows.push(self.parse_row()?);
        }

        Ok(InsertStatement { table, rows })
    }

    fn parse_row(&mut self) -> Result<Vec<Literal>, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut values = vec![self.parse_literal()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            values.push(self.parse_literal()?);
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(values)
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let negative = if self.check(&TokenKind::Minus) {
            self.advance();
            true
        } else {
            false
        };

        let literal = match &self.current.kind {
            TokenKind::Integer(n) => Literal::Integer(if negative { -n } else { *n }),
            TokenKind::Float(x) => Literal::Float(if negative { -x } else { *x }),
            TokenKind::String(s) if !negative => Literal::String(s.clone()),
            TokenKind::Keyword(Keyword::True) if !negative => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) if !negative => Literal::Boolean(false),
            TokenKind::Keyword(Keyword::Null) if !negative => Literal::Null,
            _ => {
                return Err(ParseError::unexpected(
                    "literal",
                    self.current.kind.clone(),
                    self.current.span,
                ));
            }
        };
        self.advance();
        Ok(literal)
    }

    // --- Queries ---

    /// Parses a query: SELECT blocks combined by set operations.
    ///
    /// `UNION` and `EXCEPT` share the lowest precedence level; `INTERSECT`
    /// binds tighter. All three are left-associative.
    fn parse_query(&mut self) -> Result<Query, ParseError> {
        let mut left = self.parse_intersect_operand()?;

        loop {
            let op = match &self.current.kind {
                TokenKind::Keyword(Keyword::Union) => SetOp::Union,
                TokenKind::Keyword(Keyword::Except) => SetOp::Except,
                _ => break,
            };
            self.advance();
            let distinct = self.parse_distinctness();
            let right = self.parse_intersect_operand()?;
            left = Query::Compound {
                op,
                distinct,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_intersect_operand(&mut self) -> Result<Query, ParseError> {
        let mut left = self.parse_query_primary()?;

        while self.check_keyword(Keyword::Intersect) {
            self.advance();
            let distinct = self.parse_distinctness();
            let right = self.parse_query_primary()?;
            left = Query::Compound {
                op: SetOp::Intersect,
                distinct,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_query_primary(&mut self) -> Result<Query, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            let query = self.parse_query()?;
            self.expect(&TokenKind::RightParen)?;
            Ok(query)
        } else {
            Ok(Query::Select(Box::new(self.parse_select()?)))
        }
    }

    /// Parses the distinctness marker after a set-operation keyword.
    /// Absent and `DISTINCT` both mean distinct; `ALL` keeps duplicates.
    fn parse_distinctness(&mut self) -> bool {
        if self.check_keyword(Keyword::All) {
            self.advance();
            false
        } else if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else {
            true
        }
    }

    fn parse_select(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect_keyword(Keyword::Select)?;

        let mut items = vec![self.parse_select_item()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            items.push(self.parse_select_item()?);
        }

        self.expect_keyword(Keyword::From)?;
        let mut from = vec![self.parse_from_item()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            from.push(self.parse_from_item()?);
        }

        let predicate = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        let group_by = if self.check_keyword(Keyword::Group) {
            self.advance();
            self.expect_keyword(Keyword::By)?;
            let mut keys = vec![self.parse_column_ref()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                keys.push(self.parse_column_ref()?);
            }
            keys
        } else {
            vec![]
        };

        Ok(SelectStatement {
            items,
            from,
            predicate,
            group_by,
        })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        if self.check(&TokenKind::Star) {
            self.advance();
            return Ok(SelectItem::Wildcard { qualifier: None });
        }

        // `t.*` parses as an expression-level wildcard; lift it into the
        // select-item form so the compiler only sees it at the top level.
        let expr = match self.parse_expression(0)? {
            Expr::Wildcard { qualifier } => {
                return Ok(SelectItem::Wildcard {
                    qualifier: Some(qualifier),
                });
            }
            expr => expr,
        };

        let alias = if self.check_keyword(Keyword::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };

        Ok(SelectItem::Expression { expr, alias })
    }

    fn parse_from_item(&mut self) -> Result<FromItem, ParseError> {
        let source = if self.check(&TokenKind::LeftParen) {
            self.advance();
            let query = self.parse_query()?;
            self.expect(&TokenKind::RightParen)?;
            TableSource::Subquery(Box::new(query))
        } else {
            TableSource::Table(self.expect_identifier()?)
        };

        // Alias: `AS name` or a bare identifier.
        let alias = if self.check_keyword(Keyword::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else if matches!(&self.current.kind, TokenKind::Identifier(_)) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        Ok(FromItem { source, alias })
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef, ParseError> {
        let span = self.current.span;
        let first = self.expect_identifier()?;
        if self.check(&TokenKind::Dot) {
            self.advance();
            let name = self.expect_identifier()?;
            Ok(ColumnRef {
                qualifier: Some(first),
                name,
                span,
            })
        } else {
            Ok(ColumnRef {
                qualifier: None,
                name: first,
                span,
            })
        }
    }

    // --- Expressions ---

    /// Parses an expression using Pratt parsing.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let (l_bp, r_bp) = match infix_binding_power(&self.current.kind) {
                Some(bp) => bp,
                None => break,
            };

            if l_bp < min_bp {
                break;
            }

            match &self.current.kind {
                // Postfix IS [NOT] NULL
                TokenKind::Keyword(Keyword::Is) => {
                    self.advance();
                    let negated = if self.check_keyword(Keyword::Not) {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    self.expect_keyword(Keyword::Null)?;
                    lhs = Expr::IsNull {
                        expr: Box::new(lhs),
                        negated,
                    };
                }
                _ => {
                    if let Some(op) = token_to_binary_op(&self.current.kind) {
                        self.advance();
                        let rhs = self.parse_expression(r_bp)?;
                        lhs = Expr::Binary {
                            left: Box::new(lhs),
                            op,
                            right: Box::new(rhs),
                        };
                    } else {
                        break;
                    }
                }
            }
        }

        Ok(lhs)
    }

    /// Parses a prefix expression.
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        if let Some(op) = token_to_unary_op(&self.current.kind) {
            if let Some(bp) = prefix_binding_power(&self.current.kind) {
                self.advance();
                let operand = self.parse_expression(bp)?;
                return Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                });
            }
        }

        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();

        match &token.kind {
            // Literals
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(*n)))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(*x)))
            }
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expr::Literal(Literal::String(value)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }

            // Parenthesized expression
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }

            // CAST(expr AS type)
            TokenKind::Keyword(Keyword::Cast) => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let expr = self.parse_expression(0)?;
                self.expect_keyword(Keyword::As)?;
                let data_type = self.parse_data_type()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expr::Cast {
                    expr: Box::new(expr),
                    data_type,
                })
            }

            // Aggregate calls
            TokenKind::Keyword(Keyword::Count) => {
                self.advance();
                self.parse_aggregate_call(AggregateFunc::Count)
            }
            TokenKind::Keyword(Keyword::Sum) => {
                self.advance();
                self.parse_aggregate_call(AggregateFunc::Sum)
            }
            TokenKind::Keyword(Keyword::Avg) => {
                self.advance();
                self.parse_aggregate_call(AggregateFunc::Avg)
            }
            TokenKind::Keyword(Keyword::Min) => {
                self.advance();
                self.parse_aggregate_call(AggregateFunc::Min)
            }
            TokenKind::Keyword(Keyword::Max) => {
                self.advance();
                self.parse_aggregate_call(AggregateFunc::Max)
            }

            // Identifier: column reference or qualified wildcard
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = token.span;
                self.advance();

                if self.check(&TokenKind::Dot) {
                    self.advance();
                    if self.check(&TokenKind::Star) {
                        self.advance();
                        return Ok(Expr::Wildcard { qualifier: name });
                    }
                    let column = self.expect_identifier()?;
                    return Ok(Expr::Column(ColumnRef {
                        qualifier: Some(name),
                        name: column,
                        span,
                    }));
                }

                Ok(Expr::Column(ColumnRef {
                    qualifier: None,
                    name,
                    span,
                }))
            }

            _ => Err(ParseError::unexpected(
                "expression",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    /// Parses the parenthesized argument of an aggregate call. `COUNT`
    /// accepts `*`; the others require an expression.
    fn parse_aggregate_call(&mut self, func: AggregateFunc) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LeftParen)?;

        let arg = if self.check(&TokenKind::Star) {
            if func != AggregateFunc::Count {
                return Err(ParseError::new(
                    format!("Syntax error: {func} requires an expression argument"),
                    self.current.span,
                ));
            }
            self.advance();
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };

        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::Aggregate { func, arg })
    }

    // --- Helper methods ---

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current.kind) == core::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current.kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                format!("{kind:?}"),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                keyword.as_str(),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Expects and returns an identifier.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::unexpected(
                "identifier",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }
}
