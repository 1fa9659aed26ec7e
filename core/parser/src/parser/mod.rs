//! The VibeScript parser.
//!
//! Recursive descent over the token stream with precedence climbing for
//! binary expressions. Newlines are not tokens: the lexer records spans and
//! the parser refuses to continue a binary expression with an operator that
//! starts on a fresh line, which is what makes
//!
//! ```text
//! a = foo
//! -bar
//! ```
//!
//! two statements rather than a subtraction.

#[cfg(test)]
mod tests;

use crate::{
    error::Error,
    lexer::{Keyword, Token, TokenKind},
};
use vibe_ast::{
    AssignTarget, BinaryOp, BlockLiteral, CallExpr, CaseExpr, ClassDef, ElsifClause, Expression,
    FunctionDef, IfStatement, Param, Position, Program, RescueClause, RescueType, Statement,
    TryStatement, TypeAnnotation, UnaryOp, WhenClause,
};

/// The parser. Construct with [`Parser::new`], consume with
/// [`Parser::parse_program`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Creates a parser over a lexed token stream.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses the whole token stream as a program.
    ///
    /// # Errors
    ///
    /// Returns the first syntax [`Error`] found.
    pub fn parse_program(mut self) -> Result<Program, Error> {
        let statements = self.parse_statement_list(|kind| matches!(kind, TokenKind::Eof))?;
        self.expect_eof()?;
        Ok(Program::new(statements))
    }

    // ---- token plumbing ----------------------------------------------

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    fn peek_kind(&self) -> &TokenKind {
        self.peek().kind()
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(&TokenKind::Eof, Token::kind)
    }

    fn position(&self) -> Position {
        self.peek().span().start()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> Result<Token, Error> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(Error::expected(
                format!("{kind} in {context}"),
                self.peek_kind().to_string(),
                self.position(),
            ))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, context: &str) -> Result<Token, Error> {
        if self.at_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(Error::expected(
                format!("'{}' in {context}", kw.as_str()),
                self.peek_kind().to_string(),
                self.position(),
            ))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<(String, Position), Error> {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok((name.into(), position))
            }
            other => Err(Error::expected(
                format!("identifier in {context}"),
                other.to_string(),
                position,
            )),
        }
    }

    fn expect_eof(&mut self) -> Result<(), Error> {
        if matches!(self.peek_kind(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(Error::expected(
                "end of input",
                self.peek_kind().to_string(),
                self.position(),
            ))
        }
    }

    /// Whether the next token starts on a later line than the previous one
    /// ended on. Used to stop binary expressions at statement boundaries.
    fn on_new_line(&self) -> bool {
        if self.pos == 0 {
            return false;
        }
        let prev = self.tokens[self.pos - 1].span().end().line();
        self.peek().span().start().line() > prev
    }

    // ---- statements --------------------------------------------------

    fn parse_statement_list<F>(&mut self, stop: F) -> Result<Vec<Statement>, Error>
    where
        F: Fn(&TokenKind) -> bool,
    {
        let mut statements = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if stop(self.peek_kind()) || matches!(self.peek_kind(), TokenKind::Eof) {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
        }
    }

    fn parse_body(&mut self) -> Result<Vec<Statement>, Error> {
        self.parse_statement_list(|kind| {
            matches!(
                kind,
                TokenKind::Keyword(
                    Keyword::End
                        | Keyword::Else
                        | Keyword::Elsif
                        | Keyword::When
                        | Keyword::Rescue
                        | Keyword::Ensure
                )
            )
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, Error> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Def) => {
                let def = self.parse_function_def(false)?;
                Ok(Statement::FunctionDecl(def))
            }
            TokenKind::Keyword(Keyword::Private) => {
                self.advance();
                if !self.at_keyword(Keyword::Def) {
                    return Err(Error::expected(
                        "'def' after 'private'",
                        self.peek_kind().to_string(),
                        self.position(),
                    ));
                }
                let def = self.parse_function_def(true)?;
                Ok(Statement::FunctionDecl(def))
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class_def().map(Statement::ClassDecl),
            TokenKind::Keyword(Keyword::Return) => {
                let position = self.advance().span().start();
                let value = if self.starts_expression() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Statement::Return(value, position))
            }
            TokenKind::Keyword(Keyword::Raise) => {
                let position = self.advance().span().start();
                let value = if self.starts_expression() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Statement::Raise(value, position))
            }
            TokenKind::Keyword(Keyword::Break) => {
                let position = self.advance().span().start();
                Ok(Statement::Break(position))
            }
            TokenKind::Keyword(Keyword::Next) => {
                let position = self.advance().span().start();
                Ok(Statement::Next(position))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if().map(Statement::If),
            TokenKind::Keyword(Keyword::While) => self.parse_while(false),
            TokenKind::Keyword(Keyword::Until) => self.parse_while(true),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try().map(Statement::Try),
            _ => self.parse_expression_or_assignment(),
        }
    }

    /// Whether the next token can begin an expression on the current line.
    fn starts_expression(&self) -> bool {
        if self.on_new_line() {
            return false;
        }
        matches!(
            self.peek_kind(),
            TokenKind::Identifier(_)
                | TokenKind::Constant(_)
                | TokenKind::IVar(_)
                | TokenKind::ClassVar(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::StringLit(_)
                | TokenKind::Symbol(_)
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Not
                | TokenKind::Keyword(
                    Keyword::Nil
                        | Keyword::True
                        | Keyword::False
                        | Keyword::SelfKw
                        | Keyword::Case
                        | Keyword::Yield
                        | Keyword::Require
                )
        )
    }

    fn parse_expression_or_assignment(&mut self) -> Result<Statement, Error> {
        let expr = self.parse_expression()?;
        if self.at(&TokenKind::Assign) {
            let position = self.advance().span().start();
            let target = Self::expression_to_target(expr)?;
            let value = self.parse_expression()?;
            return Ok(Statement::Assign {
                target,
                value,
                position,
            });
        }
        Ok(Statement::Expression(expr))
    }

    fn expression_to_target(expr: Expression) -> Result<AssignTarget, Error> {
        match expr {
            Expression::Identifier(name, position) => Ok(AssignTarget::Identifier(name, position)),
            Expression::IVar(name, position) => Ok(AssignTarget::IVar(name, position)),
            Expression::ClassVar(name, position) => Ok(AssignTarget::ClassVar(name, position)),
            Expression::Member {
                target,
                name,
                position,
            } => Ok(AssignTarget::Member {
                target: *target,
                name,
                position,
            }),
            Expression::Index {
                target,
                index,
                position,
            } => Ok(AssignTarget::Index {
                target: *target,
                index: *index,
                position,
            }),
            other => Err(Error::general(
                "invalid assignment target",
                other.position(),
            )),
        }
    }

    fn parse_if(&mut self) -> Result<IfStatement, Error> {
        let position = self.expect_keyword(Keyword::If, "if statement")?.span().start();
        let condition = self.parse_expression()?;
        self.eat_keyword(Keyword::Then);
        let body = self.parse_body()?;

        let mut elsifs = Vec::new();
        while self.eat_keyword(Keyword::Elsif) {
            let condition = self.parse_expression()?;
            self.eat_keyword(Keyword::Then);
            let body = self.parse_body()?;
            elsifs.push(ElsifClause { condition, body });
        }

        let else_body = if self.eat_keyword(Keyword::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::End, "if statement")?;

        Ok(IfStatement {
            condition,
            body,
            elsifs,
            else_body,
            position,
        })
    }

    fn parse_while(&mut self, until: bool) -> Result<Statement, Error> {
        let kw = if until { Keyword::Until } else { Keyword::While };
        let position = self.expect_keyword(kw, "loop")?.span().start();
        let condition = self.parse_expression()?;
        self.eat_keyword(Keyword::Do);
        let body = self.parse_body()?;
        self.expect_keyword(Keyword::End, "loop")?;
        Ok(if until {
            Statement::Until {
                condition,
                body,
                position,
            }
        } else {
            Statement::While {
                condition,
                body,
                position,
            }
        })
    }

    fn parse_for(&mut self) -> Result<Statement, Error> {
        let position = self.expect_keyword(Keyword::For, "for loop")?.span().start();
        let (variable, _) = self.expect_identifier("for loop")?;
        self.expect_keyword(Keyword::In, "for loop")?;
        let iterable = self.parse_expression()?;
        self.eat_keyword(Keyword::Do);
        let body = self.parse_body()?;
        self.expect_keyword(Keyword::End, "for loop")?;
        Ok(Statement::For {
            variable,
            iterable,
            body,
            position,
        })
    }

    fn parse_try(&mut self) -> Result<TryStatement, Error> {
        let position = self.expect_keyword(Keyword::Try, "try statement")?.span().start();
        let body = self.parse_body()?;

        let mut rescues = Vec::new();
        while self.at_keyword(Keyword::Rescue) {
            let rescue_pos = self.advance().span().start();
            let mut types = Vec::new();
            while let TokenKind::Constant(name) = self.peek_kind().clone() {
                let ty_pos = self.position();
                self.advance();
                types.push(match &*name {
                    "RuntimeError" => RescueType::Runtime,
                    "AssertionError" => RescueType::Assertion,
                    other => {
                        return Err(Error::general(
                            format!("unknown rescue type `{other}`"),
                            ty_pos,
                        ));
                    }
                });
                if !self.eat(&TokenKind::Pipe) {
                    break;
                }
            }
            let binding = if self.eat(&TokenKind::FatArrow) {
                let (name, _) = self.expect_identifier("rescue binding")?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_body()?;
            rescues.push(RescueClause {
                types,
                binding,
                body,
                position: rescue_pos,
            });
        }

        let ensure = if self.eat_keyword(Keyword::Ensure) {
            Some(self.parse_body()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::End, "try statement")?;

        if rescues.is_empty() && ensure.is_none() {
            return Err(Error::general(
                "try statement needs at least one rescue or ensure clause",
                position,
            ));
        }

        Ok(TryStatement {
            body,
            rescues,
            ensure,
            position,
        })
    }

    // ---- definitions -------------------------------------------------

    fn parse_function_def(&mut self, private: bool) -> Result<FunctionDef, Error> {
        let position = self.expect_keyword(Keyword::Def, "function definition")?.span().start();

        // `def self.name` inside a class body is picked apart by the class
        // parser; here it is a plain syntax error.
        let (mut name, _) = self.expect_identifier("function definition")?;

        // Setter methods: `def name=(value)`.
        if self.at(&TokenKind::Assign) && matches!(self.peek_kind_at(1), TokenKind::LParen) {
            self.advance();
            name.push('=');
        }

        let params = if self.at(&TokenKind::LParen) {
            self.parse_params()?
        } else {
            Vec::new()
        };

        let return_type = self.parse_optional_type_annotation()?;
        let body = self.parse_body()?;
        self.expect_keyword(Keyword::End, "function definition")?;

        Ok(FunctionDef {
            name,
            params,
            return_type,
            body,
            private,
            position,
        })
    }

    fn parse_optional_type_annotation(&mut self) -> Result<Option<TypeAnnotation>, Error> {
        if !self.at(&TokenKind::Colon) || self.on_new_line() {
            return Ok(None);
        }
        if !matches!(self.peek_kind_at(1), TokenKind::Constant(_)) {
            return Ok(None);
        }
        self.advance();
        let position = self.position();
        let TokenKind::Constant(name) = self.advance().kind().clone() else {
            unreachable!("checked above");
        };
        TypeAnnotation::from_name(&name)
            .map(Some)
            .ok_or_else(|| Error::general(format!("unknown type `{name}`"), position))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, Error> {
        self.expect(&TokenKind::LParen, "parameter list")?;
        let mut params = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let (name, position) = self.expect_identifier("parameter list")?;
            let type_annotation = self.parse_optional_type_annotation()?;
            let default = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                name,
                type_annotation,
                default,
                position,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "parameter list")?;
        Ok(params)
    }

    fn parse_class_def(&mut self) -> Result<ClassDef, Error> {
        let position = self.expect_keyword(Keyword::Class, "class definition")?.span().start();
        let name_pos = self.position();
        let name = match self.peek_kind().clone() {
            TokenKind::Constant(name) => {
                self.advance();
                String::from(name)
            }
            other => {
                return Err(Error::expected(
                    "class name in class definition",
                    other.to_string(),
                    name_pos,
                ));
            }
        };

        let mut methods = Vec::new();
        let mut class_methods = Vec::new();
        let mut class_vars = Vec::new();

        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.eat_keyword(Keyword::End) {
                break;
            }
            match self.peek_kind().clone() {
                TokenKind::ClassVar(var_name) => {
                    self.advance();
                    self.expect(&TokenKind::Assign, "class variable initializer")?;
                    let value = self.parse_expression()?;
                    class_vars.push((String::from(var_name), value));
                }
                TokenKind::Keyword(Keyword::Private) => {
                    self.advance();
                    let def = self.parse_class_method_or_def(true)?;
                    match def {
                        ClassMember::Method(def) => methods.push(def),
                        ClassMember::ClassMethod(def) => class_methods.push(def),
                    }
                }
                TokenKind::Keyword(Keyword::Def) => {
                    match self.parse_class_method_or_def(false)? {
                        ClassMember::Method(def) => methods.push(def),
                        ClassMember::ClassMethod(def) => class_methods.push(def),
                    }
                }
                TokenKind::Eof => return Err(Error::AbruptEnd),
                other => {
                    return Err(Error::expected(
                        "method or class variable in class body",
                        other.to_string(),
                        self.position(),
                    ));
                }
            }
        }

        Ok(ClassDef {
            name,
            methods,
            class_methods,
            class_vars,
            position,
        })
    }

    fn parse_class_method_or_def(&mut self, private: bool) -> Result<ClassMember, Error> {
        // A `def self.name` head becomes a class method; rewind-free
        // handling by peeking past the `def`.
        if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Def))
            && matches!(self.peek_kind_at(1), TokenKind::Keyword(Keyword::SelfKw))
        {
            let position = self.advance().span().start();
            self.advance(); // self
            self.expect(&TokenKind::Dot, "class method definition")?;
            let (name, _) = self.expect_identifier("class method definition")?;
            let params = if self.at(&TokenKind::LParen) {
                self.parse_params()?
            } else {
                Vec::new()
            };
            let return_type = self.parse_optional_type_annotation()?;
            let body = self.parse_body()?;
            self.expect_keyword(Keyword::End, "class method definition")?;
            return Ok(ClassMember::ClassMethod(FunctionDef {
                name,
                params,
                return_type,
                body,
                private,
                position,
            }));
        }
        Ok(ClassMember::Method(self.parse_function_def(private)?))
    }

    // ---- expressions -------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_binary(0)
    }

    fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
        Some(match kind {
            TokenKind::OrOr => (BinaryOp::Or, 1),
            TokenKind::AndAnd => (BinaryOp::And, 2),
            TokenKind::Eq => (BinaryOp::Eq, 3),
            TokenKind::NotEq => (BinaryOp::NotEq, 3),
            TokenKind::Lt => (BinaryOp::Lt, 4),
            TokenKind::LtEq => (BinaryOp::LtEq, 4),
            TokenKind::Gt => (BinaryOp::Gt, 4),
            TokenKind::GtEq => (BinaryOp::GtEq, 4),
            TokenKind::Plus => (BinaryOp::Add, 6),
            TokenKind::Minus => (BinaryOp::Sub, 6),
            TokenKind::Star => (BinaryOp::Mul, 7),
            TokenKind::Slash => (BinaryOp::Div, 7),
            TokenKind::Percent => (BinaryOp::Rem, 7),
            _ => return None,
        })
    }

    const RANGE_PRECEDENCE: u8 = 5;

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, Error> {
        let mut lhs = self.parse_unary()?;
        loop {
            // An operator on a fresh line starts a new statement.
            if self.on_new_line() {
                return Ok(lhs);
            }
            if self.at(&TokenKind::DotDot) {
                if Self::RANGE_PRECEDENCE < min_precedence {
                    return Ok(lhs);
                }
                let position = self.advance().span().start();
                let rhs = self.parse_binary(Self::RANGE_PRECEDENCE + 1)?;
                lhs = Expression::Range {
                    start: Box::new(lhs),
                    end: Box::new(rhs),
                    position,
                };
                continue;
            }
            let Some((op, precedence)) = Self::binary_op(self.peek_kind()) else {
                return Ok(lhs);
            };
            if precedence < min_precedence {
                return Ok(lhs);
            }
            let position = self.advance().span().start();
            let rhs = self.parse_binary(precedence + 1)?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        match self.peek_kind() {
            TokenKind::Minus => {
                let position = self.advance().span().start();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                    position,
                })
            }
            TokenKind::Not => {
                let position = self.advance().span().start();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                    position,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                // Member access may continue on the next line (trailing-dot
                // chains); calls and indexing must not, or a parenthesised
                // statement would glue onto the previous expression.
                TokenKind::Dot => {
                    let position = self.advance().span().start();
                    let name = match self.peek_kind().clone() {
                        TokenKind::Identifier(name) => {
                            self.advance();
                            String::from(name)
                        }
                        TokenKind::Constant(name) => {
                            self.advance();
                            String::from(name)
                        }
                        other => {
                            return Err(Error::expected(
                                "member name after '.'",
                                other.to_string(),
                                self.position(),
                            ));
                        }
                    };
                    expr = Expression::Member {
                        target: Box::new(expr),
                        name,
                        position,
                    };
                    // `list.each do |x| … end` — block call without parens.
                    if self.at_keyword(Keyword::Do) {
                        let block = self.parse_block_literal()?;
                        let position = block.position;
                        expr = Expression::Call(CallExpr {
                            callee: Box::new(expr),
                            args: Vec::new(),
                            kwargs: Vec::new(),
                            block: Some(block),
                            position,
                        });
                    }
                }
                TokenKind::LParen if !self.on_new_line() => {
                    let position = self.advance().span().start();
                    let (args, kwargs) = self.parse_call_args()?;
                    let block = if self.at_keyword(Keyword::Do) {
                        Some(self.parse_block_literal()?)
                    } else {
                        None
                    };
                    expr = Expression::Call(CallExpr {
                        callee: Box::new(expr),
                        args,
                        kwargs,
                        block,
                        position,
                    });
                }
                TokenKind::LBracket if !self.on_new_line() => {
                    let position = self.advance().span().start();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket, "index expression")?;
                    expr = Expression::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                        position,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expression>, Vec<(String, Expression)>), Error> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expression)> = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok((args, kwargs));
        }
        loop {
            if matches!(self.peek_kind(), TokenKind::Identifier(_))
                && matches!(self.peek_kind_at(1), TokenKind::Colon)
            {
                let (name, _) = self.expect_identifier("keyword argument")?;
                self.expect(&TokenKind::Colon, "keyword argument")?;
                let value = self.parse_expression()?;
                kwargs.push((name, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(Error::general(
                        "positional argument follows keyword argument",
                        self.position(),
                    ));
                }
                args.push(self.parse_expression()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "argument list")?;
        Ok((args, kwargs))
    }

    fn parse_block_literal(&mut self) -> Result<BlockLiteral, Error> {
        let position = self.expect_keyword(Keyword::Do, "block")?.span().start();
        let mut params = Vec::new();
        if self.eat(&TokenKind::Pipe) {
            if !self.eat(&TokenKind::Pipe) {
                loop {
                    let (name, param_pos) = self.expect_identifier("block parameters")?;
                    let type_annotation = self.parse_optional_type_annotation()?;
                    params.push(Param {
                        name,
                        type_annotation,
                        default: None,
                        position: param_pos,
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::Pipe, "block parameters")?;
            }
        }
        let body = self.parse_body()?;
        self.expect_keyword(Keyword::End, "block")?;
        Ok(BlockLiteral {
            params,
            body,
            position,
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expression::Int(value, position))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expression::Float(value, position))
            }
            TokenKind::StringLit(value) => {
                self.advance();
                Ok(Expression::StringLit(String::from(value), position))
            }
            TokenKind::Symbol(name) => {
                self.advance();
                Ok(Expression::SymbolLit(String::from(name), position))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(String::from(name), position))
            }
            TokenKind::Constant(name) => {
                self.advance();
                Ok(Expression::Identifier(String::from(name), position))
            }
            TokenKind::IVar(name) => {
                self.advance();
                Ok(Expression::IVar(String::from(name), position))
            }
            TokenKind::ClassVar(name) => {
                self.advance();
                Ok(Expression::ClassVar(String::from(name), position))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(Expression::Nil(position))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::Bool(true, position))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::Bool(false, position))
            }
            TokenKind::Keyword(Keyword::SelfKw) => {
                self.advance();
                Ok(Expression::SelfExpr(position))
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case().map(Expression::Case),
            TokenKind::Keyword(Keyword::Yield) => self.parse_yield(),
            TokenKind::Keyword(Keyword::Require) => self.parse_require(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "parenthesised expression")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::Eof => Err(Error::AbruptEnd),
            other => Err(Error::expected(
                "expression",
                other.to_string(),
                position,
            )),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        let position = self.expect(&TokenKind::LBracket, "array literal")?.span().start();
        let mut elements = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expression::ArrayLit(elements, position));
        }
        loop {
            elements.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket, "array literal")?;
        Ok(Expression::ArrayLit(elements, position))
    }

    fn parse_hash_literal(&mut self) -> Result<Expression, Error> {
        let position = self.expect(&TokenKind::LBrace, "hash literal")?.span().start();
        let mut entries = Vec::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expression::HashLit(entries, position));
        }
        loop {
            let key_pos = self.position();
            let key = match self.peek_kind().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    String::from(name)
                }
                TokenKind::Constant(name) => {
                    self.advance();
                    String::from(name)
                }
                TokenKind::StringLit(name) => {
                    self.advance();
                    String::from(name)
                }
                TokenKind::Symbol(_) | TokenKind::Int(_) => {
                    // Probably a `key => value` entry; scan ahead for the
                    // dedicated diagnostic.
                    self.advance();
                    if self.at(&TokenKind::FatArrow) {
                        return Err(Error::general(
                            "hash keys must use `name:` style; `=>` keys are not supported",
                            key_pos,
                        ));
                    }
                    return Err(Error::expected(
                        "`name:` key in hash literal",
                        self.peek_kind().to_string(),
                        key_pos,
                    ));
                }
                other => {
                    return Err(Error::expected(
                        "`name:` key in hash literal",
                        other.to_string(),
                        key_pos,
                    ));
                }
            };
            if self.at(&TokenKind::FatArrow) {
                return Err(Error::general(
                    "hash keys must use `name:` style; `=>` keys are not supported",
                    self.position(),
                ));
            }
            self.expect(&TokenKind::Colon, "hash literal")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "hash literal")?;
        Ok(Expression::HashLit(entries, position))
    }

    fn parse_case(&mut self) -> Result<CaseExpr, Error> {
        let position = self.expect_keyword(Keyword::Case, "case expression")?.span().start();
        let subject = self.parse_expression()?;

        let mut whens = Vec::new();
        while self.at_keyword(Keyword::When) {
            let when_pos = self.advance().span().start();
            let mut values = vec![self.parse_expression()?];
            while self.eat(&TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
            self.eat_keyword(Keyword::Then);
            let body = self.parse_body()?;
            whens.push(WhenClause {
                values,
                body,
                position: when_pos,
            });
        }
        if whens.is_empty() {
            return Err(Error::general(
                "case expression needs at least one when clause",
                position,
            ));
        }

        let else_body = if self.eat_keyword(Keyword::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::End, "case expression")?;

        Ok(CaseExpr {
            subject: Box::new(subject),
            whens,
            else_body,
            position,
        })
    }

    fn parse_yield(&mut self) -> Result<Expression, Error> {
        let position = self.expect_keyword(Keyword::Yield, "yield")?.span().start();
        let mut args = Vec::new();
        if self.at(&TokenKind::LParen) && !self.on_new_line() {
            self.advance();
            if !self.eat(&TokenKind::RParen) {
                loop {
                    args.push(self.parse_expression()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen, "yield arguments")?;
            }
        } else if self.starts_expression() {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(Expression::Yield(args, position))
    }

    fn parse_require(&mut self) -> Result<Expression, Error> {
        let position = self.expect_keyword(Keyword::Require, "require")?.span().start();
        let parens = self.at(&TokenKind::LParen) && !self.on_new_line();
        if parens {
            self.advance();
        }
        let name = self.parse_expression()?;
        let alias = if self.eat(&TokenKind::Comma) {
            let (label, label_pos) = self.expect_identifier("require")?;
            if label != "as" {
                return Err(Error::expected(
                    "'as:' in require",
                    format!("'{label}'"),
                    label_pos,
                ));
            }
            self.expect(&TokenKind::Colon, "require alias")?;
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        if parens {
            self.expect(&TokenKind::RParen, "require")?;
        }
        Ok(Expression::Require {
            name: Box::new(name),
            alias,
            position,
        })
    }
}

enum ClassMember {
    Method(FunctionDef),
    ClassMethod(FunctionDef),
}
