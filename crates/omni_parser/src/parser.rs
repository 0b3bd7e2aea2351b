//! Pratt parser with explicit operator precedence
//!
//! The parser walks the token stream with a one-token lookahead and
//! dispatches expressions through prefix/infix parse routines keyed by
//! token kind. Statements leave the cursor on their final token; the
//! program loop advances between statements.

use crate::lexer::Lexer;
use omni_ast::*;

/// Operator binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assign,      // =
    Equals,      // == !=
    LessGreater, // < >
    Sum,         // + -
    Product,     // * /
    Prefix,      // !x -x
    Call,        // f(x) a[i] a.b
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Assign => Precedence::Assign,
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
        TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

pub struct Parser {
    lexer: Lexer,
    cur: Token,
    peek: Token,
    errors: Vec<String>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        let mut p = Parser {
            lexer,
            cur: Token::new(TokenKind::Eof, "", 0, 0),
            peek: Token::new(TokenKind::Eof, "", 0, 0),
            errors: Vec::new(),
        };
        p.next_token();
        p.next_token();
        p
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    fn next_token(&mut self) {
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek.kind == kind {
            self.next_token();
            true
        } else {
            self.errors.push(format!(
                "line {}: expected {:?}, got '{}'",
                self.peek.line, kind, self.peek.literal
            ));
            false
        }
    }

    fn error_at_cur(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        self.errors
            .push(format!("line {}: {}", self.cur.line, msg));
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while self.cur.kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }
        Program { statements }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur.kind {
            TokenKind::Let | TokenKind::Const => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Class => self.parse_class_statement(),
            TokenKind::Interface => self.parse_interface_statement(),
            TokenKind::Enum => self.parse_enum_statement(),
            TokenKind::Type => self.parse_type_alias_statement(),
            TokenKind::Declare => self.parse_declare_statement(),
            TokenKind::Import => self.parse_import_statement(),
            TokenKind::Export => self.parse_export_statement(),
            TokenKind::Spawn => self.parse_spawn_statement(),
            TokenKind::LBrace => self.parse_block_statement().map(Stmt::Block),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_ident();

        let ty = if self.peek.kind == TokenKind::Colon {
            self.next_token();
            self.next_token();
            Some(self.parse_type_spelling())
        } else {
            None
        };

        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.eat_optional_semicolon();
        Some(Stmt::Let(LetStmt {
            token,
            name,
            ty,
            value,
        }))
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        let value = if self.peek.kind == TokenKind::Semicolon {
            None
        } else {
            self.next_token();
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        self.eat_optional_semicolon();
        Some(Stmt::Return(ReturnStmt { token, value }))
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.eat_optional_semicolon();
        Some(Stmt::Expr(ExprStmt { token, expr }))
    }

    /// Parses `{ ... }` with the cursor on the opening brace.
    fn parse_block_statement(&mut self) -> Option<BlockStmt> {
        let token = self.cur.clone();
        let mut statements = Vec::new();
        self.next_token();
        while self.cur.kind != TokenKind::RBrace && self.cur.kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }
        if self.cur.kind != TokenKind::RBrace {
            self.error_at_cur("unterminated block, expected '}'");
            return None;
        }
        Some(BlockStmt { token, statements })
    }

    fn parse_while_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Stmt::While(WhileStmt {
            token,
            condition,
            body,
        }))
    }

    fn parse_for_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }

        // Init clause: a let or expression statement, or empty. Statement
        // parsing consumes the separating semicolon.
        self.next_token();
        let init = if self.cur.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_statement()?)
        };

        // Condition clause.
        let condition = if self.peek.kind == TokenKind::Semicolon {
            self.next_token();
            None
        } else {
            self.next_token();
            let cond = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Semicolon) {
                return None;
            }
            Some(cond)
        };

        // Update clause: an expression (usually an assignment), no
        // trailing semicolon.
        let update = if self.peek.kind == TokenKind::RParen {
            None
        } else {
            self.next_token();
            let tok = self.cur.clone();
            let expr = self.parse_expression(Precedence::Lowest)?;
            Some(Stmt::Expr(ExprStmt { token: tok, expr }))
        };

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Stmt::For(Box::new(ForStmt {
            token,
            init,
            condition,
            update,
            body,
        })))
    }

    fn parse_class_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_ident();

        let parent = if self.peek.kind == TokenKind::Extends {
            self.next_token();
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            Some(self.cur_ident())
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.peek.kind == TokenKind::Implements {
            self.next_token();
            loop {
                if !self.expect_peek(TokenKind::Ident) {
                    return None;
                }
                implements.push(self.cur_ident());
                if self.peek.kind == TokenKind::Comma {
                    self.next_token();
                } else {
                    break;
                }
            }
        }

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while self.peek.kind != TokenKind::RBrace && self.peek.kind != TokenKind::Eof {
            self.next_token();
            if self.cur.kind != TokenKind::Ident {
                self.error_at_cur(format!(
                    "expected field or method name in class body, got '{}'",
                    self.cur.literal
                ));
                return None;
            }
            match self.peek.kind {
                // `name(params): R { ... }` is a method.
                TokenKind::LParen => {
                    let method = self.parse_method_tail()?;
                    methods.push(method);
                }
                // `name: T [= expr];` is a field.
                TokenKind::Colon => {
                    let field = self.parse_field_tail()?;
                    fields.push(field);
                }
                _ => {
                    self.error_at_cur(format!(
                        "expected '(' or ':' after '{}' in class body",
                        self.cur.literal
                    ));
                    return None;
                }
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }

        Some(Stmt::Class(ClassDecl {
            token,
            name,
            parent,
            implements,
            fields,
            methods,
        }))
    }

    /// Cursor on a method name; parses `(params)[: R] { body }`.
    fn parse_method_tail(&mut self) -> Option<FnLit> {
        let token = self.cur.clone();
        let name = self.cur.literal.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let params = self.parse_typed_params()?;
        let return_type = self.parse_optional_return_type();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(FnLit {
            token,
            name,
            params,
            return_type,
            body,
        })
    }

    /// Cursor on a field name; parses `: T [= expr];`.
    fn parse_field_tail(&mut self) -> Option<Field> {
        let token = self.cur.clone();
        let name = self.cur_ident();
        if !self.expect_peek(TokenKind::Colon) {
            return None;
        }
        self.next_token();
        let ty = self.parse_type_spelling();
        let value = if self.peek.kind == TokenKind::Assign {
            self.next_token();
            self.next_token();
            Some(self.parse_expression(Precedence::Lowest)?)
        } else {
            None
        };
        self.eat_optional_semicolon();
        Some(Field {
            token,
            name,
            ty,
            value,
        })
    }

    fn parse_interface_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_ident();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }

        let mut methods = Vec::new();
        while self.peek.kind != TokenKind::RBrace && self.peek.kind != TokenKind::Eof {
            self.next_token();
            if self.cur.kind != TokenKind::Ident {
                self.error_at_cur(format!(
                    "expected method signature in interface body, got '{}'",
                    self.cur.literal
                ));
                return None;
            }
            let sig_token = self.cur.clone();
            let sig_name = self.cur.literal.clone();
            if !self.expect_peek(TokenKind::LParen) {
                return None;
            }
            let params = self.parse_typed_params()?;
            let return_type = self.parse_optional_return_type();
            self.eat_optional_semicolon();
            methods.push(MethodSig {
                token: sig_token,
                name: sig_name,
                params,
                return_type,
            });
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Stmt::Interface(InterfaceDecl {
            token,
            name,
            methods,
        }))
    }

    fn parse_enum_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_ident();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }

        let mut members = Vec::new();
        while self.peek.kind != TokenKind::RBrace && self.peek.kind != TokenKind::Eof {
            self.next_token();
            if self.cur.kind == TokenKind::Comma {
                continue;
            }
            if self.cur.kind != TokenKind::Ident {
                self.error_at_cur(format!(
                    "expected enum member name, got '{}'",
                    self.cur.literal
                ));
                return None;
            }
            let member_name = self.cur_ident();
            let value = if self.peek.kind == TokenKind::Assign {
                self.next_token();
                self.next_token();
                Some(self.parse_expression(Precedence::Lowest)?)
            } else {
                None
            };
            members.push(EnumMember {
                name: member_name,
                value,
            });
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Stmt::Enum(EnumDecl {
            token,
            name,
            members,
        }))
    }

    fn parse_type_alias_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_ident();
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let target = self.parse_type_spelling();
        self.eat_optional_semicolon();
        Some(Stmt::TypeAlias(TypeAliasDecl {
            token,
            name,
            target,
        }))
    }

    fn parse_declare_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Function) {
            return None;
        }
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_ident();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let params = self.parse_typed_params()?;
        let return_type = self.parse_optional_return_type();
        self.eat_optional_semicolon();
        Some(Stmt::Declare(DeclareStmt {
            token,
            name,
            params,
            return_type,
        }))
    }

    fn parse_import_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let mut names = Vec::new();
        if self.peek.kind != TokenKind::RBrace {
            loop {
                if !self.expect_peek(TokenKind::Ident) {
                    return None;
                }
                names.push(self.cur_ident());
                if self.peek.kind == TokenKind::Comma {
                    self.next_token();
                } else {
                    break;
                }
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        // `from` is an ordinary identifier, not a keyword.
        if !self.expect_peek(TokenKind::Ident) || self.cur.literal != "from" {
            self.error_at_cur("expected 'from' in import statement");
            return None;
        }
        if !self.expect_peek(TokenKind::Str) {
            return None;
        }
        let source = self.cur.literal.clone();
        self.eat_optional_semicolon();
        Some(Stmt::Import(ImportStmt {
            token,
            names,
            source,
        }))
    }

    fn parse_export_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        self.next_token();
        let inner = self.parse_statement()?;
        Some(Stmt::Export(ExportStmt {
            token,
            inner: Box::new(inner),
        }))
    }

    fn parse_spawn_statement(&mut self) -> Option<Stmt> {
        let token = self.cur.clone();
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.eat_optional_semicolon();
        match expr {
            Expr::Call(call) => Some(Stmt::Spawn(SpawnStmt { token, call })),
            _ => {
                self.errors.push(format!(
                    "line {}: spawn expects a direct function call",
                    token.line
                ));
                None
            }
        }
    }

    // ---- Expressions ----

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;
        while self.peek.kind != TokenKind::Semicolon && precedence < precedence_of(self.peek.kind)
        {
            self.next_token();
            left = self.parse_infix(left)?;
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.cur.kind {
            TokenKind::Ident => Some(Expr::Ident(self.cur_ident())),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::Str => Some(Expr::Str(StrLit {
                token: self.cur.clone(),
                value: self.cur.literal.clone(),
            })),
            TokenKind::True | TokenKind::False => Some(Expr::Bool(BoolLit {
                token: self.cur.clone(),
                value: self.cur.kind == TokenKind::True,
            })),
            TokenKind::Bang => self.parse_prefix_expression(PrefixOp::Not),
            TokenKind::Minus => self.parse_prefix_expression(PrefixOp::Neg),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::New => self.parse_new_expression(),
            TokenKind::This => Some(Expr::This(ThisExpr {
                token: self.cur.clone(),
            })),
            TokenKind::Super => Some(Expr::Super(SuperExpr {
                token: self.cur.clone(),
            })),
            _ => {
                self.error_at_cur(format!(
                    "no prefix parse rule for '{}'",
                    self.cur.literal
                ));
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        match self.cur.kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Asterisk
            | TokenKind::Slash
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt => self.parse_infix_expression(left),
            TokenKind::Assign => self.parse_assign_expression(left),
            TokenKind::LParen => self.parse_call_expression(left),
            TokenKind::LBracket => self.parse_index_expression(left),
            TokenKind::Dot => self.parse_member_expression(left),
            _ => Some(left),
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        let token = self.cur.clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Some(Expr::Int(IntLit { token, value })),
            Err(_) => {
                self.error_at_cur(format!(
                    "could not parse '{}' as integer",
                    token.literal
                ));
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self, op: PrefixOp) -> Option<Expr> {
        let token = self.cur.clone();
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Prefix(PrefixExpr {
            token,
            op,
            right: Box::new(right),
        }))
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let token = self.cur.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expr::Array(ArrayLit { token, elements }))
    }

    fn parse_map_literal(&mut self) -> Option<Expr> {
        let token = self.cur.clone();
        let mut pairs = Vec::new();
        while self.peek.kind != TokenKind::RBrace {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if self.peek.kind != TokenKind::RBrace && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expr::Map(MapLit { token, pairs }))
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement()?;
        let alternative = if self.peek.kind == TokenKind::Else {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block_statement()?)
        } else {
            None
        };
        Some(Expr::If(Box::new(IfExpr {
            token,
            condition,
            consequence,
            alternative,
        })))
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        let token = self.cur.clone();
        let name = if self.peek.kind == TokenKind::Ident {
            self.next_token();
            self.cur.literal.clone()
        } else {
            String::new()
        };
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let params = self.parse_typed_params()?;
        let return_type = self.parse_optional_return_type();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Expr::Function(FnLit {
            token,
            name,
            params,
            return_type,
            body,
        }))
    }

    fn parse_new_expression(&mut self) -> Option<Expr> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let class = self.cur_ident();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr::New(NewExpr {
            token,
            class,
            arguments,
        }))
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.cur.clone();
        let op = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Asterisk => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            _ => unreachable!("parse_infix_expression called on non-operator"),
        };
        let precedence = precedence_of(token.kind);
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix(InfixExpr {
            token,
            left: Box::new(left),
            op,
            right: Box::new(right),
        }))
    }

    /// Assignment is right-associative: the right side is parsed at the
    /// lowest precedence so `a = b = c` nests as `a = (b = c)`.
    fn parse_assign_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.cur.clone();
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Expr::Assign(AssignExpr {
            token,
            target: Box::new(left),
            value: Box::new(value),
        }))
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Option<Expr> {
        let token = self.cur.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr::Call(CallExpr {
            token,
            callee: Box::new(callee),
            arguments,
        }))
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.cur.clone();
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expr::Index(IndexExpr {
            token,
            left: Box::new(left),
            index: Box::new(index),
        }))
    }

    fn parse_member_expression(&mut self, object: Expr) -> Option<Expr> {
        let token = self.cur.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let property = self.cur_ident();
        Some(Expr::Member(MemberExpr {
            token,
            object: Box::new(object),
            property,
        }))
    }

    /// Parses a comma-separated expression list with the cursor on the
    /// opening delimiter; leaves the cursor on `end`.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();
        if self.peek.kind == end {
            self.next_token();
            return Some(list);
        }
        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek.kind == TokenKind::Comma {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    // ---- Shared pieces ----

    fn cur_ident(&self) -> Ident {
        Ident {
            token: self.cur.clone(),
            name: self.cur.literal.clone(),
        }
    }

    fn eat_optional_semicolon(&mut self) {
        if self.peek.kind == TokenKind::Semicolon {
            self.next_token();
        }
    }

    /// Parses `name: Type` pairs up to the closing paren, with the cursor
    /// on the opening paren. Leaves the cursor on the closing paren.
    fn parse_typed_params(&mut self) -> Option<Vec<Field>> {
        let mut params = Vec::new();
        if self.peek.kind == TokenKind::RParen {
            self.next_token();
            return Some(params);
        }
        loop {
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            let token = self.cur.clone();
            let name = self.cur_ident();
            let ty = if self.peek.kind == TokenKind::Colon {
                self.next_token();
                self.next_token();
                self.parse_type_spelling()
            } else {
                String::new()
            };
            params.push(Field {
                token,
                name,
                ty,
                value: None,
            });
            if self.peek.kind == TokenKind::Comma {
                self.next_token();
            } else {
                break;
            }
        }
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(params)
    }

    /// Parses `[: Type]` after a parameter list; defaults to "void".
    fn parse_optional_return_type(&mut self) -> String {
        if self.peek.kind == TokenKind::Colon {
            self.next_token();
            self.next_token();
            self.parse_type_spelling()
        } else {
            "void".to_string()
        }
    }

    /// Captures a type spelling as a raw string with the cursor on its
    /// first token. A balanced `<...>` suffix is folded into the
    /// spelling, so `Array<int>` and `Map<string,int>` come back whole.
    fn parse_type_spelling(&mut self) -> String {
        let mut spelling = self.cur.literal.clone();
        if self.peek.kind == TokenKind::Lt {
            self.next_token();
            spelling.push('<');
            let mut depth = 1usize;
            while depth > 0 && self.peek.kind != TokenKind::Eof {
                self.next_token();
                match self.cur.kind {
                    TokenKind::Lt => {
                        depth += 1;
                        spelling.push('<');
                    }
                    TokenKind::Gt => {
                        depth -= 1;
                        spelling.push('>');
                    }
                    TokenKind::Comma => spelling.push(','),
                    _ => spelling.push_str(&self.cur.literal),
                }
            }
        }
        spelling
    }
}
