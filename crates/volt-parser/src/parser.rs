//! Statement parser: builds the template IR from a token stream.

use volt_syntax::ast::*;
use volt_syntax::error::{error, error_at, ErrorKind, Result};
use volt_syntax::token::{Token, TokenKind};

const EXTENDS_NOT_FIRST: &str = "Extends statement must be placed at the first line in the template";
const CHILD_ONLY_BLOCKS: &str = "Child templates only may contain blocks";

/// A construct opened by a tag and not yet closed.
enum Open {
    If {
        done: Vec<(Expr, Vec<Stmt>)>,
        // None once `else` has been seen
        cond: Option<Expr>,
    },
    For {
        key: Option<String>,
        value: String,
        iterable: Expr,
        filter: Option<Expr>,
        // main body, set once `else` has been seen
        main: Option<Vec<Stmt>>,
        has_break: bool,
        has_continue: bool,
    },
    Block(String),
    Autoescape(bool),
    Cache {
        key: Expr,
        lifetime: Option<Expr>,
    },
    Macro {
        name: String,
        params: Vec<MacroParam>,
    },
}

struct Frame {
    open: Open,
    body: Vec<Stmt>,
}

/// Recursive-descent parser over the tokens of one template.
///
/// Nesting is tracked with an explicit stack of open constructs: every
/// opening tag pushes a frame, every closing tag pops and checks it, and a
/// non-empty stack at the end of input is a syntax error.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    stack: Vec<Frame>,
    root: Vec<Stmt>,
    // a top-level statement or non-blank text was seen
    has_content: bool,
    extends: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            stack: Vec::new(),
            root: Vec::new(),
            has_content: false,
            extends: false,
        }
    }

    // ---- token navigation ----

    pub(crate) fn peek(&self) -> &Token {
        // the lexer always terminates the stream with Eof
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_at(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.unexpected()
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => self.unexpected(),
        }
    }

    /// Syntax error at the current token.
    ///
    /// The end of input and an empty `{{ }}` / `{% %}` region are reported
    /// as `EOF`, without a line. Anything else names the token and its line.
    pub(crate) fn unexpected<T>(&self) -> Result<T> {
        let tok = self.peek();
        let previous = self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| &t.kind);
        let empty_region = matches!(
            (previous, &tok.kind),
            (Some(TokenKind::PrintOpen), TokenKind::PrintClose) | (Some(TokenKind::TagOpen), TokenKind::TagClose)
        );
        if tok.kind == TokenKind::Eof || empty_region {
            return error(ErrorKind::Syntax, "Syntax error, unexpected EOF");
        }
        error_at(
            ErrorKind::Syntax,
            tok.line,
            format!("Syntax error, unexpected token {}", tok.kind.describe()),
        )
    }

    // ---- statements ----

    /// Parse the whole token stream into a template.
    pub fn parse_template(&mut self) -> Result<Template> {
        loop {
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Raw(text) => {
                    self.advance();
                    self.raw_text(text, tok.line)?;
                }
                TokenKind::PrintOpen => {
                    self.child_content_check(tok.line)?;
                    self.advance();
                    let expr = self.parse_expr()?;
                    self.expect(&TokenKind::PrintClose)?;
                    self.push_stmt(Stmt::Print(expr));
                }
                TokenKind::TagOpen => {
                    self.advance();
                    if !self.check(&TokenKind::Block) {
                        self.child_content_check(tok.line)?;
                    }
                    self.parse_tag(tok.line)?;
                }
                _ => return self.unexpected(),
            }
        }
        if !self.stack.is_empty() {
            return error(ErrorKind::Syntax, "Syntax error, unexpected EOF");
        }
        Ok(Template { body: std::mem::take(&mut self.root) })
    }

    fn raw_text(&mut self, text: String, line: usize) -> Result<()> {
        let blank = text.trim().is_empty();
        if self.stack.is_empty() && self.extends {
            if blank {
                return Ok(());
            }
            return error_at(ErrorKind::Structural, line, CHILD_ONLY_BLOCKS);
        }
        if blank {
            // whitespace never counts as content before `extends`
            match self.stack.last_mut() {
                Some(frame) => frame.body.push(Stmt::RawText(text)),
                None => self.root.push(Stmt::RawText(text)),
            }
            return Ok(());
        }
        self.push_stmt(Stmt::RawText(text));
        Ok(())
    }

    fn child_content_check(&self, line: usize) -> Result<()> {
        if self.stack.is_empty() && self.extends {
            return error_at(ErrorKind::Structural, line, CHILD_ONLY_BLOCKS);
        }
        Ok(())
    }

    fn push_stmt(&mut self, stmt: Stmt) {
        match self.stack.last_mut() {
            Some(frame) => frame.body.push(stmt),
            None => {
                self.has_content = true;
                self.root.push(stmt);
            }
        }
    }

    fn open(&mut self, open: Open) {
        if self.stack.is_empty() {
            self.has_content = true;
        }
        self.stack.push(Frame { open, body: Vec::new() });
    }

    fn close_tag(&mut self) -> Result<()> {
        self.expect(&TokenKind::TagClose)?;
        Ok(())
    }

    fn parse_tag(&mut self, line: usize) -> Result<()> {
        let kw = self.peek().clone();
        match kw.kind {
            TokenKind::If => {
                self.advance();
                let cond = self.parse_expr()?;
                self.close_tag()?;
                self.open(Open::If { done: Vec::new(), cond: Some(cond) });
            }
            TokenKind::ElseIf => {
                if !matches!(self.stack.last(), Some(Frame { open: Open::If { cond: Some(_), .. }, .. })) {
                    return self.unexpected();
                }
                self.advance();
                let next = self.parse_expr()?;
                self.close_tag()?;
                if let Some(Frame { open: Open::If { done, cond }, body }) = self.stack.last_mut() {
                    if let Some(prev) = cond.replace(next) {
                        done.push((prev, std::mem::take(body)));
                    }
                }
            }
            TokenKind::Else | TokenKind::ElseFor => self.parse_else(&kw.kind)?,
            TokenKind::EndIf
            | TokenKind::EndFor
            | TokenKind::EndBlock
            | TokenKind::EndAutoescape
            | TokenKind::EndCache
            | TokenKind::EndMacro => self.parse_end(&kw.kind)?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Set => {
                self.advance();
                let mut assignments = Vec::new();
                loop {
                    let target = self.parse_assign_target()?;
                    let op = match self.peek().kind {
                        TokenKind::Assign => AssignOp::Assign,
                        TokenKind::AddAssign => AssignOp::Add,
                        TokenKind::SubAssign => AssignOp::Sub,
                        TokenKind::MulAssign => AssignOp::Mul,
                        TokenKind::DivAssign => AssignOp::Div,
                        _ => return self.unexpected(),
                    };
                    self.advance();
                    let value = self.parse_expr()?;
                    assignments.push(Assignment { target, op, value });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.close_tag()?;
                self.push_stmt(Stmt::Set(assignments));
            }
            TokenKind::Do => {
                self.advance();
                let expr = self.parse_expr()?;
                self.close_tag()?;
                self.push_stmt(Stmt::Do(expr));
            }
            TokenKind::Return => {
                self.advance();
                let expr = self.parse_expr()?;
                self.close_tag()?;
                self.push_stmt(Stmt::Return(expr));
            }
            TokenKind::Break | TokenKind::Continue => {
                let is_break = kw.kind == TokenKind::Break;
                if !self.mark_loop_exit(is_break) {
                    return self.unexpected();
                }
                self.advance();
                self.close_tag()?;
                self.push_stmt(if is_break { Stmt::Break } else { Stmt::Continue });
            }
            TokenKind::Block => {
                self.advance();
                let name = self.expect_ident()?;
                self.close_tag()?;
                self.open(Open::Block(name));
            }
            TokenKind::Extends => {
                if self.has_content || !self.stack.is_empty() {
                    return error_at(ErrorKind::Structural, line, EXTENDS_NOT_FIRST);
                }
                self.advance();
                let path = self.parse_expr()?;
                self.close_tag()?;
                // only blank text can precede it; keep `extends` first in the body
                self.root.clear();
                self.push_stmt(Stmt::Extends { path, line: kw.line });
                self.extends = true;
            }
            TokenKind::Include => {
                self.advance();
                let path = self.parse_expr()?;
                let params = if self.eat(&TokenKind::With) { Some(self.parse_expr()?) } else { None };
                self.close_tag()?;
                self.push_stmt(Stmt::Include { path, params, line: kw.line });
            }
            TokenKind::Autoescape => {
                self.advance();
                let enabled = match self.peek().kind {
                    TokenKind::True => true,
                    TokenKind::False => false,
                    _ => return self.unexpected(),
                };
                self.advance();
                self.close_tag()?;
                self.open(Open::Autoescape(enabled));
            }
            TokenKind::Cache => {
                self.advance();
                let key = self.parse_expr()?;
                let lifetime = if self.check(&TokenKind::TagClose) { None } else { Some(self.parse_expr()?) };
                self.close_tag()?;
                self.open(Open::Cache { key, lifetime });
            }
            TokenKind::Macro => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&TokenKind::LParen)?;
                let mut params = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        let pname = self.expect_ident()?;
                        let default = if self.eat(&TokenKind::Assign) { Some(self.parse_expr()?) } else { None };
                        params.push(MacroParam { name: pname, default });
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen)?;
                self.close_tag()?;
                self.open(Open::Macro { name, params });
            }
            _ => return self.unexpected(),
        }
        Ok(())
    }

    fn parse_for(&mut self) -> Result<()> {
        self.advance();
        let first = self.expect_ident()?;
        let (key, value) = if self.eat(&TokenKind::Comma) {
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expr()?;
        let filter = if self.eat(&TokenKind::If) { Some(self.parse_expr()?) } else { None };
        self.close_tag()?;
        self.open(Open::For {
            key,
            value,
            iterable,
            filter,
            main: None,
            has_break: false,
            has_continue: false,
        });
        Ok(())
    }

    fn parse_else(&mut self, kind: &TokenKind) -> Result<()> {
        let accepts = match self.stack.last() {
            Some(Frame { open: Open::If { cond: Some(_), .. }, .. }) => *kind == TokenKind::Else,
            Some(Frame { open: Open::For { main: None, .. }, .. }) => true,
            _ => false,
        };
        if !accepts {
            return self.unexpected();
        }
        self.advance();
        self.close_tag()?;
        if let Some(frame) = self.stack.last_mut() {
            let body = std::mem::take(&mut frame.body);
            match &mut frame.open {
                Open::If { done, cond } => {
                    if let Some(c) = cond.take() {
                        done.push((c, body));
                    }
                }
                Open::For { main, .. } => *main = Some(body),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_end(&mut self, kind: &TokenKind) -> Result<()> {
        let matches = match self.stack.last() {
            Some(frame) => matches!(
                (&frame.open, kind),
                (Open::If { .. }, TokenKind::EndIf)
                    | (Open::For { .. }, TokenKind::EndFor)
                    | (Open::Block(_), TokenKind::EndBlock)
                    | (Open::Autoescape(_), TokenKind::EndAutoescape)
                    | (Open::Cache { .. }, TokenKind::EndCache)
                    | (Open::Macro { .. }, TokenKind::EndMacro)
            ),
            None => false,
        };
        if !matches {
            return self.unexpected();
        }
        self.advance();
        self.close_tag()?;
        let Some(Frame { open, body }) = self.stack.pop() else {
            return self.unexpected();
        };
        let stmt = match open {
            Open::If { mut done, cond } => match cond {
                Some(c) => {
                    done.push((c, body));
                    Stmt::If { branches: done, else_body: None }
                }
                None => Stmt::If { branches: done, else_body: Some(body) },
            },
            Open::For { key, value, iterable, filter, main, has_break, has_continue } => {
                let (body, else_body) = match main {
                    Some(main) => (main, Some(body)),
                    None => (body, None),
                };
                Stmt::For(ForLoop { key, value, iterable, filter, body, else_body, has_break, has_continue })
            }
            Open::Block(name) => Stmt::Block { name, body },
            Open::Autoescape(enabled) => Stmt::Autoescape { enabled, body },
            Open::Cache { key, lifetime } => Stmt::Cache { key, lifetime, body },
            Open::Macro { name, params } => Stmt::Macro { name, params, body },
        };
        match self.stack.last_mut() {
            Some(frame) => frame.body.push(stmt),
            None => self.root.push(stmt),
        }
        Ok(())
    }

    /// Flags the innermost enclosing loop; macros are a boundary.
    fn mark_loop_exit(&mut self, is_break: bool) -> bool {
        for frame in self.stack.iter_mut().rev() {
            match &mut frame.open {
                Open::For { has_break, has_continue, .. } => {
                    if is_break {
                        *has_break = true;
                    } else {
                        *has_continue = true;
                    }
                    return true;
                }
                Open::Macro { .. } => return false,
                _ => {}
            }
        }
        false
    }
}
