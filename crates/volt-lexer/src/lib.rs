//! Volt lexer: converts template text into tokens.
use volt_syntax::delimiters::Delimiters;
use volt_syntax::error::{error, error_at, ErrorKind, Result};
use volt_syntax::token::{Token, TokenKind};

/// Longest excerpt quoted by a scanning error before it is cut off.
const EXCERPT_LEN: usize = 16;

struct Markers {
    print_open: Vec<char>,
    print_close: Vec<char>,
    tag_open: Vec<char>,
    tag_close: Vec<char>,
    comment_open: Vec<char>,
    comment_close: Vec<char>,
}

impl Markers {
    fn from(d: &Delimiters) -> Self {
        Self {
            print_open: d.print_open.chars().collect(),
            print_close: d.print_close.chars().collect(),
            tag_open: d.tag_open.chars().collect(),
            tag_close: d.tag_close.chars().collect(),
            comment_open: d.comment_open.chars().collect(),
            comment_close: d.comment_close.chars().collect(),
        }
    }
}

/// Streaming character scanner that produces tokens with positions.
///
/// The scanner starts in text mode and collects literal text until one of
/// the opening markers. Print and tag regions are split into expression
/// tokens up to their closing marker; comment regions are skipped.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    markers: Markers,
    // open `{` inside the current region
    brace_depth: usize,
}

impl Lexer {
    /// Create a new lexer over the given template using the default markers.
    pub fn new(input: &str) -> Self {
        Self::with_delimiters(input, &Delimiters::default())
    }

    /// Create a lexer that recognizes custom region markers.
    pub fn with_delimiters(input: &str, delimiters: &Delimiters) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            markers: Markers::from(delimiters),
            brace_depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }
    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }
    fn advance(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        ch
    }
    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn starts_with_at(&self, at: usize, pat: &[char]) -> bool {
        !pat.is_empty() && self.src.len() >= at + pat.len() && self.src[at..at + pat.len()] == *pat
    }
    fn starts_with(&self, pat: &[char]) -> bool {
        self.starts_with_at(self.pos, pat)
    }

    fn at_region_open(&self) -> bool {
        self.starts_with(&self.markers.comment_open)
            || self.starts_with(&self.markers.tag_open)
            || self.starts_with(&self.markers.print_open)
    }

    // `<%=` vs `<%`: the longer opening marker wins
    fn print_shadows_tag(&self) -> bool {
        self.markers.print_open.len() > self.markers.tag_open.len() && self.starts_with(&self.markers.print_open)
    }

    /// Length of a `{% word %}` tag starting at `at`, whitespace allowed inside.
    fn tag_word_len(&self, at: usize, word: &str) -> Option<usize> {
        let mut i = at;
        if !self.starts_with_at(i, &self.markers.tag_open) {
            return None;
        }
        i += self.markers.tag_open.len();
        while self.src.get(i).map_or(false, |c| c.is_whitespace()) {
            i += 1;
        }
        for w in word.chars() {
            if self.src.get(i) != Some(&w) {
                return None;
            }
            i += 1;
        }
        if self.src.get(i).map_or(false, |c| c.is_ascii_alphanumeric() || *c == '_') {
            return None;
        }
        while self.src.get(i).map_or(false, |c| c.is_whitespace()) {
            i += 1;
        }
        if !self.starts_with_at(i, &self.markers.tag_close) {
            return None;
        }
        Some(i + self.markers.tag_close.len() - at)
    }

    fn make_token(&self, kind: TokenKind, line: usize, col: usize) -> Token {
        Token { kind, line, col }
    }

    fn scanning_error<T>(&self, line: usize) -> Result<T> {
        let rest: Vec<char> = self.src.iter().skip(self.pos + 1).copied().collect();
        if rest.is_empty() {
            return error_at(ErrorKind::Scanning, line, "Scanning error near to EOF");
        }
        let msg = if rest.len() > EXCERPT_LEN {
            let head: String = rest[..EXCERPT_LEN].iter().collect();
            format!("Scanning error before '{}...'", head)
        } else {
            let all: String = rest.iter().collect();
            format!("Scanning error before '{}'", all)
        };
        error_at(ErrorKind::Scanning, line, msg)
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start_line = self.line;
        self.advance_by(self.markers.comment_open.len());
        while self.peek().is_some() {
            if self.starts_with(&self.markers.comment_close) {
                self.advance_by(self.markers.comment_close.len());
                return Ok(());
            }
            self.advance();
        }
        self.scanning_error(start_line)
    }

    fn read_raw_block(&mut self, open_len: usize) -> Result<Token> {
        let line = self.line;
        let col = self.col;
        self.advance_by(open_len);
        let mut text = String::new();
        loop {
            if let Some(n) = self.tag_word_len(self.pos, "endraw") {
                self.advance_by(n);
                return Ok(self.make_token(TokenKind::Raw(text), line, col));
            }
            match self.advance() {
                Some(c) => text.push(c),
                None => return error(ErrorKind::Syntax, "Syntax error, unexpected EOF"),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let is_double = self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit());
        if !is_double {
            return self.make_token(TokenKind::Integer(s), start_line, start_col);
        }
        s.push('.');
        self.advance();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.make_token(TokenKind::Double(s), start_line, start_col)
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = TokenKind::keyword(&s).unwrap_or(TokenKind::Ident(s));
        self.make_token(kind, start_line, start_col)
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        let start_line = self.line;
        let start_col = self.col;
        let start_pos = self.pos;
        self.advance();
        let mut s = String::new();
        while let Some(c) = self.advance() {
            match c {
                c if c == quote => {
                    return Ok(self.make_token(TokenKind::Str(s), start_line, start_col));
                }
                '\\' => match self.peek() {
                    Some(n @ ('\\' | '\'' | '"')) => {
                        s.push(n);
                        self.advance();
                    }
                    _ => s.push('\\'),
                },
                other => s.push(other),
            }
        }
        self.pos = start_pos;
        self.scanning_error(start_line)
    }

    /// Two- and three-character operators first, then single characters.
    fn read_operator(&mut self) -> Option<TokenKind> {
        let c = self.peek()?;
        let n = self.peek_next();
        let third = self.src.get(self.pos + 2).copied();
        let (kind, len) = match (c, n) {
            ('=', Some('=')) if third == Some('=') => (TokenKind::Identical, 3),
            ('!', Some('=')) if third == Some('=') => (TokenKind::NotIdentical, 3),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::LessEq, 2),
            ('>', Some('=')) => (TokenKind::GreaterEq, 2),
            ('+', Some('+')) => (TokenKind::Incr, 2),
            ('-', Some('-')) => (TokenKind::Decr, 2),
            ('+', Some('=')) => (TokenKind::AddAssign, 2),
            ('-', Some('=')) => (TokenKind::SubAssign, 2),
            ('*', Some('=')) => (TokenKind::MulAssign, 2),
            ('/', Some('=')) => (TokenKind::DivAssign, 2),
            ('*', Some('*')) => (TokenKind::StarStar, 2),
            ('.', Some('.')) => (TokenKind::DotDot, 2),
            ('=', _) => (TokenKind::Assign, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('<', _) => (TokenKind::Less, 1),
            ('>', _) => (TokenKind::Greater, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('.', _) => (TokenKind::Dot, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('?', _) => (TokenKind::Question, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            _ => return None,
        };
        self.advance_by(len);
        Some(kind)
    }

    /// Tokenize a print or tag region up to and including its closing marker.
    ///
    /// An unterminated region simply ends at the end of input; the parser
    /// reports the missing closer.
    fn tokenize_region(&mut self, close_kind: TokenKind, tokens: &mut Vec<Token>) -> Result<()> {
        let close = match close_kind {
            TokenKind::PrintClose => self.markers.print_close.clone(),
            _ => self.markers.tag_close.clone(),
        };
        self.brace_depth = 0;
        loop {
            self.skip_whitespace();
            let line = self.line;
            let col = self.col;
            let Some(c) = self.peek() else {
                return Ok(());
            };
            let nested_brace = self.brace_depth > 0 && c == '}';
            if !nested_brace && self.starts_with(&close) {
                self.advance_by(close.len());
                tokens.push(self.make_token(close_kind, line, col));
                return Ok(());
            }
            let tk = match c {
                '"' | '\'' => self.read_string(c)?,
                c if c.is_ascii_digit() => self.read_number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.read_ident_or_keyword(),
                _ => match self.read_operator() {
                    Some(kind) => {
                        match kind {
                            TokenKind::LBrace => self.brace_depth += 1,
                            TokenKind::RBrace => self.brace_depth = self.brace_depth.saturating_sub(1),
                            _ => {}
                        }
                        self.make_token(kind, line, col)
                    }
                    None => return self.scanning_error(line),
                },
            };
            tokens.push(tk);
        }
    }

    /// Tokenize the entire input into a vector of tokens ending with Eof.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let line = self.line;
            let col = self.col;
            let mut text = String::new();
            while self.peek().is_some() && !self.at_region_open() {
                if let Some(c) = self.advance() {
                    text.push(c);
                }
            }
            if !text.is_empty() {
                tokens.push(self.make_token(TokenKind::Raw(text), line, col));
            }
            if self.peek().is_none() {
                break;
            }
            let line = self.line;
            let col = self.col;
            if self.starts_with(&self.markers.comment_open) {
                self.skip_comment()?;
            } else if self.starts_with(&self.markers.tag_open) && !self.print_shadows_tag() {
                if let Some(n) = self.tag_word_len(self.pos, "raw") {
                    let raw = self.read_raw_block(n)?;
                    tokens.push(raw);
                    continue;
                }
                self.advance_by(self.markers.tag_open.len());
                tokens.push(self.make_token(TokenKind::TagOpen, line, col));
                self.tokenize_region(TokenKind::TagClose, &mut tokens)?;
            } else {
                self.advance_by(self.markers.print_open.len());
                tokens.push(self.make_token(TokenKind::PrintOpen, line, col));
                self.tokenize_region(TokenKind::PrintClose, &mut tokens)?;
            }
        }
        tokens.push(self.make_token(TokenKind::Eof, self.line, self.col));
        Ok(tokens)
    }
}
