//! Token definitions produced by the Volt lexer.
//!
//! A template is a sequence of literal text interleaved with three kinds of
//! regions: prints (`{{ ... }}`), tags (`{% ... %}`) and comments
//! (`{# ... #}`). Literal text becomes a single [`TokenKind::Raw`] token, the
//! region delimiters become open/close tokens, and everything between them is
//! split into expression tokens. Comments produce no tokens at all.
//!
//! # Token Categories
//!
//! - **Text**: [`Raw`](TokenKind::Raw) literal output
//! - **Delimiters**: print and tag open/close markers
//! - **Literals**: integers, doubles and strings
//! - **Keywords**: statement words (`if`, `for`, `block`) and word operators (`and`, `is`)
//! - **Operators**: arithmetic, comparison, assignment, pipe and range
//! - **Punctuation**: brackets, braces, commas and colons
//! - **Special**: end-of-file marker
//!
//! # Examples
//!
//! ```rust
//! use volt_syntax::{Token, TokenKind};
//!
//! let open = Token { kind: TokenKind::PrintOpen, line: 1, col: 1 };
//! let name = Token { kind: TokenKind::Ident("user".to_string()), line: 1, col: 4 };
//! assert_eq!(name.kind.describe(), "IDENTIFIER(user)");
//! assert_eq!(open.kind.describe(), "{{");
//! ```

use serde::Serialize;

/// Token types that can be produced by the Volt lexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    // === Text and delimiters ===

    /// Literal template text outside of any region
    Raw(String),

    /// Print region start, `{{` by default
    PrintOpen,

    /// Print region end, `}}` by default
    PrintClose,

    /// Tag region start, `{%` by default
    TagOpen,

    /// Tag region end, `%}` by default
    TagClose,

    // === Literals ===

    /// An identifier (variable, function, filter, block or macro name)
    Ident(String),

    /// An integer literal, kept as written
    Integer(String),

    /// A decimal literal, kept as written
    Double(String),

    /// A quoted string literal with `\\`, `\'` and `\"` escapes resolved
    Str(String),

    // === Keywords ===
    If,
    ElseIf,
    Else,
    EndIf,
    For,
    ElseFor,
    EndFor,
    In,
    Set,
    Do,
    Block,
    EndBlock,
    Extends,
    Include,
    With,
    Autoescape,
    EndAutoescape,
    Cache,
    EndCache,
    Macro,
    EndMacro,
    Return,
    Break,
    Continue,
    RawTag,
    EndRaw,
    And,
    Or,
    Not,
    Is,
    True,
    False,
    Null,

    // === Punctuation ===

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `.`
    Dot,

    // === Operators ===

    /// Range operator `..`
    DotDot,
    /// Filter pipe `|`
    Pipe,
    /// String concatenation `~`
    Tilde,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// Power `**`
    StarStar,
    /// `!`
    Bang,
    /// `++`
    Incr,
    /// `--`
    Decr,
    /// Assignment `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `===`
    Identical,
    /// `!==`
    NotIdentical,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,

    /// End-of-file marker
    Eof,
}

impl TokenKind {
    /// Maps a word to its keyword token, or `None` for plain identifiers.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "if" => TokenKind::If,
            "elseif" => TokenKind::ElseIf,
            "else" => TokenKind::Else,
            "endif" => TokenKind::EndIf,
            "for" => TokenKind::For,
            "elsefor" => TokenKind::ElseFor,
            "endfor" => TokenKind::EndFor,
            "in" => TokenKind::In,
            "set" => TokenKind::Set,
            "do" => TokenKind::Do,
            "block" => TokenKind::Block,
            "endblock" => TokenKind::EndBlock,
            "extends" => TokenKind::Extends,
            "include" => TokenKind::Include,
            "with" => TokenKind::With,
            "autoescape" => TokenKind::Autoescape,
            "endautoescape" => TokenKind::EndAutoescape,
            "cache" => TokenKind::Cache,
            "endcache" => TokenKind::EndCache,
            "macro" => TokenKind::Macro,
            "endmacro" => TokenKind::EndMacro,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "raw" => TokenKind::RawTag,
            "endraw" => TokenKind::EndRaw,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => return None,
        };
        Some(kind)
    }

    /// Source spelling of a keyword token.
    ///
    /// Used where a keyword is valid as a plain name, such as a property
    /// after a dot (`item.block`) or a named argument key.
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::If => "if",
            TokenKind::ElseIf => "elseif",
            TokenKind::Else => "else",
            TokenKind::EndIf => "endif",
            TokenKind::For => "for",
            TokenKind::ElseFor => "elsefor",
            TokenKind::EndFor => "endfor",
            TokenKind::In => "in",
            TokenKind::Set => "set",
            TokenKind::Do => "do",
            TokenKind::Block => "block",
            TokenKind::EndBlock => "endblock",
            TokenKind::Extends => "extends",
            TokenKind::Include => "include",
            TokenKind::With => "with",
            TokenKind::Autoescape => "autoescape",
            TokenKind::EndAutoescape => "endautoescape",
            TokenKind::Cache => "cache",
            TokenKind::EndCache => "endcache",
            TokenKind::Macro => "macro",
            TokenKind::EndMacro => "endmacro",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::RawTag => "raw",
            TokenKind::EndRaw => "endraw",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Is => "is",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            _ => return None,
        };
        Some(text)
    }

    /// Name of the token as it appears in syntax error messages.
    ///
    /// Value tokens carry their content (`IDENTIFIER(y)`, `INTEGER(10)`),
    /// keywords are upper-cased (`IF`), the member-access dot is `DOT` and
    /// every other operator is shown as written (`++`, `~`).
    pub fn describe(&self) -> String {
        if let Some(word) = self.keyword_text() {
            return word.to_uppercase();
        }
        let text = match self {
            TokenKind::Raw(_) => "RAW_FRAGMENT",
            TokenKind::Ident(s) => return format!("IDENTIFIER({})", s),
            TokenKind::Integer(s) => return format!("INTEGER({})", s),
            TokenKind::Double(s) => return format!("DOUBLE({})", s),
            TokenKind::Str(s) => return format!("STRING({})", s),
            TokenKind::PrintOpen => "{{",
            TokenKind::PrintClose => "}}",
            TokenKind::TagOpen => "{%",
            TokenKind::TagClose => "%}",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Question => "?",
            TokenKind::Dot => "DOT",
            TokenKind::DotDot => "..",
            TokenKind::Pipe => "|",
            TokenKind::Tilde => "~",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::StarStar => "**",
            TokenKind::Bang => "!",
            TokenKind::Incr => "++",
            TokenKind::Decr => "--",
            TokenKind::Assign => "=",
            TokenKind::AddAssign => "+=",
            TokenKind::SubAssign => "-=",
            TokenKind::MulAssign => "*=",
            TokenKind::DivAssign => "/=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Identical => "===",
            TokenKind::NotIdentical => "!==",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::Eof => "EOF",
            _ => "UNKNOWN",
        };
        text.to_string()
    }
}

/// A token with its source location information.
///
/// # Fields
///
/// - `kind`: the type and content of the token
/// - `line`: 1-based line number where the token starts
/// - `col`: 1-based column number where the token starts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The type and semantic content of this token
    pub kind: TokenKind,

    /// Line number in the template (1-based)
    pub line: usize,

    /// Column number in the template (1-based)
    pub col: usize,
}
