//! bu-lexer : analyse lexicale pour bu
//!
//! Faits saillants :
//! - `Lexer` + `LexerOptions` : commentaires `//`, `/* */` (imbriqués en option),
//!   entiers, flottants (`1.5`, `.5`, `2.`), chaînes avec échappements
//! - keywords are matched case-insensitively (`VAR`, `Print`, `nil`…); identifiers keep their case
//! - `&`/`&&`/`and` lex as [`TokenKind::AndAnd`], `|`/`||`/`or` as [`TokenKind::OrOr`],
//!   `not` as [`TokenKind::Bang`] and `mod` as [`TokenKind::Percent`]
//! - `Span`/`Spanned`/`SourceId` + **LineMap** pour `(ligne, colonne)`
//!
//! Exemple éclair :
//! ```
//! use bu_core::SourceId;
//! use bu_lexer::{Keyword, Lexer, TokenKind};
//!
//! let toks = Lexer::new("VAR x = .5; // half", SourceId(0)).tokenize().unwrap();
//! assert_eq!(toks[0].value, TokenKind::Kw(Keyword::Var));
//! assert_eq!(toks[1].value, TokenKind::Ident("x"));
//! assert_eq!(toks[3].value, TokenKind::Float(0.5));
//! assert_eq!(toks.last().map(|t| &t.value), Some(&TokenKind::Eof));
//! ```

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
#[cfg(not(feature = "std"))]
extern crate alloc;

use bu_core::{Pos, SourceId, Span, Spanned};

/* ─────────────────────────── Options & LineMap ─────────────────────────── */

/// Options du lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerOptions {
    /// Autoriser commentaires blocs imbriqués `/* ... /* .. */ ... */`.
    pub nested_block_comments: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self { nested_block_comments: true }
    }
}

/// Table des lignes pour (byte offset) → (ligne, colonne).
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Offsets des débuts de lignes (toujours contient 0).
    pub line_starts: Vec<u32>,
}

impl LineMap {
    /// Construit la table à partir d’un `&str`.
    pub fn new(src: &str) -> Self {
        let mut ls = Vec::with_capacity(64);
        ls.push(0);
        for (i, b) in src.as_bytes().iter().enumerate() {
            if *b == b'\n' {
                ls.push(to_u32(i) + 1);
            }
        }
        Self { line_starts: ls }
    }

    /// Convertit un `Pos` en (ligne, colonne), 1-based.
    pub fn line_col(&self, pos: Pos) -> (u32, u32) {
        let off = pos.0;
        let idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts.get(idx).copied().unwrap_or(0);
        (to_u32(idx) + 1, off.saturating_sub(line_start) + 1)
    }

    /// Ligne (1-based) d’un `Pos`.
    pub fn line_of(&self, pos: Pos) -> u32 {
        self.line_col(pos).0
    }
}

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Mots-clés reconnus.
///
/// Only `var`, `print`, `nil`, `true`, `false` and `now` take part in the grammar;
/// the others are reserved so programs cannot use them as names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `var`
    Var,
    /// `print`
    Print,
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// `now`
    Now,
    /// `if`
    If,
    /// `elif`
    Elif,
    /// `else`
    Else,
    /// `while`
    While,
    /// `do`
    Do,
    /// `for`
    For,
    /// `loop`
    Loop,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return`
    Return,
    /// `switch`
    Switch,
    /// `case`
    Case,
    /// `default`
    Default,
    /// `def`
    Def,
    /// `struct`
    Struct,
    /// `process`
    Process,
    /// `frame`
    Frame,
    /// `goto`
    Goto,
    /// `eval`
    Eval,
    /// `import`
    Import,
    /// `xor`
    Xor,
}

impl Keyword {
    /// Lower-case spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Print => "print",
            Self::Nil => "nil",
            Self::True => "true",
            Self::False => "false",
            Self::Now => "now",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::While => "while",
            Self::Do => "do",
            Self::For => "for",
            Self::Loop => "loop",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return => "return",
            Self::Switch => "switch",
            Self::Case => "case",
            Self::Default => "default",
            Self::Def => "def",
            Self::Struct => "struct",
            Self::Process => "process",
            Self::Frame => "frame",
            Self::Goto => "goto",
            Self::Eval => "eval",
            Self::Import => "import",
            Self::Xor => "xor",
        }
    }

    /// True for keywords that have no compiler support.
    pub const fn is_reserved(self) -> bool {
        !matches!(self, Self::Var | Self::Print | Self::Nil | Self::True | Self::False | Self::Now)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Genre de jeton lexical.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    /// Fin de fichier.
    Eof,
    /// Identifiant.
    Ident(&'a str),
    /// Mot-clé.
    Kw(Keyword),
    /// Littéral entier (i64).
    Int(i64),
    /// Littéral flottant (f64).
    Float(f64),
    /// Littéral chaîne (décodée).
    Str(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semi,
    /// `:`
    Colon,
    /// `+`
    Plus,
    /// `++`
    PlusPlus,
    /// `+=`
    PlusEq,
    /// `-`
    Minus,
    /// `--`
    MinusMinus,
    /// `-=`
    MinusEq,
    /// `*`
    Star,
    /// `*=`
    StarEq,
    /// `/`
    Slash,
    /// `/=`
    SlashEq,
    /// `%` or `mod`
    Percent,
    /// `^`
    Caret,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`, `&` or `and`
    AndAnd,
    /// `||`, `|` or `or`
    OrOr,
    /// `!` or `not`
    Bang,
}

/// Jeton avec span.
pub type Token<'a> = Spanned<TokenKind<'a>>;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d’erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Caractère inattendu.
    UnexpectedChar(char),
    /// Commentaire bloc non terminé.
    UnterminatedBlockComment,
    /// Chaîne non terminée.
    UnterminatedString,
    /// Séquence d’échappement invalide.
    InvalidEscape,
    /// Littéral numérique invalide.
    InvalidNumber,
    /// Dépassement entier i64.
    IntOverflow,
}

/// Erreur lexicale avec localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Localisation.
    pub span: Span,
    /// Ligne (1-based) du début de l’erreur.
    pub line: u32,
    /// Genre d’erreur.
    pub kind: LexErrorKind,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character: {c:?}"),
            Self::UnterminatedBlockComment => write!(f, "unterminated block comment"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::InvalidNumber => write!(f, "invalid number literal"),
            Self::IntOverflow => write!(f, "integer literal overflows i64"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] {}", self.line, self.kind)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LexError {}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// Analyseur lexical (itératif).
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// Position courante en bytes.
    off: usize,
    /// Id de la source.
    source: SourceId,
    /// Options.
    opts: LexerOptions,
    /// Table des lignes (exposée pour diagnostics).
    pub lines: LineMap,
}

impl<'a> Lexer<'a> {
    /// Crée un lexer avec options par défaut.
    pub fn new(src: &'a str, source: SourceId) -> Self {
        Self::with_options(src, source, LexerOptions::default())
    }

    /// Crée un lexer avec `LexerOptions`.
    pub fn with_options(src: &'a str, source: SourceId, opts: LexerOptions) -> Self {
        Self { src, bytes: src.as_bytes(), off: 0, source, opts, lines: LineMap::new(src) }
    }

    /// Source text being scanned.
    pub const fn source_text(&self) -> &'a str {
        self.src
    }

    /// Prochain jeton ; `Eof` est renvoyé indéfiniment en fin de source.
    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_ws_and_comments()?;
        let start = self.off;
        let Some(c) = self.bump_char() else {
            return Ok(Spanned { value: TokenKind::Eof, span: self.span_from(start) });
        };

        let kind = match c {
            ch if is_ident_start(ch) => {
                self.consume_while(|b| is_ident_continue(b as char));
                word_token(&self.src[start..self.off])
            }
            ch if ch.is_ascii_digit() => self.lex_number(start)?,
            '.' if self.peek().is_some_and(|b| b.is_ascii_digit()) => self.lex_number(start)?,
            '"' => TokenKind::Str(self.lex_string(start)?),

            '+' => if self.eat('+') { TokenKind::PlusPlus } else if self.eat('=') { TokenKind::PlusEq } else { TokenKind::Plus },
            '-' => if self.eat('-') { TokenKind::MinusMinus } else if self.eat('=') { TokenKind::MinusEq } else { TokenKind::Minus },
            '*' => if self.eat('=') { TokenKind::StarEq } else { TokenKind::Star },
            '/' => if self.eat('=') { TokenKind::SlashEq } else { TokenKind::Slash },
            '=' => if self.eat('=') { TokenKind::EqEq } else { TokenKind::Eq },
            '!' => if self.eat('=') { TokenKind::Ne } else { TokenKind::Bang },
            '<' => if self.eat('=') { TokenKind::Le } else { TokenKind::Lt },
            '>' => if self.eat('=') { TokenKind::Ge } else { TokenKind::Gt },
            '&' => {
                self.eat('&');
                TokenKind::AndAnd
            }
            '|' => {
                self.eat('|');
                TokenKind::OrOr
            }

            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,

            other => return Err(self.err_from(start, LexErrorKind::UnexpectedChar(other))),
        };

        Ok(Spanned { value: kind, span: self.span_from(start) })
    }

    /// Tokenise toute la source (ajoute `Eof` final).
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, LexError> {
        let mut out = Vec::new();
        loop {
            let t = self.next_token()?;
            let is_eof = matches!(t.value, TokenKind::Eof);
            out.push(t);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }

    /* ────────── Primitives internes ────────── */

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.off).copied()
    }
    #[inline]
    fn peek2(&self) -> Option<u8> {
        self.bytes.get(self.off + 1).copied()
    }
    #[inline]
    fn bump_char(&mut self) -> Option<char> {
        let c = self.src[self.off..].chars().next()?;
        self.off += c.len_utf8();
        Some(c)
    }
    #[inline]
    fn eat(&mut self, ch: char) -> bool {
        if self.src[self.off..].starts_with(ch) {
            self.off += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn consume_while(&mut self, mut p: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if p(b) {
                self.off += 1;
            } else {
                break;
            }
        }
    }

    fn skip_ws_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            self.consume_while(|b| b.is_ascii_whitespace());
            if self.peek() == Some(b'/') && self.peek2() == Some(b'/') {
                self.consume_while(|b| b != b'\n');
                continue;
            }
            if self.peek() == Some(b'/') && self.peek2() == Some(b'*') {
                let start = self.off;
                self.off += 2;
                let mut depth = 1u32;
                while depth > 0 {
                    match (self.peek(), self.peek2()) {
                        (None, _) => return Err(self.err_from(start, LexErrorKind::UnterminatedBlockComment)),
                        (Some(b'/'), Some(b'*')) if self.opts.nested_block_comments => {
                            self.off += 2;
                            depth += 1;
                        }
                        (Some(b'*'), Some(b'/')) => {
                            self.off += 2;
                            depth -= 1;
                        }
                        _ => self.off += 1,
                    }
                }
                continue;
            }
            if self.peek().is_some_and(|b| !b.is_ascii() && self.src[self.off..].starts_with(char::is_whitespace)) {
                let _ = self.bump_char();
                continue;
            }
            break;
        }
        Ok(())
    }

    fn lex_string(&mut self, start_quote: usize) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            let c = self.bump_char().ok_or_else(|| self.err_from(start_quote, LexErrorKind::UnterminatedString))?;
            match c {
                '"' => break,
                '\\' => {
                    let esc_start = self.off - 1;
                    let esc = self.bump_char().ok_or_else(|| self.err_from(start_quote, LexErrorKind::UnterminatedString))?;
                    match esc {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        '0' => out.push('\0'),
                        _ => return Err(self.err_from(esc_start, LexErrorKind::InvalidEscape)),
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn lex_number(&mut self, start: usize) -> Result<TokenKind<'a>, LexError> {
        // Le premier caractère (chiffre ou '.') est déjà consommé.
        let leading_dot = self.bytes.get(start) == Some(&b'.');
        self.consume_while(|b| b.is_ascii_digit());
        let mut is_float = leading_dot;
        if !leading_dot && self.peek() == Some(b'.') && !self.peek2().is_some_and(is_ident_byte) {
            is_float = true;
            self.off += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        if self.peek() == Some(b'.') && self.peek2().is_some_and(|b| b.is_ascii_digit()) {
            self.consume_while(|b| b.is_ascii_digit() || b == b'.');
            return Err(self.err_from(start, LexErrorKind::InvalidNumber));
        }

        let raw = &self.src[start..self.off];
        if is_float {
            raw.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.err_from(start, LexErrorKind::InvalidNumber))
        } else {
            raw.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.err_from(start, LexErrorKind::IntOverflow))
        }
    }

    /* ────────── Spans / erreurs ────────── */

    #[inline]
    fn span_from(&self, start: usize) -> Span {
        Span { source: self.source, start: Pos(to_u32(start)), end: Pos(to_u32(self.off)) }
    }
    #[inline]
    fn err_from(&self, start: usize, kind: LexErrorKind) -> LexError {
        let span = self.span_from(start);
        LexError { span, line: self.lines.line_of(span.start), kind }
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

#[inline]
const fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

#[inline]
const fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

#[inline]
fn to_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("var", Keyword::Var),
    ("print", Keyword::Print),
    ("nil", Keyword::Nil),
    ("true", Keyword::True),
    ("false", Keyword::False),
    ("now", Keyword::Now),
    ("if", Keyword::If),
    ("elif", Keyword::Elif),
    ("else", Keyword::Else),
    ("while", Keyword::While),
    ("do", Keyword::Do),
    ("for", Keyword::For),
    ("loop", Keyword::Loop),
    ("break", Keyword::Break),
    ("continue", Keyword::Continue),
    ("return", Keyword::Return),
    ("switch", Keyword::Switch),
    ("case", Keyword::Case),
    ("default", Keyword::Default),
    ("def", Keyword::Def),
    ("struct", Keyword::Struct),
    ("process", Keyword::Process),
    ("frame", Keyword::Frame),
    ("goto", Keyword::Goto),
    ("eval", Keyword::Eval),
    ("import", Keyword::Import),
    ("xor", Keyword::Xor),
];

/// Classifies a scanned word: operator words, keywords, then identifiers.
fn word_token(s: &str) -> TokenKind<'_> {
    if s.eq_ignore_ascii_case("and") {
        return TokenKind::AndAnd;
    }
    if s.eq_ignore_ascii_case("or") {
        return TokenKind::OrOr;
    }
    if s.eq_ignore_ascii_case("not") {
        return TokenKind::Bang;
    }
    if s.eq_ignore_ascii_case("mod") {
        return TokenKind::Percent;
    }
    KEYWORDS
        .iter()
        .find(|(word, _)| s.eq_ignore_ascii_case(word))
        .map_or(TokenKind::Ident(s), |(_, kw)| TokenKind::Kw(*kw))
}

/* ─────────────────────────── Tests ─────────────────────────── */
