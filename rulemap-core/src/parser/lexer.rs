//! Tokenizer for the production rule syntax.
//!
//! Hand-rolled with line/column tracking so parse errors point at the exact
//! offending token. The awkward corners of the syntax all live here:
//! `-` doubles as negation, reject-preference and the start of a negative
//! number; `<` opens relations, disjunctions and variables.

use crate::error::ParseError;

/// A lexed token with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token payload.
    pub kind: TokenKind,
    /// 1-based line of the token's first character.
    pub line: usize,
    /// 1-based column of the token's first character.
    pub column: usize,
}

/// The token alphabet of the rule language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `-->`
    Arrow,
    /// `^`
    Caret,
    /// `-` (negation or reject preference)
    Minus,
    /// `+`
    Plus,
    /// `!`
    Bang,
    /// `~`
    Tilde,
    /// `&`
    Amp,
    /// `=`
    Equal,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `<>`
    NotEqual,
    /// `<=>`
    SameType,
    /// `<<`
    DisjOpen,
    /// `>>`
    DisjClose,
    /// A symbolic or numeric constant (pipe-quoted symbols included).
    Symbol(String),
    /// `<name>`
    Variable(String),
    /// `"…"` — documentation or string constant.
    Quoted(String),
}

impl TokenKind {
    /// Short description used in "expected X, found Y" messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::LBrace => "'{'".to_string(),
            Self::RBrace => "'}'".to_string(),
            Self::Arrow => "'-->'".to_string(),
            Self::Caret => "'^'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Plus => "'+'".to_string(),
            Self::Bang => "'!'".to_string(),
            Self::Tilde => "'~'".to_string(),
            Self::Amp => "'&'".to_string(),
            Self::Equal => "'='".to_string(),
            Self::Less => "'<'".to_string(),
            Self::LessEqual => "'<='".to_string(),
            Self::Greater => "'>'".to_string(),
            Self::GreaterEqual => "'>='".to_string(),
            Self::NotEqual => "'<>'".to_string(),
            Self::SameType => "'<=>'".to_string(),
            Self::DisjOpen => "'<<'".to_string(),
            Self::DisjClose => "'>>'".to_string(),
            Self::Symbol(s) => format!("'{s}'"),
            Self::Variable(v) => format!("'<{v}>'"),
            Self::Quoted(_) => "quoted string".to_string(),
        }
    }
}

/// Whether `c` may start a symbol.
fn starts_symbol(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '*' | '/' | '.' | ':' | '?')
}

/// Whether `c` may continue a symbol (adds `-` for names like `input-link`).
fn continues_symbol(c: char) -> bool {
    starts_symbol(c) || c == '-'
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(line, column, message)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.peek(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Read symbol characters starting at the current position, stopping
    /// before an `-->` arrow so `foo-->` does not swallow the separator.
    fn read_symbol_tail(&mut self, first: char) -> String {
        let mut sym = String::new();
        sym.push(first);
        while let Some(c) = self.peek(0) {
            if c == '-' && self.peek(1) == Some('-') && self.peek(2) == Some('>') {
                break;
            }
            if continues_symbol(c) {
                sym.push(c);
                self.bump();
            } else {
                break;
            }
        }
        sym
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '^' => TokenKind::Caret,
            '+' => TokenKind::Plus,
            '!' => TokenKind::Bang,
            '~' => TokenKind::Tilde,
            '&' => TokenKind::Amp,
            '=' => TokenKind::Equal,
            '-' => {
                if self.peek(0) == Some('-') && self.peek(1) == Some('>') {
                    self.bump();
                    self.bump();
                    TokenKind::Arrow
                } else if self.peek(0).is_some_and(starts_symbol) {
                    // Negative number or `-`-prefixed symbol.
                    TokenKind::Symbol(self.read_symbol_tail('-'))
                } else {
                    TokenKind::Minus
                }
            }
            '>' => match self.peek(0) {
                Some('>') => {
                    self.bump();
                    TokenKind::DisjClose
                }
                Some('=') => {
                    self.bump();
                    TokenKind::GreaterEqual
                }
                _ => TokenKind::Greater,
            },
            '<' => self.lex_after_less()?,
            '|' => {
                let mut sym = String::new();
                loop {
                    match self.bump() {
                        Some('|') => break,
                        Some(c) => sym.push(c),
                        None => {
                            return Err(self.error(line, column, "unterminated '|' symbol"));
                        }
                    }
                }
                TokenKind::Symbol(sym)
            }
            '"' => {
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some(c) => text.push(c),
                        None => {
                            return Err(self.error(line, column, "unterminated string"));
                        }
                    }
                }
                TokenKind::Quoted(text)
            }
            c if starts_symbol(c) => TokenKind::Symbol(self.read_symbol_tail(c)),
            c => {
                return Err(self.error(line, column, format!("unexpected character '{c}'")));
            }
        };

        Ok(Some(Token { kind, line, column }))
    }

    /// Disambiguate `<=>`, `<=`, `<>`, `<<`, `<var>` and bare `<`.
    fn lex_after_less(&mut self) -> Result<TokenKind, ParseError> {
        match self.peek(0) {
            Some('=') => {
                self.bump();
                if self.peek(0) == Some('>') {
                    self.bump();
                    Ok(TokenKind::SameType)
                } else {
                    Ok(TokenKind::LessEqual)
                }
            }
            Some('>') => {
                self.bump();
                Ok(TokenKind::NotEqual)
            }
            Some('<') => {
                self.bump();
                Ok(TokenKind::DisjOpen)
            }
            _ => {
                // Try `<name>`; on failure fall back to a bare `<` without
                // consuming anything (positions are cheap to restore because
                // variable names never contain newlines).
                let mut name = String::new();
                let mut ahead = 0;
                while let Some(c) = self.peek(ahead) {
                    if continues_symbol(c) {
                        name.push(c);
                        ahead += 1;
                    } else {
                        break;
                    }
                }
                if !name.is_empty() && self.peek(ahead) == Some('>') {
                    for _ in 0..=ahead {
                        self.bump();
                    }
                    Ok(TokenKind::Variable(name))
                } else {
                    Ok(TokenKind::Less)
                }
            }
        }
    }
}

/// Tokenize an entire rule file.
///
/// # Errors
/// Returns a positioned [`ParseError`] on the first lexical fault
/// (unterminated quote, character outside the alphabet).
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_a_minimal_production_skeleton() {
        let toks = kinds("sp {hello (state <s>) --> (<s> ^done yes)}");
        assert_eq!(
            toks,
            vec![
                TokenKind::Symbol("sp".into()),
                TokenKind::LBrace,
                TokenKind::Symbol("hello".into()),
                TokenKind::LParen,
                TokenKind::Symbol("state".into()),
                TokenKind::Variable("s".into()),
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::LParen,
                TokenKind::Variable("s".into()),
                TokenKind::Caret,
                TokenKind::Symbol("done".into()),
                TokenKind::Symbol("yes".into()),
                TokenKind::RParen,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn distinguishes_relations_variables_and_disjunctions() {
        assert_eq!(
            kinds("< <= <> <=> >= > << >> <x>"),
            vec![
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::NotEqual,
                TokenKind::SameType,
                TokenKind::GreaterEqual,
                TokenKind::Greater,
                TokenKind::DisjOpen,
                TokenKind::DisjClose,
                TokenKind::Variable("x".into()),
            ]
        );
    }

    #[test]
    fn minus_is_negation_before_parens_and_carets() {
        assert_eq!(
            kinds("-(-^attr -5 -foo)"),
            vec![
                TokenKind::Minus,
                TokenKind::LParen,
                TokenKind::Minus,
                TokenKind::Caret,
                TokenKind::Symbol("attr".into()),
                TokenKind::Symbol("-5".into()),
                TokenKind::Symbol("-foo".into()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn hyphenated_symbols_stay_whole() {
        assert_eq!(
            kinds("input-link io.input-link"),
            vec![
                TokenKind::Symbol("input-link".into()),
                TokenKind::Symbol("io.input-link".into()),
            ]
        );
    }

    #[test]
    fn arrow_is_not_swallowed_by_a_symbol() {
        assert_eq!(
            kinds("foo-->bar"),
            vec![
                TokenKind::Symbol("foo".into()),
                TokenKind::Arrow,
                TokenKind::Symbol("bar".into()),
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("alpha # the rest is ignored\nbeta"),
            vec![
                TokenKind::Symbol("alpha".into()),
                TokenKind::Symbol("beta".into()),
            ]
        );
    }

    #[test]
    fn pipe_quoting_allows_arbitrary_symbols() {
        assert_eq!(
            kinds("|hello world!|"),
            vec![TokenKind::Symbol("hello world!".into())]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let toks = tokenize("sp\n  {x}").expect("tokenize");
        assert_eq!((toks[0].line, toks[0].column), (1, 1));
        assert_eq!((toks[1].line, toks[1].column), (2, 3));
        assert_eq!((toks[2].line, toks[2].column), (2, 4));
    }

    #[test]
    fn unterminated_string_reports_its_start() {
        let err = tokenize("  \"oops").expect_err("must fail");
        assert_eq!((err.line, err.column), (1, 3));
    }
}
