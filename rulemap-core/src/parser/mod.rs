//! Rule-text parser — production syntax to the structured rule model.
//!
//! `sp {name (conditions) --> (actions)}` text is converted into an ordered
//! collection of [`Production`]s, or fails with a positioned [`ParseError`].
//! Failure policy: the first structural error aborts parsing of the whole
//! file. There is no per-production recovery — recovery would silently change
//! which findings a checking run reports for a file that mixes one bad
//! production with many good ones.

pub mod ast;
pub mod lexer;

pub use ast::{
    Action, ActionValue, AttributeTest, Condition, Preference, Production, Relation, RhsValue,
    Subject, TestTerm, Triple, ValueTest,
};

use crate::error::ParseError;
use lexer::{Token, TokenKind};

/// Parse a rule file into productions.
///
/// # Errors
/// Returns a positioned [`ParseError`] on the first lexical or structural
/// fault; no productions are returned for a file that fails partway.
pub fn parse_rules(text: &str) -> Result<Vec<Production>, ParseError> {
    let tokens = lexer::tokenize(text)?;
    Parser::new(tokens).parse_file()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Position for error reporting: the current token, or just past the
    /// last one at end of input.
    fn here(&self) -> (usize, usize) {
        if let Some(t) = self.tokens.get(self.pos) {
            (t.line, t.column)
        } else if let Some(t) = self.tokens.last() {
            (t.line, t.column + 1)
        } else {
            (1, 1)
        }
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        let (line, column) = self.here();
        Err(ParseError::new(line, column, message))
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(k) if k == kind => {
                self.bump();
                Ok(())
            }
            Some(k) => {
                let found = k.describe();
                self.fail(format!("expected {what}, found {found}"))
            }
            None => self.fail(format!("expected {what}, found end of input")),
        }
    }

    fn expect_symbol(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(TokenKind::Symbol(_)) => {
                let Some(Token {
                    kind: TokenKind::Symbol(s),
                    ..
                }) = self.bump()
                else {
                    unreachable!("peeked a symbol");
                };
                Ok(s)
            }
            Some(k) => {
                let found = k.describe();
                self.fail(format!("expected {what}, found {found}"))
            }
            None => self.fail(format!("expected {what}, found end of input")),
        }
    }

    fn expect_variable(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(TokenKind::Variable(_)) => {
                let Some(Token {
                    kind: TokenKind::Variable(v),
                    ..
                }) = self.bump()
                else {
                    unreachable!("peeked a variable");
                };
                Ok(v)
            }
            Some(k) => {
                let found = k.describe();
                self.fail(format!("expected {what}, found {found}"))
            }
            None => self.fail(format!("expected {what}, found end of input")),
        }
    }

    // -----------------------------------------------------------------------
    // Grammar
    // -----------------------------------------------------------------------

    fn parse_file(&mut self) -> Result<Vec<Production>, ParseError> {
        let mut productions = Vec::new();
        while self.peek().is_some() {
            let keyword = self.expect_symbol("'sp'")?;
            if keyword != "sp" {
                self.pos -= 1;
                return self.fail(format!("expected 'sp', found '{keyword}'"));
            }
            productions.push(self.parse_production()?);
        }
        Ok(productions)
    }

    fn parse_production(&mut self) -> Result<Production, ParseError> {
        self.expect(&TokenKind::LBrace, "'{' after 'sp'")?;
        let name = self.expect_symbol("production name")?;

        let doc = if let Some(TokenKind::Quoted(_)) = self.peek() {
            let Some(Token {
                kind: TokenKind::Quoted(d),
                ..
            }) = self.bump()
            else {
                unreachable!("peeked a quoted string");
            };
            Some(d)
        } else {
            None
        };

        let mut conditions = Vec::new();
        while matches!(self.peek(), Some(TokenKind::LParen | TokenKind::Minus)) {
            conditions.push(self.parse_condition()?);
        }
        if conditions.is_empty() {
            return self.fail("expected at least one condition");
        }

        self.expect(&TokenKind::Arrow, "'-->'")?;

        let mut actions = Vec::new();
        while matches!(self.peek(), Some(TokenKind::LParen)) {
            actions.extend(self.parse_action_line()?);
        }

        self.expect(&TokenKind::RBrace, "'}' closing the production")?;
        Ok(Production {
            name,
            doc,
            conditions,
            actions,
        })
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let negated = matches!(self.peek(), Some(TokenKind::Minus));
        if negated {
            self.bump();
        }
        self.expect(&TokenKind::LParen, "'(' opening a condition")?;

        let subject = match self.peek() {
            Some(TokenKind::Symbol(s)) if s == "state" => {
                self.bump();
                Subject::State(self.expect_variable("state variable")?)
            }
            Some(TokenKind::Variable(_)) => {
                Subject::Variable(self.expect_variable("condition variable")?)
            }
            _ => return self.fail("expected 'state' or a variable"),
        };

        let mut tests = Vec::new();
        while matches!(self.peek(), Some(TokenKind::Caret | TokenKind::Minus)) {
            tests.push(self.parse_attribute_test()?);
        }

        self.expect(&TokenKind::RParen, "')' closing the condition")?;
        Ok(Condition {
            negated,
            subject,
            tests,
        })
    }

    fn parse_attribute_test(&mut self) -> Result<AttributeTest, ParseError> {
        let negated = matches!(self.peek(), Some(TokenKind::Minus));
        if negated {
            self.bump();
        }
        self.expect(&TokenKind::Caret, "'^'")?;
        let path = self.parse_attribute_path()?;

        let mut values = Vec::new();
        while self.starts_value_test() {
            values.push(self.parse_value_test()?);
        }

        let value = match values.len() {
            0 => ValueTest::Anything,
            1 => values.remove(0),
            _ => ValueTest::Conjunction(values),
        };
        Ok(AttributeTest {
            negated,
            path,
            value,
        })
    }

    fn parse_attribute_path(&mut self) -> Result<Vec<String>, ParseError> {
        let raw = self.expect_symbol("attribute name")?;
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            self.pos -= 1;
            return self.fail(format!("malformed attribute path '{raw}'"));
        }
        Ok(segments)
    }

    fn starts_value_test(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenKind::Symbol(_)
                    | TokenKind::Quoted(_)
                    | TokenKind::Variable(_)
                    | TokenKind::Equal
                    | TokenKind::NotEqual
                    | TokenKind::Less
                    | TokenKind::LessEqual
                    | TokenKind::Greater
                    | TokenKind::GreaterEqual
                    | TokenKind::SameType
                    | TokenKind::DisjOpen
                    | TokenKind::LBrace
            )
        )
    }

    fn parse_value_test(&mut self) -> Result<ValueTest, ParseError> {
        let Some(token) = self.bump() else {
            return self.fail("expected a value test, found end of input");
        };
        match token.kind {
            TokenKind::Symbol(s) | TokenKind::Quoted(s) => Ok(ValueTest::Constant(s)),
            TokenKind::Variable(v) => Ok(ValueTest::Variable(v)),
            TokenKind::Equal => self.parse_relational(Relation::Equal),
            TokenKind::NotEqual => self.parse_relational(Relation::NotEqual),
            TokenKind::Less => self.parse_relational(Relation::Less),
            TokenKind::LessEqual => self.parse_relational(Relation::LessOrEqual),
            TokenKind::Greater => self.parse_relational(Relation::Greater),
            TokenKind::GreaterEqual => self.parse_relational(Relation::GreaterOrEqual),
            TokenKind::SameType => self.parse_relational(Relation::SameType),
            TokenKind::DisjOpen => self.parse_disjunction(),
            TokenKind::LBrace => self.parse_conjunction(),
            kind => {
                self.pos -= 1;
                let found = kind.describe();
                self.fail(format!("expected a value test, found {found}"))
            }
        }
    }

    fn parse_relational(&mut self, relation: Relation) -> Result<ValueTest, ParseError> {
        let term = match self.peek() {
            Some(TokenKind::Symbol(_) | TokenKind::Quoted(_)) => {
                let Some(Token { kind, .. }) = self.bump() else {
                    unreachable!("peeked a constant");
                };
                match kind {
                    TokenKind::Symbol(s) | TokenKind::Quoted(s) => TestTerm::Constant(s),
                    _ => unreachable!("peeked a constant"),
                }
            }
            Some(TokenKind::Variable(_)) => {
                TestTerm::Variable(self.expect_variable("relational term")?)
            }
            _ => return self.fail(format!("expected a value after '{relation}'")),
        };
        Ok(ValueTest::Relational(relation, term))
    }

    fn parse_disjunction(&mut self) -> Result<ValueTest, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::DisjClose) => {
                    self.bump();
                    break;
                }
                Some(TokenKind::Symbol(_) | TokenKind::Quoted(_)) => {
                    let Some(Token { kind, .. }) = self.bump() else {
                        unreachable!("peeked a constant");
                    };
                    match kind {
                        TokenKind::Symbol(s) | TokenKind::Quoted(s) => items.push(s),
                        _ => unreachable!("peeked a constant"),
                    }
                }
                Some(TokenKind::Variable(_)) => {
                    return self.fail("disjunctions may contain only constants");
                }
                _ => return self.fail("expected a constant or '>>'"),
            }
        }
        if items.is_empty() {
            return self.fail("empty disjunction");
        }
        Ok(ValueTest::Disjunction(items))
    }

    fn parse_conjunction(&mut self) -> Result<ValueTest, ParseError> {
        let mut tests = Vec::new();
        while !matches!(self.peek(), Some(TokenKind::RBrace)) {
            if !self.starts_value_test() {
                return self.fail("expected a value test or '}'");
            }
            tests.push(self.parse_value_test()?);
        }
        self.bump();
        if tests.is_empty() {
            return self.fail("empty conjunctive test");
        }
        Ok(ValueTest::Conjunction(tests))
    }

    /// One `(var ^a v ^b w)` line yields one [`Action`] per attribute group.
    fn parse_action_line(&mut self) -> Result<Vec<Action>, ParseError> {
        self.expect(&TokenKind::LParen, "'(' opening an action")?;
        let subject = self.expect_variable("variable on the action side")?;

        let mut actions = Vec::new();
        while matches!(self.peek(), Some(TokenKind::Caret)) {
            self.bump();
            let path = self.parse_attribute_path()?;
            let mut values = Vec::new();
            while self.starts_rhs_value() {
                let value = self.parse_rhs_value()?;
                let mut preferences = Vec::new();
                while let Some(pref) = self.peek_preference() {
                    self.bump();
                    preferences.push(pref);
                }
                values.push(ActionValue { value, preferences });
            }
            if values.is_empty() {
                return self.fail("expected a value to assert");
            }
            actions.push(Action {
                subject: subject.clone(),
                path,
                values,
            });
        }
        if actions.is_empty() {
            return self.fail("expected '^' starting an assertion");
        }

        self.expect(&TokenKind::RParen, "')' closing the action")?;
        Ok(actions)
    }

    fn starts_rhs_value(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenKind::Symbol(_)
                    | TokenKind::Quoted(_)
                    | TokenKind::Variable(_)
                    | TokenKind::LParen
            )
        )
    }

    fn parse_rhs_value(&mut self) -> Result<RhsValue, ParseError> {
        let Some(token) = self.bump() else {
            return self.fail("expected a value, found end of input");
        };
        match token.kind {
            TokenKind::Symbol(s) | TokenKind::Quoted(s) => Ok(RhsValue::Constant(s)),
            TokenKind::Variable(v) => Ok(RhsValue::Variable(v)),
            TokenKind::LParen => {
                let name = match self.bump().map(|t| t.kind) {
                    Some(TokenKind::Symbol(s)) => s,
                    Some(TokenKind::Plus) => "+".to_string(),
                    Some(TokenKind::Minus) => "-".to_string(),
                    _ => {
                        self.pos -= 1;
                        return self.fail("expected a function name");
                    }
                };
                let mut args = Vec::new();
                while self.starts_rhs_value() {
                    args.push(self.parse_rhs_value()?);
                }
                self.expect(&TokenKind::RParen, "')' closing the function call")?;
                Ok(RhsValue::FunctionCall { name, args })
            }
            kind => {
                self.pos -= 1;
                let found = kind.describe();
                self.fail(format!("expected a value, found {found}"))
            }
        }
    }

    /// Preference markers trail a value on the action side.
    fn peek_preference(&self) -> Option<Preference> {
        match self.peek()? {
            TokenKind::Plus => Some(Preference::Acceptable),
            TokenKind::Minus => Some(Preference::Reject),
            TokenKind::Bang => Some(Preference::Require),
            TokenKind::Tilde => Some(Preference::Prohibit),
            TokenKind::Equal => Some(Preference::Indifferent),
            TokenKind::Greater => Some(Preference::Best),
            TokenKind::Less => Some(Preference::Worst),
            TokenKind::Amp => Some(Preference::Unary),
            _ => None,
        }
    }
}
