//! Scanner and precedence-climbing ("shunting-yard") parser.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::{Error, ParseError, ParseResult};
use crate::expression::Expression;
use crate::fields::unescape;
use crate::parser::token::Token;
use crate::value::Value;
use crate::vocabulary::{Assoc, Rule, SymbolKind, Vocabulary};

/// Maximum parenthesis nesting depth; deeper input fails fast instead of
/// growing the operator stack without bound.
pub const MAX_DEPTH: i32 = 100;

// Token classes that may legally appear next, tracked as a bitmask.
const PRIMARY: u16 = 1;
const OPERATOR: u16 = 2;
const FUNCTION: u16 = 4;
const LPAREN: u16 = 8;
const RPAREN: u16 = 16;
const COMMA: u16 = 32;
const SIGN: u16 = 64;
const CALL: u16 = 128;
const NULLARY: u16 = 256;

const OPERAND: u16 = PRIMARY | LPAREN | FUNCTION | SIGN;

/// Parser over one vocabulary. Cheap to clone and safe to share; all parse
/// state lives on the stack of each `parse` call.
#[derive(Clone)]
pub struct Parser {
    vocabulary: Arc<Vocabulary>,
}

impl Parser {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Parser { vocabulary }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Tokenizes and precedence-orders `text` into an `Expression`.
    pub fn parse(&self, text: &str) -> ParseResult<Expression> {
        let tokens = Scan::new(&self.vocabulary, text).run()?;
        debug!("parsed {:?} into {} postfix tokens", text, tokens.len());
        Ok(Expression::new(tokens, Arc::clone(&self.vocabulary)))
    }

    /// Parse-then-evaluate convenience.
    pub fn eval(&self, text: &str, bindings: &HashMap<String, Value>) -> Result<Value, Error> {
        Ok(self.parse(text)?.eval(bindings)?)
    }
}

impl Default for Parser {
    /// A parser over the legacy-compatibility vocabulary.
    fn default() -> Self {
        Parser::new(Arc::new(Vocabulary::legacy()))
    }
}

/// State of one parse pass.
struct Scan<'a> {
    chars: Vec<char>,
    pos: usize,
    expect: u16,
    depth_priority: i32,
    operators: Vec<Token>,
    output: Vec<Token>,
    // Parity weight: unary pushes add 1, binary/comma/call add 2. The
    // final sequence must satisfy weight + 1 == token count.
    weight: usize,
    binaries: Vec<(&'a str, &'a Rule)>,
    unaries: Vec<(&'a str, &'a Rule)>,
    constants: Vec<(&'a str, &'a Rule)>,
}

impl<'a> Scan<'a> {
    fn new(vocabulary: &'a Vocabulary, text: &str) -> Self {
        Scan {
            chars: text.chars().collect(),
            pos: 0,
            expect: OPERAND,
            depth_priority: 0,
            operators: Vec::new(),
            output: Vec::new(),
            weight: 0,
            binaries: vocabulary.get(SymbolKind::Binary),
            unaries: vocabulary.get(SymbolKind::Unary),
            constants: vocabulary.get(SymbolKind::Constant),
        }
    }

    fn run(mut self) -> ParseResult<Vec<Token>> {
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            if c == '/' && self.peek(1) == Some('*') {
                self.skip_comment()?;
                continue;
            }
            match c {
                '(' => {
                    self.open_paren()?;
                    continue;
                }
                ')' => {
                    self.close_paren()?;
                    continue;
                }
                ',' => {
                    self.comma()?;
                    continue;
                }
                _ => {}
            }
            if self.expect & OPERATOR == 0 && self.match_unary()? {
                continue;
            }
            if self.match_binary()? {
                continue;
            }
            if c.is_ascii_digit() || (c == '.' && matches!(self.peek(1), Some(d) if d.is_ascii_digit()))
            {
                self.number()?;
                continue;
            }
            if c == '\'' {
                self.string()?;
                continue;
            }
            if self.match_constant()? {
                continue;
            }
            if c == '"' || c == '_' || c.is_alphabetic() {
                self.word()?;
                continue;
            }
            return Err(ParseError::new(
                self.pos,
                format!("unknown character '{}'", c),
            ));
        }

        if self.depth_priority != 0 {
            return Err(ParseError::new(self.pos, "unmatched parentheses"));
        }
        while let Some(token) = self.operators.pop() {
            self.output.push(token);
        }
        if self.weight + 1 != self.output.len() {
            return Err(ParseError::new(
                self.pos,
                "operand/operator parity mismatch",
            ));
        }
        Ok(self.output)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Does the symbol occur at the cursor?
    fn matches_at(&self, name: &str) -> bool {
        let mut n = 0;
        for (i, c) in name.chars().enumerate() {
            if self.peek(i) != Some(c) {
                return false;
            }
            n += 1;
        }
        n > 0
    }

    /// Word boundary after a match of `len` characters.
    fn boundary_after(&self, len: usize) -> bool {
        match self.peek(len) {
            Some(c) => !c.is_alphanumeric() && c != '_',
            None => true,
        }
    }

    fn is_word_like(name: &str) -> bool {
        name.chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    /// Prefix-position operator (a sign or a named unary). Only consulted
    /// in operand context.
    fn match_unary(&mut self) -> ParseResult<bool> {
        for i in 0..self.unaries.len() {
            let (name, rule) = self.unaries[i];
            if !self.matches_at(name) {
                continue;
            }
            let word_like = Self::is_word_like(name);
            if word_like && !self.boundary_after(name.chars().count()) {
                continue;
            }
            let required = if word_like { FUNCTION } else { SIGN };
            if self.expect & required == 0 {
                continue;
            }
            // Prefix operators cannot close any pending operator, so they
            // push without popping.
            self.operators.push(Token::Unary {
                name: name.to_string(),
                priority: rule.priority() + self.depth_priority,
            });
            self.weight += 1;
            self.pos += name.chars().count();
            self.expect = if word_like { LPAREN } else { OPERAND };
            return Ok(true);
        }
        Ok(false)
    }

    /// Infix operator via the shunting-yard pop rule. A binary symbol in
    /// operand position is an error, except a bare `+` sign which is a
    /// no-op when the vocabulary carries no unary plus.
    fn match_binary(&mut self) -> ParseResult<bool> {
        for i in 0..self.binaries.len() {
            let (name, rule) = self.binaries[i];
            if !self.matches_at(name) {
                continue;
            }
            if Self::is_word_like(name) && !self.boundary_after(name.chars().count()) {
                continue;
            }
            if self.expect & OPERATOR == 0 {
                if name == "+" && self.expect & SIGN != 0 {
                    self.pos += 1;
                    return Ok(true);
                }
                return Err(ParseError::new(
                    self.pos,
                    format!("unexpected operator '{}'", name),
                ));
            }
            let priority = rule.priority() + self.depth_priority;
            let assoc = rule.assoc();
            let name = name.to_string();
            self.pos += name.chars().count();
            self.push_binary(name, priority, assoc);
            self.weight += 2;
            self.expect = OPERAND;
            return Ok(true);
        }
        Ok(false)
    }

    fn push_binary(&mut self, name: String, priority: i32, assoc: Assoc) {
        // Right-associative operators compare one above their stored
        // priority, so an equal-priority stack top stays put.
        let threshold = match assoc {
            Assoc::Left => priority,
            Assoc::Right => priority + 1,
        };
        while let Some(top) = self.operators.last() {
            if top.priority() >= threshold {
                if let Some(token) = self.operators.pop() {
                    self.output.push(token);
                }
            } else {
                break;
            }
        }
        self.operators.push(Token::Binary { name, priority });
    }

    fn open_paren(&mut self) -> ParseResult<()> {
        if self.expect & LPAREN == 0 {
            return Err(ParseError::new(self.pos, "unexpected '('"));
        }
        if self.depth_priority >= MAX_DEPTH * 10 {
            return Err(ParseError::new(self.pos, "parentheses nested too deeply"));
        }
        self.depth_priority += 10;
        let mut expect = OPERAND;
        if self.expect & CALL != 0 {
            // Call opening: the marker binds below every operator and
            // comma inside the parentheses and never pops.
            self.operators.push(Token::Call {
                priority: self.depth_priority - 2,
            });
            self.weight += 2;
            expect |= NULLARY;
        }
        self.pos += 1;
        self.expect = expect;
        Ok(())
    }

    fn close_paren(&mut self) -> ParseResult<()> {
        if self.expect & NULLARY != 0 {
            // `f()` - empty argument list sentinel.
            self.output.push(Token::Constant(Value::List(Vec::new())));
        } else if self.expect & RPAREN == 0 {
            return Err(ParseError::new(self.pos, "unexpected ')'"));
        }
        if self.depth_priority < 10 {
            return Err(ParseError::new(self.pos, "unmatched parentheses"));
        }
        self.depth_priority -= 10;
        self.pos += 1;
        self.expect = OPERATOR | RPAREN | COMMA | LPAREN | CALL;
        Ok(())
    }

    fn comma(&mut self) -> ParseResult<()> {
        if self.expect & COMMA == 0 {
            return Err(ParseError::new(self.pos, "unexpected ','"));
        }
        // Parser-assigned priority: below every in-level operator, above
        // the enclosing call marker.
        let priority = self.depth_priority - 1;
        self.push_binary(",".to_string(), priority, Assoc::Left);
        self.weight += 2;
        self.pos += 1;
        self.expect = OPERAND;
        Ok(())
    }

    fn number(&mut self) -> ParseResult<()> {
        let start = self.pos;
        if self.expect & PRIMARY == 0 {
            return Err(ParseError::new(start, "unexpected number"));
        }
        let mut text = String::new();
        if self.current() == Some('.') {
            text.push('0');
        }
        let mut seen_dot = false;
        while let Some(c) = self.current() {
            if c == '.' {
                if seen_dot {
                    return Err(ParseError::new(self.pos, "malformed number"));
                }
                seen_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        let value = if seen_dot {
            Value::Float(
                text.parse()
                    .map_err(|_| ParseError::new(start, "malformed number"))?,
            )
        } else {
            // Integer literals wider than i64 fall back to floats.
            match text.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Float(
                    text.parse()
                        .map_err(|_| ParseError::new(start, "malformed number"))?,
                ),
            }
        };
        self.output.push(Token::Constant(value));
        self.expect = OPERATOR | RPAREN | COMMA;
        Ok(())
    }

    fn string(&mut self) -> ParseResult<()> {
        let start = self.pos;
        if self.expect & PRIMARY == 0 {
            return Err(ParseError::new(start, "unexpected string"));
        }
        self.pos += 1;
        let mut raw = String::new();
        loop {
            let Some(c) = self.current() else {
                return Err(ParseError::new(start, "unterminated string literal"));
            };
            if c == '\\' {
                let Some(next) = self.peek(1) else {
                    return Err(ParseError::new(start, "unterminated string literal"));
                };
                raw.push('\\');
                raw.push(next);
                self.pos += 2;
                continue;
            }
            self.pos += 1;
            if c == '\'' {
                break;
            }
            raw.push(c);
        }
        let decoded = unescape(&raw, start)?;
        self.output.push(Token::Constant(Value::Str(decoded)));
        self.expect = OPERATOR | RPAREN | COMMA;
        Ok(())
    }

    /// Named constant, word-boundary matched so `PI` never fires inside
    /// `PIE`.
    fn match_constant(&mut self) -> ParseResult<bool> {
        for i in 0..self.constants.len() {
            let (name, rule) = self.constants[i];
            if !self.matches_at(name) {
                continue;
            }
            let len = name.chars().count();
            if !self.boundary_after(len) {
                continue;
            }
            if self.expect & PRIMARY == 0 {
                return Err(ParseError::new(
                    self.pos,
                    format!("unexpected constant '{}'", name),
                ));
            }
            let Some(value) = rule.literal() else {
                continue;
            };
            self.output.push(Token::Constant(value.clone()));
            self.pos += len;
            self.expect = OPERATOR | RPAREN | COMMA;
            return Ok(true);
        }
        Ok(false)
    }

    /// Bare identifier, possibly with double-quoted compound segments
    /// (quotes are kept in the name). Function-rule names deliberately
    /// scan as variables; they resolve through the vocabulary at eval
    /// time, which is what lets functions be passed as values.
    fn word(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let mut name = String::new();
        let mut quoted = false;
        while let Some(c) = self.current() {
            if c == '"' {
                quoted = !quoted;
            } else if !quoted && !c.is_alphanumeric() && c != '_' && c != '.' {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        if quoted {
            return Err(ParseError::new(start, "unterminated quoted identifier"));
        }
        if self.expect & PRIMARY == 0 {
            return Err(ParseError::new(
                start,
                format!("unexpected variable '{}'", name),
            ));
        }
        self.output.push(Token::Variable(name));
        self.expect = OPERATOR | RPAREN | COMMA | LPAREN | CALL;
        Ok(())
    }

    fn skip_comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 2;
        while self.pos < self.chars.len() {
            if self.current() == Some('*') && self.peek(1) == Some('/') {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(ParseError::new(start, "unterminated comment"))
    }
}
