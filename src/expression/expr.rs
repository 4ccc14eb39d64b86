//! Expression type, substitution, and symbol enumeration.

use std::fmt;
use std::sync::Arc;

use crate::error::ParseResult;
use crate::parser::{Parser, Token};
use crate::vocabulary::{SymbolKind, Vocabulary};

/// A parsed expression: a postfix token sequence bound to the vocabulary
/// it was parsed with.
///
/// Immutable after construction; the token sequence is guaranteed by the
/// parser to reduce in a single left-to-right stack pass.
#[derive(Clone)]
pub struct Expression {
    tokens: Vec<Token>,
    vocabulary: Arc<Vocabulary>,
}

impl Expression {
    pub(crate) fn new(tokens: Vec<Token>, vocabulary: Arc<Vocabulary>) -> Self {
        Expression { tokens, vocabulary }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Deduplicated, encounter-ordered names of all variable tokens.
    pub fn symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for token in &self.tokens {
            if let Token::Variable(name) = token {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Like `symbols`, but excluding names that denote function rules in
    /// the bound vocabulary; those are callable references, not data
    /// bindings.
    pub fn variables(&self) -> Vec<String> {
        self.symbols()
            .into_iter()
            .filter(|name| self.vocabulary.lookup(SymbolKind::Function, name).is_none())
            .collect()
    }

    /// A new expression with every variable token named `name` spliced out
    /// and replaced by the full token sequence of `replacement`.
    pub fn subst(&self, name: &str, replacement: &Expression) -> Expression {
        let mut tokens = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match token {
                Token::Variable(var) if var == name => {
                    tokens.extend(replacement.tokens.iter().cloned());
                }
                other => tokens.push(other.clone()),
            }
        }
        Expression::new(tokens, Arc::clone(&self.vocabulary))
    }

    /// `subst` with the replacement reparsed from text against this
    /// expression's own vocabulary.
    pub fn subst_text(&self, name: &str, text: &str) -> ParseResult<Expression> {
        let replacement = Parser::new(Arc::clone(&self.vocabulary)).parse(text)?;
        Ok(self.subst(name, &replacement))
    }
}

/// Token-sequence equality. Two expressions over different vocabularies
/// compare equal if their postfix tokens match.
impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        self.tokens == other.tokens
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("tokens", &self.tokens)
            .finish()
    }
}
