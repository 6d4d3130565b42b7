use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};

/// A field value inside a [`ParseNode`]: a captured token's text, a nested
/// node, or an ordered list of nodes for repeated constructs.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseValue {
    /// Captured token text
    Token(String),
    /// Nested rule match
    Node(ParseNode),
    /// Ordered repetitions of a repeated sub-block
    List(Vec<ParseNode>),
}

/// Structured output of a rule match. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    /// Name of the rule that produced this node
    pub rule: &'static str,
    /// Name of the alternative that matched
    pub alt: &'static str,
    fields: HashMap<String, ParseValue>,
}

impl ParseNode {
    pub(crate) fn new(
        rule: &'static str,
        alt: &'static str,
        fields: HashMap<String, ParseValue>,
    ) -> Self {
        ParseNode { rule, alt, fields }
    }

    /// Captured token text under `name`, if present
    pub fn token(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(ParseValue::Token(text)) => Some(text),
            _ => None,
        }
    }

    /// Nested node under `name`, if present
    pub fn node(&self, name: &str) -> Option<&ParseNode> {
        match self.fields.get(name) {
            Some(ParseValue::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// Repetition list under `name`, if present
    pub fn list(&self, name: &str) -> Option<&[ParseNode]> {
        match self.fields.get(name) {
            Some(ParseValue::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Whether any field (including optional-presence flags) was captured
    /// under `name`
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// One element of an alternative's sequence
#[derive(Debug, Clone)]
pub enum Elem {
    /// Match a single token by kind and/or literal text, optionally capturing
    /// its text under a field name
    Tok {
        /// Required token kind, if any
        kind: Option<TokenKind>,
        /// Required literal text, if any
        text: Option<&'static str>,
        /// Field name to capture the token text under
        capture: Option<&'static str>,
    },
    /// Match another rule, optionally capturing the sub-node
    RuleRef {
        /// Referenced rule name
        rule: &'static str,
        /// Field name to capture the node under
        capture: Option<&'static str>,
    },
    /// Zero-or-one sub-sequence; captures flow into the parent node and
    /// `flag` records presence
    Opt {
        /// Presence-marker field name
        flag: Option<&'static str>,
        /// The optional sequence
        elems: Vec<Elem>,
    },
    /// Zero-or-more greedy repetitions, captured as an ordered list of
    /// synthetic nodes (one per repetition). Once the repeat has consumed as
    /// many repetitions as match there is no backtracking across its
    /// boundary.
    Repeat {
        /// Field name for the list; also the synthetic nodes' rule name
        capture: &'static str,
        /// The repeated sequence
        elems: Vec<Elem>,
    },
}

/// An ordered alternative of a rule
#[derive(Debug, Clone)]
pub struct Alt {
    /// Alternative name, exposed as [`ParseNode::alt`]
    pub name: &'static str,
    /// Element sequence that must match in full
    pub elems: Vec<Elem>,
}

/// A named rule: an ordered set of alternatives, tried strictly in
/// declaration order; the first alternative whose every element matches wins.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Rule name
    pub name: &'static str,
    /// Alternatives in declaration order
    pub alts: Vec<Alt>,
}

/// The furthest-consuming point at which a token match failed
#[derive(Debug, Clone, PartialEq)]
pub struct MatchFailure {
    /// Token index of the failure
    pub pos: usize,
    /// Rule being matched when the failure occurred
    pub rule: &'static str,
    /// Description of what was expected
    pub expected: String,
}

/// A static, already-parsed rule table
#[derive(Debug, Clone)]
pub struct Grammar {
    start: &'static str,
    rules: HashMap<&'static str, Rule>,
}

impl Grammar {
    /// Builds a grammar from its rules and a start rule name
    pub fn new(start: &'static str, rules: Vec<Rule>) -> Self {
        let rules = rules.into_iter().map(|r| (r.name, r)).collect();
        Grammar { start, rules }
    }

    /// Matches `rule` against `tokens` from the front.
    ///
    /// On success returns the number of tokens consumed and the parse node;
    /// on no-match returns the single deepest failed attempt across the whole
    /// call tree (ties keep the first failure recorded at that depth).
    pub fn match_rule(
        &self,
        rule: &'static str,
        tokens: &[Token],
    ) -> std::result::Result<(usize, ParseNode), MatchFailure> {
        let mut ctx = MatchCtx {
            grammar: self,
            tokens,
            deepest: None,
        };
        match ctx.match_rule_at(rule, 0) {
            Some(hit) => Ok(hit),
            None => Err(ctx.deepest.unwrap_or(MatchFailure {
                pos: 0,
                rule,
                expected: format!("rule `{rule}`"),
            })),
        }
    }

    /// Matches the start rule against the full token sequence and converts a
    /// failure into a positioned syntax error.
    pub fn parse(&self, tokens: &[Token]) -> Result<ParseNode> {
        match self.match_rule(self.start, tokens) {
            Ok((_, node)) => Ok(node),
            Err(failure) => {
                let token = tokens
                    .get(failure.pos)
                    .or_else(|| tokens.last())
                    .ok_or_else(|| Error::internal("empty token stream"))?;
                let found = if token.kind == TokenKind::Eof {
                    "end of input".to_string()
                } else {
                    format!("`{}`", token.lexeme)
                };
                Err(Error::SyntaxError {
                    line: token.line,
                    col: token.column,
                    message: format!(
                        "expected {} while matching `{}`, found {}",
                        failure.expected, failure.rule, found
                    ),
                })
            }
        }
    }
}

/// Per-match state: the deepest-failure accumulator is threaded here, never
/// kept in module-level state.
struct MatchCtx<'g, 't> {
    grammar: &'g Grammar,
    tokens: &'t [Token],
    deepest: Option<MatchFailure>,
}

impl MatchCtx<'_, '_> {
    fn match_rule_at(&mut self, rule_name: &'static str, pos: usize) -> Option<(usize, ParseNode)> {
        let rule = match self.grammar.rules.get(rule_name) {
            Some(rule) => rule,
            None => {
                self.record(pos, rule_name, format!("known rule `{rule_name}`"));
                return None;
            }
        };
        for alt in &rule.alts {
            let mut fields = HashMap::new();
            if let Some(end) = self.match_elems(rule.name, &alt.elems, pos, &mut fields) {
                return Some((end, ParseNode::new(rule.name, alt.name, fields)));
            }
        }
        None
    }

    fn match_elems(
        &mut self,
        rule: &'static str,
        elems: &[Elem],
        mut pos: usize,
        fields: &mut HashMap<String, ParseValue>,
    ) -> Option<usize> {
        for elem in elems {
            match elem {
                Elem::Tok {
                    kind,
                    text,
                    capture,
                } => {
                    let token = match self.tokens.get(pos) {
                        Some(token) => token,
                        None => {
                            self.record(pos, rule, describe(*kind, *text));
                            return None;
                        }
                    };
                    let kind_ok = kind.map_or(true, |k| token.kind == k);
                    let text_ok = text.map_or(true, |t| token.lexeme == t);
                    if !(kind_ok && text_ok) {
                        self.record(pos, rule, describe(*kind, *text));
                        return None;
                    }
                    if let Some(name) = capture {
                        fields.insert(name.to_string(), ParseValue::Token(token.lexeme.clone()));
                    }
                    pos += 1;
                }
                Elem::RuleRef {
                    rule: sub,
                    capture,
                } => {
                    let (end, node) = self.match_rule_at(sub, pos)?;
                    if let Some(name) = capture {
                        fields.insert(name.to_string(), ParseValue::Node(node));
                    }
                    pos = end;
                }
                Elem::Opt { flag, elems } => {
                    let mut inner = HashMap::new();
                    if let Some(end) = self.match_elems(rule, elems, pos, &mut inner) {
                        fields.extend(inner);
                        if let Some(name) = flag {
                            fields.insert(name.to_string(), ParseValue::Token("1".to_string()));
                        }
                        pos = end;
                    }
                }
                Elem::Repeat { capture, elems } => {
                    let mut items = Vec::new();
                    loop {
                        let mut inner = HashMap::new();
                        match self.match_elems(rule, elems, pos, &mut inner) {
                            // progress guard against empty-matching bodies
                            Some(end) if end > pos => {
                                items.push(ParseNode::new(capture, "", inner));
                                pos = end;
                            }
                            _ => break,
                        }
                    }
                    fields.insert(capture.to_string(), ParseValue::List(items));
                }
            }
        }
        Some(pos)
    }

    fn record(&mut self, pos: usize, rule: &'static str, expected: String) {
        let deeper = self.deepest.as_ref().map_or(true, |f| pos > f.pos);
        if deeper {
            self.deepest = Some(MatchFailure {
                pos,
                rule,
                expected,
            });
        }
    }
}

fn describe(kind: Option<TokenKind>, text: Option<&str>) -> String {
    match (kind, text) {
        (_, Some(text)) => format!("`{text}`"),
        (Some(TokenKind::Ident), None) => "an identifier".to_string(),
        (Some(TokenKind::Number), None) => "a number".to_string(),
        (Some(TokenKind::Symbol), None) => "a symbol".to_string(),
        (Some(TokenKind::Eof), None) => "end of input".to_string(),
        (None, None) => "any token".to_string(),
    }
}
