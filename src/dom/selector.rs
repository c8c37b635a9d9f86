//! Locators: a small selector language for finding nodes.
//!
//! Supports compound selectors built from a type name or `*`, `#id`,
//! `.class`, `[attr]` and `[attr=value]`, joined by descendant (whitespace)
//! or child (`>`) combinators. Tokenizing follows the same logos rules as
//! the stylesheet tokenizer: longest match wins, then definition order.

use logos::Logos;

use super::node::{NodeData, NodeId};
use super::tree::Dom;

/// Errors from locator parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty locator")]
    Empty,
    #[error("unrecognised input at byte {0}")]
    InvalidToken(usize),
    #[error("unexpected '{found}' at byte {position}")]
    Unexpected { position: usize, found: String },
    #[error("unexpected end of locator: {0}")]
    UnexpectedEof(&'static str),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
enum Token {
    /// `#panel`
    #[regex(r"#[a-zA-Z_-][a-zA-Z0-9_-]*")]
    Hash,

    /// Double-quoted string literal.
    #[regex(r#""[^"]*""#)]
    StringLiteral,

    /// Single-quoted string literal.
    #[regex(r"'[^']*'")]
    StringLiteralSingle,

    /// Type names, class names, attribute names, bare attribute values.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
    Ident,

    #[token(".")]
    Dot,

    #[token("*")]
    Star,

    #[token(">")]
    GreaterThan,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("=")]
    Equals,
}

/// One simple condition inside a compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorComponent {
    Type(String),
    Universal,
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

/// How a compound relates to the compound on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Conditions that must all hold for a single node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

impl CompoundSelector {
    /// Whether `node` satisfies every component.
    pub fn matches(&self, node: &NodeData) -> bool {
        node.is_element()
            && self.components.iter().all(|component| match component {
                SelectorComponent::Type(name) => node.tag.eq_ignore_ascii_case(name),
                SelectorComponent::Universal => true,
                SelectorComponent::Id(id) => node.id.as_deref() == Some(id.as_str()),
                SelectorComponent::Class(class) => node.has_class(class),
                SelectorComponent::Attribute { name, value: None } => node.has_attribute(name),
                SelectorComponent::Attribute {
                    name,
                    value: Some(expected),
                } => node.attribute(name).as_deref() == Some(expected.as_str()),
            })
    }
}

/// A parsed locator.
///
/// `compounds[0]` is the leftmost compound; `combinators[i]` joins
/// `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
}

impl Selector {
    /// Parse a locator string.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser { tokens, cursor: 0 };
        let mut compounds = vec![parser.parse_compound()?];
        let mut combinators = Vec::new();

        while let Some(tok) = parser.peek() {
            let combinator = if tok.token == Token::GreaterThan {
                parser.cursor += 1;
                Combinator::Child
            } else if parser.follows_whitespace() {
                Combinator::Descendant
            } else {
                return Err(SelectorError::Unexpected {
                    position: tok.start,
                    found: tok.text.clone(),
                });
            };
            combinators.push(combinator);
            compounds.push(parser.parse_compound()?);
        }

        Ok(Self {
            source: input.trim().to_owned(),
            compounds,
            combinators,
        })
    }

    /// The locator text this selector was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches. With `pierce`, ancestor checks cross scope
    /// roots to their hosts.
    pub fn matches(&self, dom: &Dom, node: NodeId, pierce: bool) -> bool {
        self.matches_from(dom, node, self.compounds.len() - 1, pierce)
    }

    fn matches_from(&self, dom: &Dom, node: NodeId, index: usize, pierce: bool) -> bool {
        let Some(data) = dom.get(node) else {
            return false;
        };
        if !self.compounds[index].matches(data) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let step_up = |n: NodeId| if pierce { dom.composed_parent(n) } else { dom.parent(n) };
        match self.combinators[index - 1] {
            Combinator::Child => {
                step_up(node).is_some_and(|p| self.matches_from(dom, p, index - 1, pierce))
            }
            Combinator::Descendant => {
                let mut current = step_up(node);
                while let Some(ancestor) = current {
                    if self.matches_from(dom, ancestor, index - 1, pierce) {
                        return true;
                    }
                    current = step_up(ancestor);
                }
                false
            }
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// A positioned token with byte-level span information for whitespace detection.
#[derive(Debug, Clone)]
struct PToken {
    token: Token,
    text: String,
    start: usize,
    end: usize,
}

fn tokenize(input: &str) -> Result<Vec<PToken>, SelectorError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        let token = result.map_err(|()| SelectorError::InvalidToken(span.start))?;
        tokens.push(PToken {
            token,
            text: input[span.clone()].to_owned(),
            start: span.start,
            end: span.end,
        });
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<PToken>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&PToken> {
        self.tokens.get(self.cursor)
    }

    /// Whether whitespace separates the current token from the previous one.
    fn follows_whitespace(&self) -> bool {
        match (self.cursor.checked_sub(1).and_then(|i| self.tokens.get(i)), self.peek()) {
            (Some(prev), Some(curr)) => curr.start > prev.end,
            _ => false,
        }
    }

    fn next(&mut self, context: &'static str) -> Result<PToken, SelectorError> {
        let tok = self
            .tokens
            .get(self.cursor)
            .cloned()
            .ok_or(SelectorError::UnexpectedEof(context))?;
        self.cursor += 1;
        Ok(tok)
    }

    fn expect(&mut self, expected: Token, context: &'static str) -> Result<PToken, SelectorError> {
        let tok = self.next(context)?;
        if tok.token == expected {
            Ok(tok)
        } else {
            Err(SelectorError::Unexpected {
                position: tok.start,
                found: tok.text,
            })
        }
    }

    /// Parse adjacent simple selectors into one compound.
    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();
        loop {
            let Some(tok) = self.peek().cloned() else { break };
            if !compound.components.is_empty() && self.follows_whitespace() {
                break;
            }
            let component = match tok.token {
                Token::Ident if compound.components.is_empty() => {
                    self.cursor += 1;
                    SelectorComponent::Type(tok.text)
                }
                Token::Star if compound.components.is_empty() => {
                    self.cursor += 1;
                    SelectorComponent::Universal
                }
                Token::Hash => {
                    self.cursor += 1;
                    SelectorComponent::Id(tok.text[1..].to_owned())
                }
                Token::Dot => {
                    self.cursor += 1;
                    let name = self.expect(Token::Ident, "class name")?;
                    SelectorComponent::Class(name.text)
                }
                Token::BracketOpen => {
                    self.cursor += 1;
                    self.parse_attribute()?
                }
                Token::GreaterThan => break,
                _ => {
                    return Err(SelectorError::Unexpected {
                        position: tok.start,
                        found: tok.text,
                    })
                }
            };
            compound.components.push(component);
        }
        if compound.components.is_empty() {
            return match self.peek() {
                Some(tok) => Err(SelectorError::Unexpected {
                    position: tok.start,
                    found: tok.text.clone(),
                }),
                None => Err(SelectorError::UnexpectedEof("compound selector")),
            };
        }
        Ok(compound)
    }

    /// Parse `name]` or `name=value]` after an opening bracket.
    fn parse_attribute(&mut self) -> Result<SelectorComponent, SelectorError> {
        let name = self.expect(Token::Ident, "attribute name")?.text;
        let tok = self.next("attribute selector")?;
        match tok.token {
            Token::BracketClose => Ok(SelectorComponent::Attribute { name, value: None }),
            Token::Equals => {
                let value = self.next("attribute value")?;
                let value = match value.token {
                    Token::Ident => value.text,
                    Token::StringLiteral | Token::StringLiteralSingle => {
                        value.text[1..value.text.len() - 1].to_owned()
                    }
                    _ => {
                        return Err(SelectorError::Unexpected {
                            position: value.start,
                            found: value.text,
                        })
                    }
                };
                self.expect(Token::BracketClose, "attribute selector")?;
                Ok(SelectorComponent::Attribute {
                    name,
                    value: Some(value),
                })
            }
            _ => Err(SelectorError::Unexpected {
                position: tok.start,
                found: tok.text,
            }),
        }
    }
}
