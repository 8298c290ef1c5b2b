//! i18n message parser.
//!
//! Grammar of a translated message:
//! - `�N�`: binding expression `N`
//! - `�#N�` ... `�/#N�`: template element in slot `N` wrapping the enclosed text
//! - `{�N�, plural|select, label {content} ...}`: ICU expression on binding `N`
//!
//! ICU case content is text with bindings, HTML tags and nested ICU
//! expressions. `=K` plural labels keep their `=` here and lose it when
//! the case table is compiled.

use crate::icu::IcuType;
use crate::update::ValuePart;

const PLACEHOLDER: char = '\u{FFFD}';

const VOID_TAGS: &[&str] = &["area", "br", "col", "hr", "img", "wbr"];

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MessagePart {
    Text(Vec<ValuePart>),
    ElementStart(usize),
    ElementEnd(usize),
    Icu(IcuExpression),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IcuExpression {
    pub kind: IcuType,
    pub main_binding: usize,
    pub cases: Vec<IcuCase>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IcuCase {
    pub label: String,
    pub content: Vec<IcuNode>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum IcuNode {
    Text(Vec<ValuePart>),
    Element {
        tag: String,
        attrs: Vec<IcuAttr>,
        children: Vec<IcuNode>,
    },
    Icu(IcuExpression),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IcuAttr {
    pub name: String,
    pub value: Vec<ValuePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("unexpected end of message")]
    UnexpectedEnd,

    #[error("invalid placeholder `{0}`")]
    InvalidPlaceholder(String),

    #[error("expected `{expected}` at offset {at}")]
    Expected { expected: char, at: usize },

    #[error("ICU expression must start with a binding placeholder")]
    IcuWithoutBinding,

    #[error("unknown ICU type `{0}`")]
    UnknownIcuType(String),

    #[error("ICU expression has no cases")]
    EmptyIcu,

    #[error("closing tag `</{found}>` does not match `<{expected}>`")]
    MismatchedTag { expected: String, found: String },

    #[error("unexpected closing tag `</{0}>`")]
    UnexpectedClosingTag(String),

    #[error("element placeholder {0} closed out of order")]
    MismatchedPlaceholder(usize),
}

enum Placeholder {
    Binding(usize),
    ElementStart(usize),
    ElementEnd(usize),
}

/// Accumulates literal and binding pieces of one text node.
#[derive(Default)]
struct TextBuf {
    parts: Vec<ValuePart>,
}

impl TextBuf {
    fn push_char(&mut self, c: char) {
        if let Some(ValuePart::Literal(s)) = self.parts.last_mut() {
            s.push(c);
        } else {
            self.parts.push(ValuePart::Literal(c.to_string()));
        }
    }

    fn push_binding(&mut self, k: usize) {
        self.parts.push(ValuePart::Binding(k));
    }

    fn take(&mut self) -> Option<Vec<ValuePart>> {
        (!self.parts.is_empty()).then(|| std::mem::take(&mut self.parts))
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

/// Parse a translated message into its parts.
pub fn parse_message(message: &str) -> Result<Vec<MessagePart>, MessageError> {
    let mut p = Parser {
        chars: message.chars().collect(),
        pos: 0,
    };
    let mut parts = Vec::new();
    let mut text = TextBuf::default();
    let mut open = Vec::new();

    while let Some(c) = p.peek() {
        match c {
            PLACEHOLDER => match p.placeholder()? {
                Placeholder::Binding(k) => text.push_binding(k),
                Placeholder::ElementStart(n) => {
                    parts.extend(text.take().map(MessagePart::Text));
                    open.push(n);
                    parts.push(MessagePart::ElementStart(n));
                }
                Placeholder::ElementEnd(n) => {
                    parts.extend(text.take().map(MessagePart::Text));
                    if open.pop() != Some(n) {
                        return Err(MessageError::MismatchedPlaceholder(n));
                    }
                    parts.push(MessagePart::ElementEnd(n));
                }
            },
            '{' => {
                parts.extend(text.take().map(MessagePart::Text));
                parts.push(MessagePart::Icu(p.icu()?));
            }
            _ => {
                p.pos += 1;
                text.push_char(c);
            }
        }
    }
    parts.extend(text.take().map(MessagePart::Text));
    if let Some(n) = open.pop() {
        return Err(MessageError::MismatchedPlaceholder(n));
    }
    Ok(parts)
}

/// Parse a standalone ICU expression.
pub fn parse_icu(source: &str) -> Result<IcuExpression, MessageError> {
    let mut p = Parser {
        chars: source.trim().chars().collect(),
        pos: 0,
    };
    p.icu()
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Result<char, MessageError> {
        let c = self.peek().ok_or(MessageError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), MessageError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(MessageError::Expected {
                expected,
                at: self.pos,
            }),
            None => Err(MessageError::UnexpectedEnd),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn placeholder(&mut self) -> Result<Placeholder, MessageError> {
        self.expect(PLACEHOLDER)?;
        let body = self.take_while(|c| c != PLACEHOLDER);
        self.expect(PLACEHOLDER)?;
        let invalid = || MessageError::InvalidPlaceholder(body.clone());
        if let Some(n) = body.strip_prefix("/#") {
            return n.parse().map(Placeholder::ElementEnd).map_err(|_| invalid());
        }
        if let Some(n) = body.strip_prefix('#') {
            return n.parse().map(Placeholder::ElementStart).map_err(|_| invalid());
        }
        body.parse().map(Placeholder::Binding).map_err(|_| invalid())
    }

    /// Element placeholders cannot appear inside ICU content.
    fn binding(&mut self) -> Result<usize, MessageError> {
        match self.placeholder()? {
            Placeholder::Binding(k) => Ok(k),
            Placeholder::ElementStart(n) | Placeholder::ElementEnd(n) => {
                Err(MessageError::InvalidPlaceholder(format!("#{n}")))
            }
        }
    }

    fn icu(&mut self) -> Result<IcuExpression, MessageError> {
        self.expect('{')?;
        self.skip_ws();
        if self.peek() != Some(PLACEHOLDER) {
            return Err(MessageError::IcuWithoutBinding);
        }
        let Placeholder::Binding(main_binding) = self.placeholder()? else {
            return Err(MessageError::IcuWithoutBinding);
        };
        self.skip_ws();
        self.expect(',')?;
        self.skip_ws();
        let kind_name = self.take_while(|c| c.is_ascii_alphabetic());
        let kind = match kind_name.as_str() {
            "plural" => IcuType::Plural,
            "select" => IcuType::Select,
            _ => return Err(MessageError::UnknownIcuType(kind_name)),
        };
        self.skip_ws();
        self.expect(',')?;

        let mut cases = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(MessageError::UnexpectedEnd),
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            let label = self.take_while(|c| !c.is_whitespace() && c != '{' && c != '}');
            self.skip_ws();
            self.expect('{')?;
            let content = self.nodes(None)?;
            cases.push(IcuCase { label, content });
        }
        if cases.is_empty() {
            return Err(MessageError::EmptyIcu);
        }
        Ok(IcuExpression {
            kind,
            main_binding,
            cases,
        })
    }

    /// Parse case content up to the closing `}` (or `</tag>` inside an element).
    fn nodes(&mut self, closing_tag: Option<&str>) -> Result<Vec<IcuNode>, MessageError> {
        let mut nodes = Vec::new();
        let mut text = TextBuf::default();
        loop {
            let c = self.peek().ok_or(MessageError::UnexpectedEnd)?;
            match c {
                '}' if closing_tag.is_none() => {
                    self.pos += 1;
                    nodes.extend(text.take().map(IcuNode::Text));
                    return Ok(nodes);
                }
                '}' => {
                    return Err(MessageError::MismatchedTag {
                        expected: closing_tag.unwrap_or_default().to_string(),
                        found: String::new(),
                    });
                }
                '{' => {
                    nodes.extend(text.take().map(IcuNode::Text));
                    nodes.push(IcuNode::Icu(self.icu()?));
                }
                '<' if self.peek_at(1) == Some('/') => {
                    self.pos += 2;
                    let found = self.take_while(|c| c != '>').trim().to_ascii_lowercase();
                    self.expect('>')?;
                    return match closing_tag {
                        Some(expected) if expected == found => {
                            nodes.extend(text.take().map(IcuNode::Text));
                            Ok(nodes)
                        }
                        Some(expected) => Err(MessageError::MismatchedTag {
                            expected: expected.to_string(),
                            found,
                        }),
                        None => Err(MessageError::UnexpectedClosingTag(found)),
                    };
                }
                '<' => {
                    nodes.extend(text.take().map(IcuNode::Text));
                    nodes.push(self.element()?);
                }
                PLACEHOLDER => text.push_binding(self.binding()?),
                _ => {
                    self.pos += 1;
                    text.push_char(c);
                }
            }
        }
    }

    fn element(&mut self) -> Result<IcuNode, MessageError> {
        self.expect('<')?;
        let tag = self
            .take_while(|c| c.is_ascii_alphanumeric() || c == '-')
            .to_ascii_lowercase();
        let mut attrs = Vec::new();
        let self_closing = loop {
            self.skip_ws();
            match self.peek() {
                Some('/') => {
                    self.pos += 1;
                    self.expect('>')?;
                    break true;
                }
                Some('>') => {
                    self.pos += 1;
                    break false;
                }
                Some(_) => attrs.push(self.attr()?),
                None => return Err(MessageError::UnexpectedEnd),
            }
        };
        let children = if self_closing || VOID_TAGS.contains(&tag.as_str()) {
            Vec::new()
        } else {
            self.nodes(Some(&tag))?
        };
        Ok(IcuNode::Element {
            tag,
            attrs,
            children,
        })
    }

    fn attr(&mut self) -> Result<IcuAttr, MessageError> {
        let name = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'));
        if name.is_empty() {
            return Err(MessageError::Expected {
                expected: '>',
                at: self.pos,
            });
        }
        self.skip_ws();
        if self.peek() != Some('=') {
            return Ok(IcuAttr {
                name,
                value: Vec::new(),
            });
        }
        self.pos += 1;
        self.skip_ws();
        let quote = self.bump()?;
        if quote != '"' && quote != '\'' {
            return Err(MessageError::Expected {
                expected: '"',
                at: self.pos - 1,
            });
        }
        let mut value = TextBuf::default();
        loop {
            match self.peek().ok_or(MessageError::UnexpectedEnd)? {
                c if c == quote => {
                    self.pos += 1;
                    break;
                }
                PLACEHOLDER => value.push_binding(self.binding()?),
                c => {
                    self.pos += 1;
                    value.push_char(c);
                }
            }
        }
        Ok(IcuAttr {
            name,
            value: value.take().unwrap_or_default(),
        })
    }
}
