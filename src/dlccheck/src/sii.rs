//! Plain-text SII definition parser
//!
//! Definition files declare named units:
//!
//! ```text
//! SiiNunit
//! {
//! model_def : model.oak_tree
//! {
//!     model_desc: "/model/tree/oak.pmd"
//! }
//! }
//! ```
//!
//! `.sui` include fragments have the same unit syntax without the
//! `SiiNunit` wrapper. `#`, `//` and `/* */` comments are stripped outside
//! quoted strings. `@include` directives are recorded, never followed.

/// Prefix of the generated names given to units declared without one
pub const NAMELESS_PREFIX: &str = "_nameless.";

/// Leading bytes of SII variants that are not plain text
const BINARY_MAGICS: [&[u8]; 3] = [b"BSII", b"ScsC", b"3nK"];

const NUNIT_KEYWORD: &str = "SiiNunit";
const INCLUDE_DIRECTIVE: &str = "@include";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One declared unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub class: String,
    pub name: String,
    /// Raw `key: value` pairs in declaration order
    pub attributes: Vec<(String, String)>,
}

impl Unit {
    /// True for units that can't be referenced by name from map data
    pub fn is_anonymous(&self) -> bool {
        self.name.starts_with(NAMELESS_PREFIX) || self.name.starts_with('.')
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed definition file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub units: Vec<Unit>,
    /// Targets of `@include` directives, as written
    pub includes: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum Piece {
    Text(String),
    Open,
    Close,
}

/// Split comment-free source into text runs and braces, tagged with line numbers
fn tokenize(text: &str) -> Vec<(usize, Piece)> {
    let mut pieces = Vec::new();
    let mut in_block_comment = false;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let mut current = String::new();
        let mut in_string = false;
        let mut chars = line.chars().peekable();

        let flush = |current: &mut String, pieces: &mut Vec<(usize, Piece)>| {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                pieces.push((line_no, Piece::Text(trimmed.to_string())));
            }
            current.clear();
        };

        while let Some(c) = chars.next() {
            if in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    in_block_comment = false;
                }
                continue;
            }
            if in_string {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' => {
                    in_string = true;
                    current.push(c);
                }
                '#' => break,
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    in_block_comment = true;
                }
                '{' => {
                    flush(&mut current, &mut pieces);
                    pieces.push((line_no, Piece::Open));
                }
                '}' => {
                    flush(&mut current, &mut pieces);
                    pieces.push((line_no, Piece::Close));
                }
                _ => current.push(c),
            }
        }
        flush(&mut current, &mut pieces);
    }

    pieces
}

fn parse_include(line: usize, text: &str) -> Result<String, ParseError> {
    let target = text[INCLUDE_DIRECTIVE.len()..].trim();
    target
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| ParseError::new(line, format!("malformed include: {}", text)))
}

fn parse_header(line: usize, text: &str) -> Result<Unit, ParseError> {
    let (class, name) = text
        .split_once(':')
        .ok_or_else(|| ParseError::new(line, format!("expected unit header, got `{}`", text)))?;
    let (class, name) = (class.trim(), name.trim());

    if class.is_empty() || class.contains(char::is_whitespace) {
        return Err(ParseError::new(line, format!("invalid unit class `{}`", class)));
    }
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(ParseError::new(line, format!("invalid unit name `{}`", name)));
    }

    Ok(Unit {
        class: class.to_string(),
        name: name.to_string(),
        attributes: Vec::new(),
    })
}

enum State {
    Top,
    ExpectNunitOpen,
    ExpectUnitOpen(Unit),
    InUnit(Unit),
}

/// Parse definition text into its units
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if BINARY_MAGICS.iter().any(|m| text.as_bytes().starts_with(m)) {
        return Err(ParseError::new(0, "binary or encrypted SII is not supported"));
    }

    let mut doc = Document::default();
    let mut state = State::Top;
    let mut in_nunit = false;
    let mut last_line = 0;

    for (line, piece) in tokenize(text) {
        last_line = line;
        state = match (state, piece) {
            (State::Top, Piece::Text(t)) if t == NUNIT_KEYWORD => {
                if in_nunit {
                    return Err(ParseError::new(line, "nested SiiNunit"));
                }
                State::ExpectNunitOpen
            }
            (State::Top, Piece::Text(t)) if t.starts_with(INCLUDE_DIRECTIVE) => {
                doc.includes.push(parse_include(line, &t)?);
                State::Top
            }
            (State::Top, Piece::Text(t)) => State::ExpectUnitOpen(parse_header(line, &t)?),
            (State::Top, Piece::Close) if in_nunit => {
                in_nunit = false;
                State::Top
            }
            (State::Top, _) => return Err(ParseError::new(line, "unexpected brace")),

            (State::ExpectNunitOpen, Piece::Open) => {
                in_nunit = true;
                State::Top
            }
            (State::ExpectNunitOpen, _) => {
                return Err(ParseError::new(line, "expected `{` after SiiNunit"))
            }

            (State::ExpectUnitOpen(unit), Piece::Open) => State::InUnit(unit),
            (State::ExpectUnitOpen(unit), _) => {
                return Err(ParseError::new(
                    line,
                    format!("expected `{{` after unit header `{}`", unit.name),
                ))
            }

            (State::InUnit(mut unit), Piece::Text(t)) => {
                if t.starts_with(INCLUDE_DIRECTIVE) {
                    doc.includes.push(parse_include(line, &t)?);
                } else {
                    let (key, value) = t.split_once(':').ok_or_else(|| {
                        ParseError::new(line, format!("expected `key: value`, got `{}`", t))
                    })?;
                    unit.attributes
                        .push((key.trim().to_string(), value.trim().to_string()));
                }
                State::InUnit(unit)
            }
            (State::InUnit(unit), Piece::Close) => {
                doc.units.push(unit);
                State::Top
            }
            (State::InUnit(unit), Piece::Open) => {
                return Err(ParseError::new(
                    line,
                    format!("unexpected `{{` inside unit `{}`", unit.name),
                ))
            }
        };
    }

    match state {
        State::Top if !in_nunit => Ok(doc),
        State::InUnit(unit) | State::ExpectUnitOpen(unit) => Err(ParseError::new(
            last_line,
            format!("unterminated unit `{}`", unit.name),
        )),
        _ => Err(ParseError::new(last_line, "unexpected end of file")),
    }
}
