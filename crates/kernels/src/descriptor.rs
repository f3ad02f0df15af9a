//! Kernel descriptor decoding.
//!
//! The tuner prints each winning kernel as a call expression followed by its
//! measured throughput:
//!
//! ```text
//! Kernel_dnt_medium(m=4, n=4, k=4, tile_m=2, tile_n=1, threads=32, grouping=16, minblocks=1) , # 50.0 GFlop/s
//! ```
//!
//! Arguments are restricted to literals (integers, floats, quoted strings and
//! booleans). The throughput is injected as the `perf` field before the
//! fields are handed to the algorithm's schema.

use crate::error::{DecodeError, DescriptorError};
use crate::params::{KernelParameterSet, ParamMap, PERF_FIELD};
use crate::registry::KernelRegistry;
use serde_json::Value;

pub const DESCRIPTOR_PREFIX: &str = "Kernel_dnt_";
pub const THROUGHPUT_UNIT: &str = "GFlop/s";

/// A parsed descriptor whose fields have not been checked against a schema yet.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelDescriptor {
    pub algorithm: String,
    pub fields: ParamMap,
    /// Measured throughput in GFlop/s.
    pub perf: f64,
}

impl KernelDescriptor {
    /// Parses the first `Kernel_dnt_` descriptor found in `text`.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let start = text
            .find(DESCRIPTOR_PREFIX)
            .ok_or(DecodeError::MissingDescriptor)?;
        let mut cursor = Cursor::new(text, start + DESCRIPTOR_PREFIX.len());

        let algorithm = cursor
            .word()
            .ok_or_else(|| cursor.syntax("algorithm name"))?
            .to_string();
        cursor.expect('(', "'('")?;
        let fields = parse_arguments(&mut cursor)?;

        cursor.skip_whitespace();
        cursor.expect(',', "',' after the argument list")?;
        cursor.skip_whitespace();
        cursor.expect('#', "'#' before the throughput")?;
        cursor.skip_whitespace();
        let perf = read_throughput(&mut cursor)?;

        if !cursor.skip_whitespace() {
            return Err(cursor.syntax("whitespace before the unit"));
        }
        let unit = cursor.token();
        if unit != THROUGHPUT_UNIT {
            return Err(DecodeError::UnsupportedUnit(unit.to_string()));
        }

        Ok(Self {
            algorithm,
            fields,
            perf,
        })
    }

    /// Injects the throughput and builds the algorithm's parameter set.
    pub fn into_parameter_set(
        self,
        registry: &KernelRegistry,
    ) -> Result<KernelParameterSet, DescriptorError> {
        let mut fields = self.fields;
        fields.insert(PERF_FIELD.to_string(), Value::from(self.perf));
        Ok(registry.construct(&self.algorithm, fields)?)
    }
}

/// Decodes a winner record into a schema-checked parameter set.
pub fn decode(
    record_text: &str,
    registry: &KernelRegistry,
) -> Result<KernelParameterSet, DescriptorError> {
    KernelDescriptor::parse(record_text)?.into_parameter_set(registry)
}

/// Renders the descriptor that [`decode`] turns back into `params`.
pub fn encode(params: &KernelParameterSet) -> String {
    let arguments = params
        .kernel_fields()
        .map(|(name, value)| format!("{}={}", name, render_literal(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{}{}({}) , # {} {}",
        DESCRIPTOR_PREFIX,
        params.algorithm(),
        arguments,
        format_throughput(params.perf().unwrap_or(0.0)),
        THROUGHPUT_UNIT
    )
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{}\"", escaped)
        }
        // Schemas only produce scalar fields.
        other => other.to_string(),
    }
}

fn format_throughput(perf: f64) -> String {
    let text = perf.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

fn parse_arguments(cursor: &mut Cursor<'_>) -> Result<ParamMap, DecodeError> {
    let mut fields = ParamMap::new();
    cursor.skip_whitespace();
    if cursor.eat(')') {
        return Ok(fields);
    }

    loop {
        cursor.skip_whitespace();
        let key = cursor
            .word()
            .filter(|w| !w.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(|| cursor.syntax("parameter name"))?
            .to_string();
        cursor.skip_whitespace();
        cursor.expect('=', "'='")?;
        cursor.skip_whitespace();
        let value = parse_literal(cursor, &key)?;

        if key == PERF_FIELD {
            return Err(DecodeError::ReservedKey(key));
        }
        if fields.contains_key(&key) {
            return Err(DecodeError::DuplicateKey(key));
        }
        fields.insert(key, value);

        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        cursor.expect(')', "',' or ')'")?;
        return Ok(fields);
    }
}

fn parse_literal(cursor: &mut Cursor<'_>, key: &str) -> Result<Value, DecodeError> {
    match cursor.peek() {
        Some(quote @ ('\'' | '"')) => cursor.string(quote).map(Value::String),
        Some(c) if c.is_alphabetic() || c == '_' => {
            let word = cursor.word().unwrap_or_default();
            match word {
                "True" | "true" => Ok(Value::Bool(true)),
                "False" | "false" => Ok(Value::Bool(false)),
                _ => Err(DecodeError::InvalidLiteral {
                    key: key.to_string(),
                    literal: word.to_string(),
                }),
            }
        }
        Some(_) => {
            let literal = cursor.literal_token();
            parse_number(literal).ok_or_else(|| DecodeError::InvalidLiteral {
                key: key.to_string(),
                literal: literal.to_string(),
            })
        }
        None => Err(cursor.syntax("a value")),
    }
}

fn parse_number(literal: &str) -> Option<Value> {
    let body = literal.trim_start_matches(['+', '-']);
    if body.is_empty() || literal.len() - body.len() > 1 {
        return None;
    }
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if body.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(v) = literal.parse::<i64>() {
            return Some(Value::from(v));
        }
        if let Ok(v) = literal.parse::<u64>() {
            return Some(Value::from(v));
        }
    }
    literal
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Value::from)
}

/// Parses a throughput literal. Only `<digits>.<digits>` is accepted.
pub fn parse_throughput(token: &str) -> Option<f64> {
    let (whole, frac) = token.split_once('.')?;
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !digits(whole) || !digits(frac) {
        return None;
    }
    token.parse().ok()
}

fn read_throughput(cursor: &mut Cursor<'_>) -> Result<f64, DecodeError> {
    let token = cursor.take_while(|c| c.is_ascii_digit() || c == '.');
    parse_throughput(token).ok_or_else(|| DecodeError::InvalidThroughput(token.to_string()))
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn rest(&self) -> &'a str {
        let src: &'a str = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), DecodeError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.syntax(expected))
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Returns whether any whitespace was consumed.
    fn skip_whitespace(&mut self) -> bool {
        !self.take_while(char::is_whitespace).is_empty()
    }

    fn word(&mut self) -> Option<&'a str> {
        let word = self.take_while(|c| c.is_alphanumeric() || c == '_');
        (!word.is_empty()).then_some(word)
    }

    fn token(&mut self) -> &'a str {
        self.take_while(|c| !c.is_whitespace())
    }

    fn literal_token(&mut self) -> &'a str {
        self.take_while(|c| !c.is_whitespace() && c != ',' && c != ')')
    }

    fn string(&mut self, quote: char) -> Result<String, DecodeError> {
        let start = self.pos;
        self.pos += quote.len_utf8();
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos += offset + c.len_utf8();
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        Err(DecodeError::UnterminatedString { position: start })
    }

    fn syntax(&self, expected: &'static str) -> DecodeError {
        let found = match self.peek() {
            None => "end of input".to_string(),
            Some(_) => format!("'{}'", self.rest().chars().take(12).collect::<String>()),
        };
        DecodeError::Syntax {
            position: self.pos,
            expected,
            found,
        }
    }
}
