//! Reader for literal cell values.
//!
//! Nested crawl fields arrive either as JSON (this crate's own crawler) or as
//! Python reprs (`[{'nome': 'Overgrow', 'url': None}]`) from older exports.
//! Both are parsed into a `serde_json::Value`. Anything that does not parse
//! completely yields `None`.

use serde_json::{Map, Number, Value};

/// Nesting deeper than this is treated as malformed.
const MAX_DEPTH: usize = 64;

pub fn parse(input: &str) -> Option<Value> {
    let mut p = Reader {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = p.value()?;
    p.skip_ws();
    if p.pos == p.chars.len() {
        Some(value)
    } else {
        None
    }
}

/// Parse and keep the result only if it is a list.
pub fn parse_list(input: &str) -> Option<Vec<Value>> {
    match parse(input)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Parse and keep the result only if it is a dict.
pub fn parse_dict(input: &str) -> Option<Map<String, Value>> {
    match parse(input)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Render a scalar as plain text (strings unquoted, null as `None`).
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Reader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' => self.nested(|p| p.sequence('[', ']')),
            '(' => self.nested(|p| p.sequence('(', ')')),
            '{' => self.nested(Self::dict),
            '\'' | '"' => self.string().map(Value::String),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() => self.word(),
            _ => None,
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Option<Value>) -> Option<Value> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let v = f(self);
        self.depth -= 1;
        v
    }

    fn sequence(&mut self, open: char, close: char) -> Option<Value> {
        self.bump().filter(|c| *c == open)?;
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            items.push(self.value()?);
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            return None;
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.bump().filter(|c| *c == '{')?;
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Null => "None".to_string(),
                other => scalar_text(&other)?,
            };
            if !self.eat(':') {
                return None;
            }
            let val = self.value()?;
            map.insert(key, val);
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            return None;
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(out),
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'x' => out.push(self.hex_escape(2)?),
                    'u' => out.push(self.hex_escape(4)?),
                    'U' => out.push(self.hex_escape(8)?),
                    other => out.push(other),
                },
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, len: usize) -> Option<char> {
        let end = self.pos.checked_add(len)?;
        let digits: String = self.chars.get(self.pos..end)?.iter().collect();
        self.pos = end;
        char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let text = text.trim_start_matches('+');
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::Number(i.into()));
        }
        let f = text.parse::<f64>().ok()?;
        // nan/inf have no JSON form
        Some(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
    }

    fn word(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "None" | "null" | "nan" | "NaN" | "inf" => Some(Value::Null),
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            _ => None,
        }
    }
}
