//! Reader for the JavaScript literals the generator emits.
//!
//! Search payloads are small script files (`var searchData=[...];`) built
//! from array, object, string and number literals. This module reads that
//! subset into [`serde_json::Value`] so the typed decoding can work on plain
//! JSON values. Single- and double-quoted strings, unquoted object keys,
//! trailing commas and comments are accepted.

use serde_json::{Map, Number, Value};

/// Deepest array/object nesting accepted. Generated payloads use four levels.
const MAX_DEPTH: usize = 64;

/// A syntax error at a byte offset of the payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parses a script made of `var name = <literal>;` statements, or a single
/// bare literal (returned under the empty name).
pub fn parse_script(text: &str) -> Result<Vec<(String, Value)>, LiteralError> {
    let mut parser = Parser::new(text);
    let mut bindings = Vec::new();

    parser.skip_trivia();
    if matches!(parser.peek(), Some('[' | '{')) {
        let value = parser.value()?;
        parser.skip_trivia();
        parser.eat(';');
        parser.skip_trivia();
        parser.expect_end()?;
        bindings.push((String::new(), value));
        return Ok(bindings);
    }

    loop {
        parser.skip_trivia();
        if parser.peek().is_none() {
            break;
        }
        let keyword = parser.identifier()?;
        if !matches!(keyword.as_str(), "var" | "let" | "const") {
            return Err(parser.error(format!("expected declaration, found '{}'", keyword)));
        }
        parser.skip_trivia();
        let name = parser.identifier()?;
        parser.skip_trivia();
        if !parser.eat('=') {
            return Err(parser.error(format!("expected '=' after '{}'", name)));
        }
        let value = parser.value()?;
        parser.skip_trivia();
        parser.eat(';');
        bindings.push((name, value));
    }

    Ok(bindings)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_end(&self) -> Result<(), LiteralError> {
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(format!("unexpected trailing '{}'", c))),
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            let rest = &self.src[self.pos..];
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                self.pos += body.find("*/").map_or(trimmed.len(), |end| end + 4);
            } else {
                return;
            }
        }
    }

    fn identifier(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        match self.peek() {
            Some('[') => self.nested(Self::array),
            Some('{') => self.nested(Self::object),
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(_) => {
                let word = self.identifier()?;
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    other => Err(self.error(format!("unexpected identifier '{}'", other))),
                }
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn array(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_trivia();
            if self.eat(',') {
                continue;
            }
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            return Err(self.error("expected ',' or ']'"));
        }
    }

    fn object(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some(quote @ ('\'' | '"')) => self.string(quote)?,
                Some(c) if c.is_ascii_digit() => {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.bump();
                    }
                    self.src[start..self.pos].to_string()
                }
                _ => self.identifier()?,
            };
            self.skip_trivia();
            if !self.eat(':') {
                return Err(self.error(format!("expected ':' after key '{}'", key)));
            }
            let value = self.value()?;
            map.insert(key, value);
            self.skip_trivia();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            return Err(self.error("expected ',' or '}'"));
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'v' => out.push('\u{b}'),
                        '0' => out.push('\0'),
                        'x' => {
                            let code = self.hex_digits(2)?;
                            out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        'u' => out.push(self.unicode_escape()?),
                        // Line continuation
                        '\n' => {}
                        other => out.push(other),
                    }
                }
                '\n' => return Err(self.error("newline in string")),
                c => out.push(c),
            }
        }
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, LiteralError> {
        let digits = self
            .src
            .get(self.pos..self.pos + count)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|e| self.error(e.to_string()))?;
        self.pos += count;
        Ok(code)
    }

    fn unicode_escape(&mut self) -> Result<char, LiteralError> {
        let high = self.hex_digits(4)?;
        if (0xD800..0xDC00).contains(&high) && self.src[self.pos..].starts_with("\\u") {
            let checkpoint = self.pos;
            self.pos += 2;
            let low = self.hex_digits(4)?;
            if (0xDC00..0xE000).contains(&low) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return Ok(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            self.pos = checkpoint;
        }
        Ok(char::from_u32(high).unwrap_or('\u{fffd}'))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        let text = text.strip_prefix('+').unwrap_or(text);
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number '{}'", text),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use serde_json::json;

    #[test]
    fn test_parse_search_data_script() {
        let text = "var searchData=\n[\n  ['rands_2ec',['rands.c',['../rands_8c.html',1,'']]],\n  ['it\\'s',[\"x\",['a.html',1,'b']]]\n];\n";
        let_assert!(Ok(bindings) = parse_script(text));
        check!(bindings.len() == 1);
        check!(bindings[0].0 == "searchData");
        check!(
            bindings[0].1
                == json!([
                    ["rands_2ec", ["rands.c", ["../rands_8c.html", 1, ""]]],
                    ["it's", ["x", ["a.html", 1, "b"]]]
                ])
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("var searchData={}", "[".repeat(200_000));
        let_assert!(Err(e) = parse_script(&deep));
        check!(e.message.contains("nesting"));
        check!(e.offset == MAX_DEPTH + "var searchData=".len());

        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        let_assert!(Ok(_) = parse_script(&ok));
        let over = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        let_assert!(Err(_) = parse_script(&over));
    }

    #[test]
    fn test_parse_bare_json() {
        let_assert!(Ok(bindings) = parse_script("[[\"a\", [\"A\", [\"\", \"a.html\"]]]]"));
        check!(bindings[0].0.is_empty());
        check!(bindings[0].1 == json!([["a", ["A", ["", "a.html"]]]]));
    }

    #[test]
    fn test_parse_objects_and_comments() {
        let text = "// generated\nvar indexSectionNames =\n{\n  0: \"all\",\n  1: 'files', /* trailing */\n};\nvar n = -1.5;";
        let_assert!(Ok(bindings) = parse_script(text));
        check!(bindings.len() == 2);
        check!(bindings[0].1 == json!({"0": "all", "1": "files"}));
        check!(bindings[1].1 == json!(-1.5));
    }

    #[test]
    fn test_unicode_escapes() {
        let_assert!(Ok(bindings) = parse_script(r"['\u00e9\uD83D\uDE00\x41']"));
        check!(bindings[0].1 == json!(["é😀A"]));
    }

    #[test]
    fn test_errors_carry_offset() {
        let_assert!(Err(err) = parse_script("var searchData=[['a',['A']"));
        check!(err.message == "unexpected end of input" || err.message.starts_with("expected"));

        let_assert!(Err(err) = parse_script("[1] junk"));
        check!(err.offset == 4);
        check!(err.message.contains("trailing"));
    }

    #[test]
    fn test_empty_table() {
        let_assert!(Ok(bindings) = parse_script("var searchData=\n[\n];\n"));
        check!(bindings[0].1 == json!([]));
    }
}
