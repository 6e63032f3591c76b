//! Parser for raw predicate fragments
//!
//! Accepts the WHERE-clause subset callers hand to `get_by_predicate`:
//! comparisons, `LIKE`, `IS [NOT] NULL`, `[NOT] IN (...)`, `AND`, `OR`,
//! `NOT` and parentheses. Identifiers are upper-cased and any table alias
//! prefix (`r.start_node_id`) is dropped. `?` introduces a positional
//! parameter.

use super::query::{CmpOp, Operand, Predicate};
use super::value::Value;
use super::StoreError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(Value),
    Op(CmpOp),
    LParen,
    RParen,
    Comma,
    Param,
}

fn malformed(msg: impl Into<String>) -> StoreError {
    StoreError::MalformedQuery(msg.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>, StoreError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Param);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 1;
            }
            '<' | '>' | '!' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('<', Some('=')) => (CmpOp::Le, 2),
                    ('<', Some('>')) => (CmpOp::Ne, 2),
                    ('<', _) => (CmpOp::Lt, 1),
                    ('>', Some('=')) => (CmpOp::Ge, 2),
                    ('>', _) => (CmpOp::Gt, 1),
                    ('!', Some('=')) => (CmpOp::Ne, 2),
                    _ => return Err(malformed(format!("unexpected '{}' at {}", c, i))),
                };
                tokens.push(Token::Op(op));
                i += width;
            }
            '\'' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(malformed("unterminated string literal")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            text.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = if literal.contains('.') {
                    literal
                        .parse::<f64>()
                        .map(Value::Real)
                        .map_err(|_| malformed(format!("bad number '{}'", literal)))?
                } else {
                    literal
                        .parse::<i64>()
                        .map(Value::Int)
                        .map_err(|_| malformed(format!("bad number '{}'", literal)))?
                };
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '$' | '.'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(word));
            }
            other => return Err(malformed(format!("unexpected '{}' at {}", other, i))),
        }
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses and `NOT` accepted in one fragment.
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    params: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), StoreError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(malformed("predicate nested too deeply"));
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), StoreError> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(malformed(format!("expected {:?}, found {:?}", expected, t))),
            None => Err(malformed(format!("expected {:?} at end of input", expected))),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, StoreError> {
        let mut items = vec![self.parse_and()?];
        while self.eat_keyword("OR") {
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Predicate::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<Predicate, StoreError> {
        let mut items = vec![self.parse_not()?];
        while self.eat_keyword("AND") {
            items.push(self.parse_not()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Predicate::And(items)
        })
    }

    fn parse_not(&mut self) -> Result<Predicate, StoreError> {
        if self.eat_keyword("NOT") {
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(inner.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate, StoreError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            self.descend()?;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }

        let left = self.parse_operand()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if !self.eat_keyword("NULL") {
                return Err(malformed("expected NULL after IS"));
            }
            return Ok(Predicate::IsNull {
                operand: left,
                negated,
            });
        }

        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("LIKE") {
            let op = if negated { CmpOp::NotLike } else { CmpOp::Like };
            let right = self.parse_operand()?;
            return Ok(Predicate::compare(left, op, right));
        }
        if self.eat_keyword("IN") {
            self.expect(Token::LParen)?;
            let mut list = vec![self.parse_operand()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                list.push(self.parse_operand()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Predicate::In {
                operand: left,
                list,
                negated,
            });
        }
        if negated {
            return Err(malformed("expected LIKE or IN after NOT"));
        }

        match self.next() {
            Some(Token::Op(op)) => {
                let right = self.parse_operand()?;
                Ok(Predicate::compare(left, op, right))
            }
            Some(t) => Err(malformed(format!("expected comparison, found {:?}", t))),
            None => Err(malformed("expected comparison at end of input")),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, StoreError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Operand::Value(Value::Text(s))),
            Some(Token::Number(n)) => Ok(Operand::Value(n)),
            Some(Token::Param) => {
                let index = self.params;
                self.params += 1;
                Ok(Operand::Param(index))
            }
            Some(Token::Ident(word)) => {
                if word.eq_ignore_ascii_case("NULL") {
                    return Ok(Operand::Value(Value::Null));
                }
                if is_keyword(&word) {
                    return Err(malformed(format!("unexpected keyword {}", word)));
                }
                let column = word.rsplit('.').next().unwrap_or(&word);
                if column.is_empty() {
                    return Err(malformed(format!("bad column reference '{}'", word)));
                }
                Ok(Operand::Column(column.to_ascii_uppercase()))
            }
            Some(t) => Err(malformed(format!("expected operand, found {:?}", t))),
            None => Err(malformed("expected operand at end of input")),
        }
    }
}

fn is_keyword(word: &str) -> bool {
    ["AND", "OR", "NOT", "LIKE", "IS", "IN"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

/// Parse a raw predicate fragment.
pub fn parse(input: &str) -> Result<Predicate, StoreError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(malformed("empty predicate"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        params: 0,
        depth: 0,
    };
    let predicate = parser.parse_or()?;
    if let Some(t) = parser.peek() {
        return Err(malformed(format!("unexpected trailing {:?}", t)));
    }
    Ok(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::query::col;
    use crate::store::value::Row;

    #[test]
    fn test_parse_simple_comparison() {
        let p = parse("node_id='n1'").unwrap();
        assert_eq!(p, Predicate::eq("NODE_ID", "n1"));
    }

    #[test]
    fn test_parse_strips_alias_and_keeps_precedence() {
        let p = parse("r.start_node_id = 'a' AND r.end_node_id = 'b' OR ordinal >= 2").unwrap();
        match p {
            Predicate::Or(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Predicate::And(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_quoted_escape_and_like() {
        let p = parse("description LIKE 'o''s %'").unwrap();
        let row = Row::new().with("DESCRIPTION", "o's route");
        assert!(p.matches(&row).unwrap());
    }

    #[test]
    fn test_parse_is_null_in_and_not() {
        let p = parse("NOT (availability IS NULL) AND node_id NOT IN ('a', 'b')").unwrap();
        let row = Row::new().with("AVAILABILITY", "AVAILABLE").with("NODE_ID", "c");
        assert!(p.matches(&row).unwrap());
        let row = Row::new().with("AVAILABILITY", "AVAILABLE").with("NODE_ID", "a");
        assert!(!p.matches(&row).unwrap());
    }

    #[test]
    fn test_parse_parameters_are_numbered_in_order() {
        let p = parse("start_node_id = ? AND end_node_id = ?").unwrap();
        assert_eq!(
            p,
            Predicate::And(vec![
                Predicate::compare(col("START_NODE_ID"), CmpOp::Eq, Operand::Param(0)),
                Predicate::compare(col("END_NODE_ID"), CmpOp::Eq, Operand::Param(1)),
            ])
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("*").is_err());
        assert!(parse("node_id = ").is_err());
        assert!(parse("node_id = 'unterminated").is_err());
        assert!(parse("node_id = 'a' extra").is_err());
        assert!(parse("(node_id = 'a'").is_err());
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let deep = format!("{}node_id = 'n1'{}", "(".repeat(2000), ")".repeat(2000));
        assert!(matches!(
            parse(&deep),
            Err(StoreError::MalformedQuery(msg)) if msg.contains("nested too deeply")
        ));

        let nots = format!("{}node_id = 'n1'", "NOT ".repeat(2000));
        assert!(matches!(parse(&nots), Err(StoreError::MalformedQuery(_))));

        let shallow = format!("{}node_id = 'n1'{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse(&shallow).unwrap(), Predicate::eq("NODE_ID", "n1"));
    }

    #[test]
    fn test_parse_negative_number() {
        let p = parse("ordinal > -1").unwrap();
        assert_eq!(
            p,
            Predicate::compare(col("ORDINAL"), CmpOp::Gt, Operand::Value(Value::Int(-1)))
        );
    }
}
