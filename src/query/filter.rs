//! `$filter` parsing into a predicate tree handed to the backend.
//!
//! Covers comparisons (`eq ne gt ge lt le`) between property paths and literals, combined with
//! `and`, `or`, `not` and parentheses. Functions and arithmetic are not supported.

use crate::error::AppError;
use crate::model::{EntityId, EntityType};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "gt" => CompareOp::Gt,
            "ge" => CompareOp::Ge,
            "lt" => CompareOp::Lt,
            "le" => CompareOp::Le,
            _ => return None,
        })
    }

    fn keyword(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }

    /// Apply the operator to the result of comparing two values; `None` means incomparable.
    pub fn test(self, ord: Option<std::cmp::Ordering>) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ord == Some(Equal),
            CompareOp::Ne => ord != Some(Equal),
            CompareOp::Gt => ord == Some(Greater),
            CompareOp::Ge => matches!(ord, Some(Greater | Equal)),
            CompareOp::Lt => ord == Some(Less),
            CompareOp::Le => matches!(ord, Some(Less | Equal)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Property path as written, e.g. `["Thing", "id"]` or `["phenomenonTime"]`.
    Path(Vec<String>),
    Literal(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    Compare { left: Operand, op: CompareOp, right: Operand },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// `{Type}/id eq {id}`: the one filter the engine builds itself.
    pub fn id_eq(entity_type: EntityType, id: &EntityId) -> Self {
        FilterExpr::Compare {
            left: Operand::Path(vec![entity_type.singular().to_string(), "id".to_string()]),
            op: CompareOp::Eq,
            right: Operand::Literal(id.to_value()),
        }
    }

    /// Conjunction of an optional filter with another one.
    pub fn and(left: Option<FilterExpr>, right: FilterExpr) -> FilterExpr {
        match left {
            Some(left) => FilterExpr::And(Box::new(left), Box::new(right)),
            None => right,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Path(segments) => f.write_str(&segments.join("/")),
            Operand::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Operand::Literal(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Compare { left, op, right } => write!(f, "{} {} {}", left, op.keyword(), right),
            FilterExpr::And(a, b) => write!(f, "({} and {})", a, b),
            FilterExpr::Or(a, b) => write!(f, "({} or {})", a, b),
            FilterExpr::Not(a) => write!(f, "not ({})", a),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    Word(String),
    Literal(Value),
}

fn tokenize(input: &str) -> Result<Vec<Token>, AppError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '\'' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(AppError::FilterParse("unterminated string literal".into())),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        s.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(*ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Literal(Value::String(s)));
        } else if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | ':' | '-' | '+')) {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            tokens.push(Token::Literal(number_or_datetime(&raw)?));
        } else if c.is_alphabetic() || c == '@' || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '/' | '.' | '@')) {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            return Err(AppError::FilterParse(format!("unexpected character '{}'", c)));
        }
    }
    Ok(tokens)
}

/// Numeric literals become numbers; ISO 8601 timestamps stay strings for the backend to interpret.
fn number_or_datetime(raw: &str) -> Result<Value, AppError> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Ok(Value::Number(n));
        }
    }
    if chrono::DateTime::parse_from_rfc3339(raw).is_ok() || chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return Ok(Value::String(raw.to_string()));
    }
    Err(AppError::FilterParse(format!("invalid literal {}", raw)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w == keyword)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> Result<FilterExpr, AppError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, AppError> {
        let mut left = self.parse_unary()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, AppError> {
        if self.peek_keyword("not") {
            self.pos += 1;
            return Ok(FilterExpr::Not(Box::new(self.parse_unary()?)));
        }
        if self.tokens.get(self.pos) == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err(AppError::FilterParse("missing closing parenthesis".into())),
            };
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, AppError> {
        let left = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Word(w)) => CompareOp::from_keyword(&w)
                .ok_or_else(|| AppError::FilterParse(format!("unsupported operator {}", w)))?,
            _ => return Err(AppError::FilterParse("expected a comparison operator".into())),
        };
        let right = self.parse_operand()?;
        Ok(FilterExpr::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, AppError> {
        match self.next() {
            Some(Token::Literal(v)) => Ok(Operand::Literal(v)),
            Some(Token::Word(w)) => Ok(match w.as_str() {
                "true" => Operand::Literal(Value::Bool(true)),
                "false" => Operand::Literal(Value::Bool(false)),
                "null" => Operand::Literal(Value::Null),
                "and" | "or" | "not" | "eq" | "ne" | "gt" | "ge" | "lt" | "le" => {
                    return Err(AppError::FilterParse(format!("unexpected keyword {}", w)))
                }
                _ => {
                    if self.tokens.get(self.pos) == Some(&Token::LParen) {
                        return Err(AppError::FilterParse(format!("unsupported function {}", w)));
                    }
                    Operand::Path(w.split('/').map(str::to_string).collect())
                }
            }),
            Some(Token::LParen) | Some(Token::RParen) => Err(AppError::FilterParse("unexpected parenthesis".into())),
            None => Err(AppError::FilterParse("unexpected end of filter".into())),
        }
    }
}

pub fn parse_filter(input: &str) -> Result<FilterExpr, AppError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(AppError::FilterParse("empty filter".into()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(AppError::FilterParse("trailing input after expression".into()));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> Operand {
        Operand::Path(p.split('/').map(str::to_string).collect())
    }

    #[test]
    fn parses_simple_comparison() {
        assert_eq!(
            parse_filter("result gt 12.5").unwrap(),
            FilterExpr::Compare {
                left: path("result"),
                op: CompareOp::Gt,
                right: Operand::Literal(json!(12.5)),
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_filter("name eq 'a' or name eq 'b' and result lt 3").unwrap();
        match expr {
            FilterExpr::Or(_, right) => assert!(matches!(*right, FilterExpr::And(_, _))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_paths_datetimes_and_grouping() {
        let expr = parse_filter("not (Datastream/id eq 1) and phenomenonTime ge 2024-01-02T00:00:00Z").unwrap();
        assert_eq!(
            expr.to_string(),
            "(not (Datastream/id eq 1) and phenomenonTime ge '2024-01-02T00:00:00Z')"
        );
    }

    #[test]
    fn escapes_quotes_in_strings() {
        let expr = parse_filter("name eq 'O''Brien'").unwrap();
        assert_eq!(
            expr,
            FilterExpr::Compare {
                left: path("name"),
                op: CompareOp::Eq,
                right: Operand::Literal(json!("O'Brien")),
            }
        );
        assert_eq!(expr.to_string(), "name eq 'O''Brien'");
    }

    #[test]
    fn synthetic_id_filter_round_trips() {
        let expr = FilterExpr::id_eq(EntityType::Thing, &EntityId::Int(1));
        assert_eq!(expr.to_string(), "Thing/id eq 1");
        assert_eq!(parse_filter(&expr.to_string()).unwrap(), expr);
        let expr = FilterExpr::id_eq(EntityType::Sensor, &EntityId::from("s-1"));
        assert_eq!(expr.to_string(), "Sensor/id eq 's-1'");
    }

    #[test]
    fn rejects_malformed_filters() {
        for bad in ["", "result gt", "result between 1", "(result eq 1", "substringof('a', name)", "name eq 'x", "result eq 1 1", "a # b"] {
            assert!(matches!(parse_filter(bad), Err(AppError::FilterParse(_))), "{}", bad);
        }
    }
}
