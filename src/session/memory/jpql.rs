//! Query text parser for the in-memory runtime
//!
//! Accepts the subset of JPQL the runtime can execute:
//!
//! ```text
//! [select [distinct] (alias | count([distinct] alias))]
//! from Entity [as] alias (, Entity [as] alias)*
//! [where condition]
//! [group by path (, path)*]
//! [order by path [asc|desc] (, path [asc|desc])*]
//! ```
//!
//! Conditions support `and`, `or`, `not`, parentheses, comparison
//! operators, `[not] like`, `is [not] null`, literals and `:named`
//! parameters. Anything else is a malformed query.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::criteria::{
    ComparisonOp, CriteriaQuery, Expression, Order, ParameterExpression, Path, Predicate,
    ResultType, Selection, ValueType,
};
use crate::session::{SessionError, SessionResult};

const RESERVED: &[&str] = &[
    "select", "from", "where", "group", "order", "by", "and", "or", "not", "as", "having", "join",
    "on", "asc", "desc", "distinct", "count", "like", "is", "null", "true", "false",
];

/// Parsed query text
#[derive(Debug)]
pub(crate) struct ParsedQuery {
    pub criteria: CriteriaQuery,
    /// Named parameters, by name
    pub named: BTreeMap<String, ParameterExpression>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    Param(String),
    Symbol(&'static str),
}

enum SelectItem {
    Alias(String),
    Count { alias: String, distinct: bool },
}

/// Parses `text` into a criteria query
pub(crate) fn parse(text: &str) -> SessionResult<ParsedQuery> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        named: BTreeMap::new(),
    };
    let criteria = parser.statement()?;
    Ok(ParsedQuery {
        criteria,
        named: parser.named,
    })
}

fn tokenize(text: &str) -> SessionResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token::Number(number(&literal)?));
            continue;
        }

        if c == '\'' {
            let mut value = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(SessionError::malformed("unterminated string literal")),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        value.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(other) => {
                        value.push(*other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(value));
            continue;
        }

        if c == ':' {
            let start = i + 1;
            i += 1;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if start == i {
                return Err(SessionError::malformed("empty parameter name"));
            }
            tokens.push(Token::Param(chars[start..i].iter().collect()));
            continue;
        }

        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        let symbol = match two.as_str() {
            "<>" => Some("<>"),
            "!=" => Some("<>"),
            "<=" => Some("<="),
            ">=" => Some(">="),
            _ => None,
        };
        if let Some(symbol) = symbol {
            tokens.push(Token::Symbol(symbol));
            i += 2;
            continue;
        }

        let symbol = match c {
            '(' => "(",
            ')' => ")",
            ',' => ",",
            '=' => "=",
            '<' => "<",
            '>' => ">",
            other => {
                return Err(SessionError::malformed(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        };
        tokens.push(Token::Symbol(symbol));
        i += 1;
    }

    Ok(tokens)
}

fn number(literal: &str) -> SessionResult<Value> {
    if let Ok(i) = literal.parse::<i64>() {
        return Ok(Value::from(i));
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| SessionError::malformed(format!("invalid number '{}'", literal)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    named: BTreeMap<String, ParameterExpression>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> SessionResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword)))
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> SessionResult<()> {
        if self.is_symbol(symbol) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", symbol)))
        }
    }

    fn unexpected(&self, expected: &str) -> SessionError {
        match self.peek() {
            Some(token) => SessionError::malformed(format!("expected {}, found {:?}", expected, token)),
            None => SessionError::malformed(format!("expected {}, found end of query", expected)),
        }
    }

    /// Identifier that is not a reserved word
    fn identifier(&mut self, what: &str) -> SessionResult<String> {
        match self.peek() {
            Some(Token::Ident(s)) if !is_reserved(s) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Entity names may coincide with keywords (`Order`, `Group`)
    fn entity_name(&mut self) -> SessionResult<String> {
        match self.peek() {
            Some(Token::Ident(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected("entity name")),
        }
    }

    fn statement(&mut self) -> SessionResult<CriteriaQuery> {
        let mut distinct = false;
        let mut select = None;
        if self.eat_keyword("select") {
            distinct = self.eat_keyword("distinct");
            select = Some(self.select_item()?);
        }

        self.expect_keyword("from")?;
        let mut sources = Vec::new();
        loop {
            let entity = self.entity_name()?;
            self.eat_keyword("as");
            let alias = self.identifier("alias")?;
            if alias.contains('.') || entity.contains('.') {
                return Err(SessionError::malformed("joins are not supported"));
            }
            sources.push((entity, alias));
            if self.is_symbol(",") {
                self.pos += 1;
            } else {
                break;
            }
        }

        let result = match select {
            Some(SelectItem::Count { .. }) => ResultType::Long,
            _ => ResultType::Entity,
        };
        let mut query = CriteriaQuery::new(result);
        for (entity, alias) in &sources {
            if query.has_alias(alias) {
                return Err(SessionError::malformed(format!("duplicate alias '{}'", alias)));
            }
            query.from_with_alias(entity, alias);
        }
        query.distinct(distinct);
        match select {
            Some(SelectItem::Alias(alias)) => {
                query.select(Selection::Root(alias));
            }
            Some(SelectItem::Count { alias, distinct }) => {
                query.select(Selection::Count { alias, distinct });
            }
            None => {}
        }

        if self.eat_keyword("where") {
            let predicate = self.disjunction()?;
            query.where_(predicate);
        }

        if self.eat_keyword("group") {
            self.expect_keyword("by")?;
            let mut groups = vec![self.path_expression()?];
            while self.is_symbol(",") {
                self.pos += 1;
                groups.push(self.path_expression()?);
            }
            query.group_by(groups);
        }

        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            let mut orders = Vec::new();
            loop {
                let expression = self.path_expression()?;
                let order = if self.eat_keyword("desc") {
                    Order::desc(expression)
                } else {
                    self.eat_keyword("asc");
                    Order::asc(expression)
                };
                orders.push(order);
                if self.is_symbol(",") {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            query.order_by(orders);
        }

        if let Some(token) = self.peek() {
            return Err(SessionError::malformed(format!("unexpected trailing {:?}", token)));
        }

        Ok(query)
    }

    fn select_item(&mut self) -> SessionResult<SelectItem> {
        if self.is_keyword("count") && matches!(self.peek_at(1), Some(Token::Symbol("("))) {
            self.pos += 2;
            let distinct = self.eat_keyword("distinct");
            let alias = self.identifier("alias")?;
            self.expect_symbol(")")?;
            return Ok(SelectItem::Count { alias, distinct });
        }
        let alias = self.identifier("alias")?;
        if alias.contains('.') {
            return Err(SessionError::malformed("only entity projections are supported"));
        }
        Ok(SelectItem::Alias(alias))
    }

    fn disjunction(&mut self) -> SessionResult<Predicate> {
        let mut items = vec![self.conjunction()?];
        while self.eat_keyword("or") {
            items.push(self.conjunction()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Predicate::Or(items)
        })
    }

    fn conjunction(&mut self) -> SessionResult<Predicate> {
        let mut items = vec![self.negation()?];
        while self.eat_keyword("and") {
            items.push(self.negation()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Predicate::And(items)
        })
    }

    fn negation(&mut self) -> SessionResult<Predicate> {
        if self.eat_keyword("not") {
            return Ok(Predicate::Not(Box::new(self.negation()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> SessionResult<Predicate> {
        if self.is_symbol("(") {
            self.pos += 1;
            let predicate = self.disjunction()?;
            self.expect_symbol(")")?;
            return Ok(predicate);
        }

        let left = self.operand()?;

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(if negated {
                Predicate::IsNotNull(left)
            } else {
                Predicate::IsNull(left)
            });
        }

        if self.eat_keyword("not") {
            self.expect_keyword("like")?;
            let pattern = self.operand()?;
            return Ok(Predicate::Not(Box::new(Predicate::Like {
                expression: left,
                pattern,
            })));
        }

        if self.eat_keyword("like") {
            let pattern = self.operand()?;
            return Ok(Predicate::Like {
                expression: left,
                pattern,
            });
        }

        let op = match self.advance() {
            Some(Token::Symbol("=")) => ComparisonOp::Eq,
            Some(Token::Symbol("<>")) => ComparisonOp::Ne,
            Some(Token::Symbol(">")) => ComparisonOp::Gt,
            Some(Token::Symbol(">=")) => ComparisonOp::Ge,
            Some(Token::Symbol("<")) => ComparisonOp::Lt,
            Some(Token::Symbol("<=")) => ComparisonOp::Le,
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("comparison operator"));
            }
        };
        let right = self.operand()?;
        Ok(Predicate::Comparison { op, left, right })
    }

    fn operand(&mut self) -> SessionResult<Expression> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expression::Literal(n)),
            Some(Token::Str(s)) => Ok(Expression::Literal(Value::String(s))),
            Some(Token::Param(name)) => {
                let parameter = self
                    .named
                    .entry(name.clone())
                    .or_insert_with(|| ParameterExpression::named(name, ValueType::Any))
                    .clone();
                Ok(Expression::Parameter(parameter))
            }
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("true") => Ok(Expression::Literal(Value::Bool(true))),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("false") => Ok(Expression::Literal(Value::Bool(false))),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("null") => Ok(Expression::Literal(Value::Null)),
            Some(Token::Ident(s)) if !is_reserved(&s) => Ok(Expression::Path(split_path(&s))),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("operand"))
            }
        }
    }

    fn path_expression(&mut self) -> SessionResult<Expression> {
        let ident = self.identifier("path")?;
        Ok(Expression::Path(split_path(&ident)))
    }
}

fn split_path(ident: &str) -> Path {
    match ident.split_once('.') {
        Some((alias, attribute)) => Path::new(alias, Some(attribute.to_string())),
        None => Path::new(ident, None),
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}
