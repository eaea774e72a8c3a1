//! `cfg(...)` expressions as found in dependency platform filters.
//!
//! Grammar:
//! ```text
//! filter  := "cfg(" expr ")"
//! expr    := "all(" list ")" | "any(" list ")" | "not(" expr ")"
//!          | ident "=" string | ident
//! list    := [ expr { "," expr } [ "," ] ]
//! ```

use crate::error::{Result, TargetError};
use crate::platform::DeploymentTarget;

/// A parsed cfg predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgExpr {
    All(Vec<CfgExpr>),
    Any(Vec<CfgExpr>),
    Not(Box<CfgExpr>),
    /// Bare name, e.g. `unix`.
    Name(String),
    /// `key = "value"`.
    KeyValue(String, String),
}

impl CfgExpr {
    /// Parse a full `cfg(...)` filter.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser::new(input);
        parser.skip_ws();
        parser.expect_ident("cfg")?;
        parser.expect('(')?;
        let expr = parser.expr()?;
        parser.expect(')')?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("trailing input after cfg(...)"));
        }
        Ok(expr)
    }

    /// Evaluate against a deployment target.
    ///
    /// Names the target does not define (`test`, `debug_assertions`,
    /// `feature = "..."`) evaluate to false.
    pub fn eval(&self, target: &DeploymentTarget) -> bool {
        match self {
            CfgExpr::All(exprs) => exprs.iter().all(|e| e.eval(target)),
            CfgExpr::Any(exprs) => exprs.iter().any(|e| e.eval(target)),
            CfgExpr::Not(expr) => !expr.eval(target),
            CfgExpr::Name(name) => target.has_flag(name),
            CfgExpr::KeyValue(key, value) => target.has_cfg(key, value),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn error(&self, detail: impl Into<String>) -> TargetError {
        TargetError::CfgParse {
            input: self.input.to_string(),
            position: self.pos,
            detail: detail.into(),
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn expect_ident(&mut self, expected: &str) -> Result<()> {
        let start = self.pos;
        let ident = self.ident()?;
        if ident == expected {
            Ok(())
        } else {
            self.pos = start;
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    fn string(&mut self) -> Result<String> {
        self.expect('"')?;
        let rest = self.rest();
        match rest.find('"') {
            Some(end) => {
                self.pos += end + 1;
                Ok(rest[..end].to_string())
            }
            None => Err(self.error("unterminated string")),
        }
    }

    fn expr(&mut self) -> Result<CfgExpr> {
        let ident = self.ident()?;
        self.skip_ws();
        match (ident, self.peek()) {
            ("all", Some('(')) => Ok(CfgExpr::All(self.list()?)),
            ("any", Some('(')) => Ok(CfgExpr::Any(self.list()?)),
            ("not", Some('(')) => {
                self.expect('(')?;
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(CfgExpr::Not(Box::new(inner)))
            }
            (_, Some('=')) => {
                self.expect('=')?;
                let value = self.string()?;
                Ok(CfgExpr::KeyValue(ident.to_string(), value))
            }
            _ => Ok(CfgExpr::Name(ident.to_string())),
        }
    }

    fn list(&mut self) -> Result<Vec<CfgExpr>> {
        self.expect('(')?;
        let mut exprs = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(')') {
                self.pos += 1;
                return Ok(exprs);
            }
            exprs.push(self.expr()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {}
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }
}
