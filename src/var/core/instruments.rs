//! Instruments — named linear combinations of variables and their lags.
//!
//! Purpose
//! -------
//! Let forecasts be conditioned on quantities that are not themselves model
//! variables (an interest-rate spread, a real rate, a two-quarter average).
//! An instrument is a structured descriptor: an ordered list of
//! `(variable, lag, coefficient)` triples. Text definitions such as
//!
//! ```text
//! spread := r - 0.5*r{-1} - 0.5*p
//! ```
//!
//! are parsed once into this structure at the boundary; the forecast engine
//! never sees strings.
//!
//! Invariants & assumptions
//! ------------------------
//! - Lags are non-negative and written `x{-k}`; leads are rejected.
//! - Repeated `(variable, lag)` pairs are merged by summing coefficients.
//! - Lags must not exceed the model order `P` (checked by
//!   [`Instrument::validate`] against a [`VarSpec`]).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::{
    core::spec::VarSpec,
    errors::{VarError, VarResult},
};

/// One `(variable, lag, coefficient)` triple.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstrumentTerm {
    pub variable: String,
    pub lag: usize,
    pub coefficient: f64,
}

/// Instrument — named linear combination `Σ c·y_{var, t-lag}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instrument {
    name: String,
    terms: Vec<InstrumentTerm>,
}

impl Instrument {
    /// Build from explicit `(variable, lag, coefficient)` triples.
    ///
    /// Errors
    /// ------
    /// - `VarError::InvalidInstrumentSpec` for an empty name, no terms, or a
    ///   non-finite coefficient.
    pub fn new(name: &str, terms: Vec<(String, usize, f64)>) -> VarResult<Self> {
        let invalid = |reason: &str| VarError::InvalidInstrumentSpec {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if terms.is_empty() {
            return Err(invalid("no terms"));
        }
        let mut merged: Vec<InstrumentTerm> = Vec::with_capacity(terms.len());
        for (variable, lag, coefficient) in terms {
            if !coefficient.is_finite() {
                return Err(invalid("non-finite coefficient"));
            }
            match merged.iter_mut().find(|t| t.variable == variable && t.lag == lag) {
                Some(term) => term.coefficient += coefficient,
                None => merged.push(InstrumentTerm { variable, lag, coefficient }),
            }
        }
        Ok(Instrument { name: name.to_string(), terms: merged })
    }

    /// Parse `name := expr`, e.g. `"ss := 0.5*x + y{-1} - z"`.
    ///
    /// Errors
    /// ------
    /// - `VarError::InvalidInstrumentSpec` on any syntax error, a lead
    ///   (`x{+1}`), or an empty right-hand side.
    pub fn parse(text: &str) -> VarResult<Self> {
        let (name, expr) = text.split_once(":=").ok_or_else(|| VarError::InvalidInstrumentSpec {
            name: text.trim().to_string(),
            reason: "expected 'name := expression'".to_string(),
        })?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(VarError::InvalidInstrumentSpec {
                name: name.to_string(),
                reason: "name must be an identifier".to_string(),
            });
        }
        let terms = Parser::new(expr).terms().map_err(|reason| {
            VarError::InvalidInstrumentSpec { name: name.to_string(), reason }
        })?;
        Instrument::new(name, terms)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &[InstrumentTerm] {
        &self.terms
    }

    /// Largest lag referenced.
    pub fn max_lag(&self) -> usize {
        self.terms.iter().map(|t| t.lag).max().unwrap_or(0)
    }

    /// Check variables and lags against `spec`.
    ///
    /// Errors
    /// ------
    /// - `VarError::InvalidInstrumentSpec` if a variable is not in `spec`,
    ///   a lag exceeds `P`, or the name collides with a model variable.
    pub fn validate(&self, spec: &VarSpec) -> VarResult<()> {
        if spec.index_of(&self.name).is_some() {
            return Err(VarError::InvalidInstrumentSpec {
                name: self.name.clone(),
                reason: "name collides with a model variable".to_string(),
            });
        }
        for term in &self.terms {
            if spec.index_of(&term.variable).is_none() {
                return Err(VarError::InvalidInstrumentSpec {
                    name: self.name.clone(),
                    reason: format!("unknown variable '{}'", term.variable),
                });
            }
            if term.lag > spec.order() {
                return Err(VarError::InvalidInstrumentSpec {
                    name: self.name.clone(),
                    reason: format!("lag {} exceeds model order {}", term.lag, spec.order()),
                });
            }
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Recursive-descent parser for `expr := term (('+'|'-') term)*`,
/// `term := [number '*'] ident ['{' '-' int '}']`.
struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src: src.as_bytes(), pos: 0 }
    }

    fn terms(mut self) -> Result<Vec<(String, usize, f64)>, String> {
        let mut out = Vec::new();
        let mut sign = self.sign();
        loop {
            let (variable, lag, coefficient) = self.term()?;
            out.push((variable, lag, sign * coefficient));
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(b'+') | Some(b'-') => sign = self.sign(),
                Some(c) => return Err(format!("unexpected '{}'", c as char)),
            }
        }
        Ok(out)
    }

    /// Consume any run of leading `+`/`-` and return the net sign.
    fn sign(&mut self) -> f64 {
        let mut sign = 1.0;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'+') => self.pos += 1,
                Some(b'-') => {
                    sign = -sign;
                    self.pos += 1;
                }
                _ => return sign,
            }
        }
    }

    fn term(&mut self) -> Result<(String, usize, f64), String> {
        self.skip_ws();
        let coefficient = match self.peek() {
            Some(c) if c.is_ascii_digit() || c == b'.' => {
                let value = self.number()?;
                self.skip_ws();
                if self.peek() != Some(b'*') {
                    return Err("expected '*' after coefficient".to_string());
                }
                self.pos += 1;
                value
            }
            _ => 1.0,
        };
        self.skip_ws();
        let variable = self.identifier()?;
        self.skip_ws();
        let lag = if self.peek() == Some(b'{') { self.lag()? } else { 0 };
        Ok((variable, lag, coefficient))
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let exponent_sign = (c == b'-' || c == b'+')
                && self.pos > start
                && matches!(self.src[self.pos - 1], b'e' | b'E');
            if c.is_ascii_digit() || c == b'.' || c == b'e' || c == b'E' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        text.parse::<f64>().map_err(|_| format!("invalid number '{text}'"))
    }

    fn identifier(&mut self) -> Result<String, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let ident = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        if is_identifier(ident) {
            Ok(ident.to_string())
        } else {
            Err("expected variable name".to_string())
        }
    }

    fn lag(&mut self) -> Result<usize, String> {
        self.pos += 1; // '{'
        self.skip_ws();
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            _ => false,
        };
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        let k: usize = digits.parse().map_err(|_| "expected integer lag".to_string())?;
        self.skip_ws();
        if self.peek() != Some(b'}') {
            return Err("expected '}'".to_string());
        }
        self.pos += 1;
        if !negative && k != 0 {
            return Err("leads are not allowed in instruments".to_string());
        }
        Ok(k)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }
}
