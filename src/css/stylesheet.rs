//! Minimal CSSOM for `<style>` elements.
//!
//! A sheet is an ordered list of rule texts. Rules come either from the
//! element's text content, split into top-level rules when the sheet is
//! created, or from programmatic [`CssStyleSheet::insert_rule`] calls. Only
//! the first kind survives a detach/re-append cycle of the owning element.

use crate::error::DomError;
use cssparser::{ParseError, Parser, ParserInput, Token};

/// The live stylesheet attached to a connected `<style>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssStyleSheet {
  rules: Vec<String>,
}

impl CssStyleSheet {
  /// Create an empty sheet.
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a sheet from stylesheet text.
  ///
  /// An unterminated trailing at-rule (e.g. `@import "a.css"` with no `;`) is
  /// dropped, the same way a browser discards it.
  pub fn from_text(css: &str) -> Self {
    let (rules, _) = scan_rules(css);
    Self { rules }
  }

  /// Ordered rule texts, the equivalent of `sheet.cssRules[i].cssText`.
  pub fn css_rules(&self) -> &[String] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Insert a single rule at `index`, returning the index.
  ///
  /// Fails with [`DomError::Syntax`] unless `rule` is exactly one complete
  /// rule, and with [`DomError::IndexSize`] when `index` is past the end.
  pub fn insert_rule(&mut self, rule: &str, index: usize) -> Result<usize, DomError> {
    let (mut parsed, trailing) = scan_rules(rule);
    if parsed.len() != 1 || trailing {
      return Err(DomError::Syntax {
        rule: rule.to_string(),
      });
    }
    if index > self.rules.len() {
      return Err(DomError::IndexSize {
        index,
        length: self.rules.len(),
      });
    }
    self.rules.insert(index, parsed.remove(0));
    Ok(index)
  }

  /// Insert a rule after every existing rule.
  pub fn append_rule(&mut self, rule: &str) -> Result<usize, DomError> {
    self.insert_rule(rule, self.rules.len())
  }

  pub fn delete_rule(&mut self, index: usize) -> Result<(), DomError> {
    if index >= self.rules.len() {
      return Err(DomError::IndexSize {
        index,
        length: self.rules.len(),
      });
    }
    self.rules.remove(index);
    Ok(())
  }
}

/// Split `css` into top-level rule texts.
///
/// Returns the complete rules plus whether unterminated input was left over.
/// A qualified rule ends with its `{}` block; an at-rule ends with its block
/// or a `;`.
fn scan_rules(css: &str) -> (Vec<String>, bool) {
  let mut input = ParserInput::new(css);
  let mut parser = Parser::new(&mut input);
  let mut rules = Vec::new();
  let mut trailing = false;

  'rules: loop {
    parser.skip_whitespace();
    if parser.is_exhausted() {
      break;
    }

    let start = parser.position();
    let mut is_at_rule = false;
    let mut first = true;
    let mut complete = false;

    loop {
      let token = match parser.next() {
        Ok(token) => token.clone(),
        Err(_) => break,
      };
      if first {
        // HTML comment markers are ignored at the top level of a sheet.
        if matches!(token, Token::CDO | Token::CDC) {
          continue 'rules;
        }
        is_at_rule = matches!(token, Token::AtKeyword(_));
        first = false;
      }
      match token {
        Token::CurlyBracketBlock => {
          let _: Result<(), ParseError<()>> = parser.parse_nested_block(|p| {
            while p.next().is_ok() {}
            Ok(())
          });
          complete = true;
          break;
        }
        Token::Semicolon if is_at_rule => {
          complete = true;
          break;
        }
        _ => {}
      }
    }

    let text = parser.slice_from(start).trim();
    if complete {
      rules.push(text.to_string());
    } else if !text.is_empty() {
      trailing = true;
    }
  }

  (rules, trailing)
}
