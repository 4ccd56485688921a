//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about semantics beyond recognising keywords,
//! identifiers, literals and punctuators. Multi-character punctuators are
//! matched before single-character ones, and keywords before identifiers.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Ident,
  Num,
  Str,
  Return,
  If,
  Else,
  While,
  For,
  /// A base type keyword: `int` or `char`.
  Type,
  Sizeof,
  Eof,
}

const KEYWORDS: [(&str, TokenKind); 8] = [
  ("return", TokenKind::Return),
  ("if", TokenKind::If),
  ("else", TokenKind::Else),
  ("while", TokenKind::While),
  ("for", TokenKind::For),
  ("sizeof", TokenKind::Sizeof),
  ("int", TokenKind::Type),
  ("char", TokenKind::Type),
];

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }

  /// The bytes between the quotes of a string literal, taken verbatim.
  pub fn str_contents<'a>(&self, source: &'a str) -> &'a str {
    &source[self.loc + 1..self.loc + self.len - 1]
  }
}

fn is_ident_start(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
  c.is_ascii_alphanumeric() || c == b'_'
}

/// Match a keyword at `i`, provided the keyword is not a prefix of a longer
/// identifier.
fn keyword_at(bytes: &[u8], i: usize) -> Option<(TokenKind, usize)> {
  KEYWORDS.into_iter().find_map(|(word, kind)| {
    let end = i + word.len();
    let matches = bytes[i..].starts_with(word.as_bytes())
      && bytes.get(end).is_none_or(|&c| !is_ident_char(c));
    matches.then_some((kind, word.len()))
  })
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if input[i..].starts_with("//") {
      i = input[i..].find('\n').map_or(bytes.len(), |n| i + n + 1);
      continue;
    }

    if input[i..].starts_with("/*") {
      let Some(close) = input[i + 2..].find("*/") else {
        return Err(CompileError::lexical(input, i, "unclosed block comment"));
      };
      i += close + 4;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .map_err(|err| CompileError::lexical(input, start, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if c == b'"' {
      let Some(close) = input[i + 1..].find('"') else {
        return Err(CompileError::lexical(input, i, "unclosed string literal"));
      };
      let len = close + 2;
      tokens.push(Token::new(TokenKind::Str, i, len, None));
      i += len;
      continue;
    }

    if let Some((kind, len)) = keyword_at(bytes, i) {
      tokens.push(Token::new(kind, i, len, None));
      i += len;
      continue;
    }

    if is_ident_start(c) {
      let start = i;
      i += 1;
      while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::Ident, start, i - start, None));
      continue;
    }

    if let Some(op) = ["==", "!=", "<=", ">="]
      .into_iter()
      .find(|op| input[i..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len(), None));
      i += op.len();
      continue;
    }

    if matches!(
      c,
      b'+'
        | b'-'
        | b'*'
        | b'/'
        | b'('
        | b')'
        | b'<'
        | b'>'
        | b'='
        | b';'
        | b'{'
        | b'}'
        | b','
        | b'&'
        | b'['
        | b']'
    ) {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1, None));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::lexical(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src).unwrap().iter().map(|t| t.kind).collect()
  }

  fn texts(src: &str) -> Vec<String> {
    tokenize(src)
      .unwrap()
      .iter()
      .map(|t| describe_token(Some(t), src))
      .collect()
  }

  #[test]
  fn keywords_need_a_word_boundary() {
    use TokenKind::*;
    assert_eq!(kinds("if iffy"), vec![If, Ident, Eof]);
    assert_eq!(kinds("return returned"), vec![Return, Ident, Eof]);
    assert_eq!(kinds("int intx char"), vec![Type, Ident, Type, Eof]);
    assert_eq!(kinds("sizeof(x)"), vec![Sizeof, Punctuator, Ident, Punctuator, Eof]);
    assert_eq!(kinds("for while else"), vec![For, While, Else, Eof]);
  }

  #[test]
  fn two_byte_operators_win() {
    assert_eq!(
      texts("a<=b>=c==d!=e<f>g=h"),
      vec!["a", "<=", "b", ">=", "c", "==", "d", "!=", "e", "<", "f", ">", "g", "=", "h", "EOF"]
    );
  }

  #[test]
  fn numbers_carry_their_value() {
    let tokens = tokenize("12 + 345").unwrap();
    assert_eq!(tokens[0].value, Some(12));
    assert_eq!(tokens[2].value, Some(345));
    assert_eq!(tokens[3].kind, TokenKind::Eof);
    assert_eq!(tokens[3].loc, 8);
  }

  #[test]
  fn strings_are_verbatim() {
    let src = r#"x = "a\nb";"#;
    let tokens = tokenize(src).unwrap();
    assert_eq!(tokens[2].kind, TokenKind::Str);
    assert_eq!(tokens[2].str_contents(src), r"a\nb");
  }

  #[test]
  fn comments_are_skipped() {
    let src = "1 // one\n/* two\n */ 3";
    assert_eq!(texts(src), vec!["1", "3", "EOF"]);
    assert_eq!(kinds("// only a comment"), vec![TokenKind::Eof]);
  }

  #[test]
  fn identifiers_allow_underscores_and_digits() {
    assert_eq!(texts("_a1 b_2"), vec!["_a1", "b_2", "EOF"]);
  }

  #[test]
  fn lexical_errors() {
    for src in ["1 $ 2", "/* never closed", "\"open", "a ! b", "99999999999999999999"] {
      let err = tokenize(src).unwrap_err();
      assert_eq!(err.kind(), Some(ErrorKind::Lexical), "{src}");
    }
  }
}
