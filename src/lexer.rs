pub mod error;

pub use error::{LexError, LexResult};

use crate::token::{Span, Token, TokenKind};

/// Character classification used by the lookahead window.
type Pattern = fn(char) -> bool;

const ESCAPES: [char; 7] = ['b', 'n', 'r', 't', '\'', '"', '\\'];
const OPERATORS: &str = "$&+,:;=?@#|<>.-^*()%!/[]{}~";
const TWO_CHAR_OPERATORS: [[char; 2]; 4] = [['<', '='], ['>', '='], ['!', '='], ['=', '=']];

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{8}')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_sign(c: char) -> bool {
    c == '+' || c == '-'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_dot(c: char) -> bool {
    c == '.'
}

fn is_single_quote(c: char) -> bool {
    c == '\''
}

fn is_double_quote(c: char) -> bool {
    c == '"'
}

fn is_backslash(c: char) -> bool {
    c == '\\'
}

fn is_escape(c: char) -> bool {
    ESCAPES.contains(&c)
}

fn is_character_body(c: char) -> bool {
    !matches!(c, '\'' | '\n' | '\r' | '\\')
}

fn is_string_body(c: char) -> bool {
    !matches!(c, '"' | '\n' | '\r' | '\\')
}

fn is_operator(c: char) -> bool {
    OPERATORS.contains(c)
}

/// Single forward scan over the source with a small lookahead window.
///
/// `index` is the character offset of the cursor and `length` the number of
/// characters consumed into the token currently being built.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
    length: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            index: 0,
            length: 0,
        }
    }

    pub fn lex(mut self) -> LexResult<Vec<Token<'a>>> {
        let mut tokens = Vec::new();
        while self.has(0) {
            if self.match_(&[is_whitespace]) {
                self.skip();
            } else {
                tokens.push(self.lex_token()?);
            }
        }
        Ok(tokens)
    }

    fn lex_token(&mut self) -> LexResult<Token<'a>> {
        if self.peek(&[is_identifier_start]) {
            Ok(self.lex_identifier())
        } else if self.peek(&[is_sign, is_digit]) || self.peek(&[is_digit]) {
            Ok(self.lex_number())
        } else if self.peek(&[is_single_quote]) {
            self.lex_character()
        } else if self.peek(&[is_double_quote]) {
            self.lex_string()
        } else {
            self.lex_operator()
        }
    }

    fn lex_identifier(&mut self) -> Token<'a> {
        self.match_(&[is_identifier_start]);
        while self.match_(&[is_identifier_part]) {}
        self.emit(TokenKind::Identifier)
    }

    fn lex_number(&mut self) -> Token<'a> {
        self.match_(&[is_sign]);
        while self.match_(&[is_digit]) {}
        if self.match_(&[is_dot, is_digit]) {
            while self.match_(&[is_digit]) {}
            return self.emit(TokenKind::Decimal);
        }
        self.emit(TokenKind::Integer)
    }

    fn lex_character(&mut self) -> LexResult<Token<'a>> {
        self.match_(&[is_single_quote]);
        if self.peek(&[is_backslash]) {
            self.lex_escape()?;
        } else if !self.match_(&[is_character_body]) {
            if self.peek(&[is_single_quote]) {
                return Err(LexError::EmptyCharacter {
                    position: self.index,
                });
            }
            return Err(LexError::UnterminatedCharacter {
                position: self.index,
            });
        }
        if !self.match_(&[is_single_quote]) {
            return Err(LexError::UnterminatedCharacter {
                position: self.index,
            });
        }
        Ok(self.emit(TokenKind::Character))
    }

    fn lex_string(&mut self) -> LexResult<Token<'a>> {
        self.match_(&[is_double_quote]);
        loop {
            if self.match_(&[is_double_quote]) {
                return Ok(self.emit(TokenKind::String));
            }
            if self.peek(&[is_backslash]) {
                self.lex_escape().map_err(|error| match error {
                    LexError::UnterminatedCharacter { position } => {
                        LexError::UnterminatedString { position }
                    }
                    other => other,
                })?;
            } else if !self.match_(&[is_string_body]) {
                return Err(LexError::UnterminatedString {
                    position: self.index,
                });
            }
        }
    }

    /// Consumes a backslash and the escape character after it. The text stays
    /// raw; decoding happens when the parser builds the literal.
    fn lex_escape(&mut self) -> LexResult<()> {
        self.match_(&[is_backslash]);
        if self.match_(&[is_escape]) {
            return Ok(());
        }
        match self.get(0) {
            Some(escape) => Err(LexError::InvalidEscape {
                escape,
                position: self.index,
            }),
            None => Err(LexError::UnterminatedCharacter {
                position: self.index,
            }),
        }
    }

    fn lex_operator(&mut self) -> LexResult<Token<'a>> {
        let two_char = TWO_CHAR_OPERATORS
            .iter()
            .any(|[first, second]| self.get(0) == Some(*first) && self.get(1) == Some(*second));
        if two_char {
            self.advance();
            self.advance();
        } else if !self.match_(&[is_operator]) {
            let character = self.get(0).unwrap_or_default();
            return Err(LexError::UnexpectedCharacter {
                character,
                position: self.index,
            });
        }
        Ok(self.emit(TokenKind::Operator))
    }

    /// Returns true if the next characters satisfy `patterns` position by
    /// position, without consuming anything.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        patterns
            .iter()
            .enumerate()
            .all(|(offset, pattern)| self.get(offset).is_some_and(pattern))
    }

    /// Like `peek`, but consumes the matched characters on success.
    fn match_(&mut self, patterns: &[Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in patterns {
                self.advance();
            }
        }
        matched
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.chars.len()
    }

    fn get(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|&(_, c)| c)
    }

    fn advance(&mut self) {
        self.index += 1;
        self.length += 1;
    }

    fn skip(&mut self) {
        self.length = 0;
    }

    fn byte_offset(&self, index: usize) -> usize {
        self.chars
            .get(index)
            .map_or(self.input.len(), |&(byte, _)| byte)
    }

    fn emit(&mut self, kind: TokenKind) -> Token<'a> {
        let start = self.index - self.length;
        let text = &self.input[self.byte_offset(start)..self.byte_offset(self.index)];
        self.skip();
        Token::new(kind, text, Span::new(start, self.index))
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let tokens = Lexer::new(input).lex()?;
    tracing::debug!(tokens = tokens.len(), "tokenized source");
    Ok(tokens)
}
