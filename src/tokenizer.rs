use std::iter::Peekable;
use std::str::Chars;

use crate::types::{ShellError, ShellResult};
use crate::word::{Word, WordPart};

/// A lexical unit of a command line. Operators are only recognized as whole,
/// unquoted words.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<W = String> {
    Word(W),
    Pipe,       // |
    Redirect,   // >
    Background, // &
    Comment,    // #
}

impl Token<Word> {
    /// Runs variable expansion on word tokens.
    pub fn expand(self) -> Token<String> {
        self.map(|word| word.expand())
    }
}

impl<W> Token<W> {
    pub fn map<T, F: FnOnce(W) -> T>(self, f: F) -> Token<T> {
        match self {
            Token::Word(w) => Token::Word(f(w)),
            Token::Pipe => Token::Pipe,
            Token::Redirect => Token::Redirect,
            Token::Background => Token::Background,
            Token::Comment => Token::Comment,
        }
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub fn tokenize(input: &str) -> ShellResult<Vec<Token<Word>>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().copied().is_some_and(is_blank) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let word = tokenize_word(&mut chars)?;
        tokens.push(classify(word));
    }
    Ok(tokens)
}

fn classify(word: Word) -> Token<Word> {
    match word.as_bare() {
        Some("|") => Token::Pipe,
        Some(">") => Token::Redirect,
        Some("&") => Token::Background,
        Some("#") => Token::Comment,
        _ => Token::Word(word),
    }
}

fn tokenize_word(chars: &mut Peekable<Chars>) -> ShellResult<Word> {
    let mut word = Word::new();

    while let Some(&c) = chars.peek() {
        match c {
            c if is_blank(c) => break,
            '\'' | '"' => tokenize_quoted_string(chars, &mut word)?,
            '\\' => {
                chars.next(); // consume backslash
                match chars.next() {
                    // escaped text is literal: no operators, no expansion
                    Some(escaped) => word.add_part(WordPart::SingleQuoted(escaped.to_string())),
                    None => word.push_char('\\'),
                }
            }
            _ => {
                word.push_char(c);
                chars.next();
            }
        }
    }
    Ok(word)
}

fn tokenize_quoted_string(chars: &mut Peekable<Chars>, word: &mut Word) -> ShellResult<()> {
    let quote_char = chars.next().unwrap_or('"');
    let mut quoted_string = String::new();

    loop {
        match chars.next() {
            Some(c) if c == quote_char => break,
            Some('\\') if quote_char == '"' => match chars.peek() {
                Some(&next @ ('"' | '\\')) => {
                    quoted_string.push(next);
                    chars.next();
                }
                Some('$') => {
                    chars.next();
                    if !quoted_string.is_empty() {
                        word.add_part(WordPart::DoubleQuoted(std::mem::take(&mut quoted_string)));
                    }
                    word.add_part(WordPart::SingleQuoted("$".into()));
                }
                _ => quoted_string.push('\\'),
            },
            Some(c) => quoted_string.push(c),
            None => {
                return Err(ShellError::syntax(format!(
                    "unterminated {quote_char} quote"
                )))
            }
        }
    }

    if quote_char == '\'' {
        word.add_part(WordPart::SingleQuoted(quoted_string));
    } else {
        word.add_part(WordPart::DoubleQuoted(quoted_string));
    }
    Ok(())
}
