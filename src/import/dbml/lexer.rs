use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// `'...'`, `"..."` or `'''...'''`
    Str(String),
    /// Backtick expression, kept verbatim without the backticks
    Expr(String),
    /// Numeric literal as written, sign included
    Num(String),

    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Colon,    // :
    Dot,      // .
    Lt,       // <
    Gt,       // >
    Minus,    // -
    LtGt,     // <>
    Newline,

    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Str(s) => format!("string '{}'", s),
            Token::Expr(s) => format!("expression `{}`", s),
            Token::Num(s) => format!("number {}", s),
            Token::Newline => "end of line".to_string(),
            Token::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }
}

/// A token and the 1-based position it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedChar { ch: char, line: usize, column: usize },
    #[error("Unterminated string starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Unterminated comment starting at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedChar { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::UnterminatedComment { line, column } => (*line, *column),
        }
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    /// Skip blanks and comments, stopping at a newline
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.chars.peek().copied() {
                Some('\n') => return Ok(()),
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.chars.peek() == Some(&'/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(LexError::UnterminatedComment { line, column }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_while(&mut self, first: char, keep: impl Fn(char) -> bool) -> String {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if keep(c) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn read_quoted(&mut self, quote: char, line: usize, column: usize) -> Result<String, LexError> {
        // '''multi-line'''
        if quote == '\'' && self.chars.peek() == Some(&'\'') && self.peek_second() == Some('\'') {
            self.bump();
            self.bump();
            let mut s = String::new();
            loop {
                match self.bump() {
                    Some('\'') if self.chars.peek() == Some(&'\'') && self.peek_second() == Some('\'') => {
                        self.bump();
                        self.bump();
                        return Ok(dedent(&s));
                    }
                    Some(c) => s.push(c),
                    None => return Err(LexError::UnterminatedString { line, column }),
                }
            }
        }

        let mut s = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(c) => s.push(c),
                    None => return Err(LexError::UnterminatedString { line, column }),
                },
                Some('\n') | None => return Err(LexError::UnterminatedString { line, column }),
                Some(c) => s.push(c),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);

        let c = match self.bump() {
            Some(c) => c,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    line,
                    column,
                });
            }
        };

        let token = match c {
            '\n' => Token::Newline,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '.' => Token::Dot,
            '>' => Token::Gt,
            '<' if self.chars.peek() == Some(&'>') => {
                self.bump();
                Token::LtGt
            }
            '<' => Token::Lt,
            '-' if self.chars.peek().is_some_and(|c| c.is_ascii_digit()) => {
                Token::Num(self.read_while('-', |c| c.is_ascii_digit() || c == '.'))
            }
            '-' => Token::Minus,
            '"' | '\'' => Token::Str(self.read_quoted(c, line, column)?),
            '`' => {
                let mut s = String::new();
                loop {
                    match self.bump() {
                        Some('`') => break,
                        Some(c) => s.push(c),
                        None => return Err(LexError::UnterminatedString { line, column }),
                    }
                }
                Token::Expr(s)
            }
            '#' => Token::Ident(self.read_while('#', |c| c.is_ascii_alphanumeric())),
            c if c.is_ascii_digit() => Token::Num(self.read_while(c, |c| c.is_ascii_digit() || c == '.')),
            c if c.is_alphanumeric() || c == '_' => Token::Ident(self.read_while(c, |c| c.is_alphanumeric() || c == '_')),
            ch => return Err(LexError::UnexpectedChar { ch, line, column }),
        };

        Ok(Spanned { token, line, column })
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Strip the common indentation of a triple-quoted string and its blank edges
fn dedent(s: &str) -> String {
    let lines: Vec<&str> = s.lines().collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| strip_indent(l, indent))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Drop up to `indent` leading whitespace chars
fn strip_indent(line: &str, indent: usize) -> &str {
    let mut rest = line;
    for _ in 0..indent {
        match rest.chars().next() {
            Some(c) if c.is_whitespace() => rest = &rest[c.len_utf8()..],
            _ => break,
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_table_header() {
        assert_eq!(
            tokens("Table users [headercolor: #3498DB] {"),
            vec![
                Token::Ident("Table".into()),
                Token::Ident("users".into()),
                Token::LBracket,
                Token::Ident("headercolor".into()),
                Token::Colon,
                Token::Ident("#3498DB".into()),
                Token::RBracket,
                Token::LBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_ref_operators() {
        assert_eq!(
            tokens("a <> b < c > d - e"),
            vec![
                Token::Ident("a".into()),
                Token::LtGt,
                Token::Ident("b".into()),
                Token::Lt,
                Token::Ident("c".into()),
                Token::Gt,
                Token::Ident("d".into()),
                Token::Minus,
                Token::Ident("e".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        assert_eq!(
            tokens("id int // the key\n/* block\ncomment */ name"),
            vec![
                Token::Ident("id".into()),
                Token::Ident("int".into()),
                Token::Newline,
                Token::Ident("name".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            tokens("default: -1.5 note: 'it\\'s' `now()`"),
            vec![
                Token::Ident("default".into()),
                Token::Colon,
                Token::Num("-1.5".into()),
                Token::Ident("note".into()),
                Token::Colon,
                Token::Str("it's".into()),
                Token::Expr("now()".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_triple_quoted_string() {
        let toks = tokens("Note: '''\n    First line\n    Second line\n'''");
        assert_eq!(toks[2], Token::Str("First line\nSecond line".into()));
    }

    #[test]
    fn test_triple_quoted_string_with_wide_whitespace() {
        let toks = tokens("Note: '''\n  a\n\u{3000}\n  b\n  '''");
        assert_eq!(toks[2], Token::Str("a\n\nb".into()));

        let toks = tokens("Note: '''\n\u{3000}\u{3000}x\n\u{3000}y\n'''");
        assert_eq!(toks[2], Token::Str("\u{3000}x\ny".into()));
    }

    #[test]
    fn test_comment_after_whitespace() {
        assert_eq!(
            tokens("a \u{a0}// note\nb"),
            vec![
                Token::Ident("a".into()),
                Token::Newline,
                Token::Ident("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_and_errors() {
        let spanned = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!((spanned[2].line, spanned[2].column), (2, 3));

        let err = Lexer::new("x 'open").tokenize().unwrap_err();
        assert_eq!(err.position(), (1, 3));
        assert!(matches!(Lexer::new("a ? b").tokenize(), Err(LexError::UnexpectedChar { ch: '?', .. })));
    }
}
