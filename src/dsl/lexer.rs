use crate::dsl::DslError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Network,
    Input,
    Conv2d,
    MaxPool2d,
    Flatten,
    Dense,
    Output,
    Train,

    // Literals
    Number(u64),
    Ident(String),

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Equals,
    Colon,

    Eof,
}

impl TokenKind {
    /// Text used when a token is quoted in an error message
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Network   => "'network'".into(),
            TokenKind::Input     => "'input'".into(),
            TokenKind::Conv2d    => "'conv2d'".into(),
            TokenKind::MaxPool2d => "'maxpool2d'".into(),
            TokenKind::Flatten   => "'flatten'".into(),
            TokenKind::Dense     => "'dense'".into(),
            TokenKind::Output    => "'output'".into(),
            TokenKind::Train     => "'train'".into(),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Ident(s)  => format!("identifier '{s}'"),
            TokenKind::LBrace    => "'{'".into(),
            TokenKind::RBrace    => "'}'".into(),
            TokenKind::LParen    => "'('".into(),
            TokenKind::RParen    => "')'".into(),
            TokenKind::Comma     => "','".into(),
            TokenKind::Equals    => "'='".into(),
            TokenKind::Colon     => "':'".into(),
            TokenKind::Eof       => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind:   TokenKind,
    pub line:   usize,
    pub column: usize,
}

pub struct Lexer {
    input:    Vec<char>,
    position: usize,
    line:     usize,
    column:   usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
        Self {
            input: normalized.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input; the last token is always Eof.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, DslError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, DslError> {
        self.skip_whitespace_and_comments();

        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, line, column });
        };

        let kind = match c {
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            '=' => self.single(TokenKind::Equals),
            ':' => self.single(TokenKind::Colon),
            c if c.is_ascii_digit() => self.number(line, column)?,
            c if c.is_ascii_alphabetic() => self.word(),
            other => {
                return Err(DslError::new(
                    format!("unexpected character '{other}'"),
                    line,
                    column,
                ))
            }
        };

        Ok(Token { kind, line, column })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn number(&mut self, line: usize, column: usize) -> Result<TokenKind, DslError> {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.advance();
        }
        text.parse::<u64>()
            .map(TokenKind::Number)
            .map_err(|_| DslError::new(format!("number '{text}' is out of range"), line, column))
    }

    fn word(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            text.push(c);
            self.advance();
        }
        match text.as_str() {
            "network"   => TokenKind::Network,
            "input"     => TokenKind::Input,
            "conv2d"    => TokenKind::Conv2d,
            "maxpool2d" => TokenKind::MaxPool2d,
            "flatten"   => TokenKind::Flatten,
            "dense"     => TokenKind::Dense,
            "output"    => TokenKind::Output,
            "train"     => TokenKind::Train,
            _ => TokenKind::Ident(text),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}
