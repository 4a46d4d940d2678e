use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted key or bare value
    Word(String),
    /// Quoted string (content without quotes, escapes resolved)
    Str(String),
    LParen,
    RParen,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

/// Characters allowed in an unquoted word.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

pub fn lex(src: &str, source_name: &str) -> Result<Vec<Spanned>, ConfigError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment
        if c == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            pos += 1;
            continue;
        }

        let tok_line = line;

        // String literal: the quote character is escaped by doubling it,
        // %n is a newline and %% a literal percent sign.
        if c == '\'' || c == '"' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(ConfigError::syntax(
                        source_name,
                        tok_line,
                        "unterminated string literal",
                    ));
                }
                let sc = chars[pos];
                if sc == quote {
                    if pos + 1 < chars.len() && chars[pos + 1] == quote {
                        s.push(quote);
                        pos += 2;
                        continue;
                    }
                    pos += 1;
                    break;
                }
                if sc == '%' && pos + 1 < chars.len() {
                    match chars[pos + 1] {
                        'n' => {
                            s.push('\n');
                            pos += 2;
                            continue;
                        }
                        '%' => {
                            s.push('%');
                            pos += 2;
                            continue;
                        }
                        _ => {}
                    }
                }
                if sc == '\n' {
                    line += 1;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
            });
            continue;
        }

        match c {
            '(' => {
                tokens.push(Spanned {
                    token: Token::LParen,
                    line: tok_line,
                });
                pos += 1;
                continue;
            }
            ')' => {
                tokens.push(Spanned {
                    token: Token::RParen,
                    line: tok_line,
                });
                pos += 1;
                continue;
            }
            _ => {}
        }

        if is_word_char(c) {
            let start = pos;
            while pos < chars.len() && is_word_char(chars[pos]) {
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Word(chars[start..pos].iter().collect()),
                line: tok_line,
            });
            continue;
        }

        return Err(ConfigError::syntax(
            source_name,
            tok_line,
            format!("unexpected character '{}'", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}
