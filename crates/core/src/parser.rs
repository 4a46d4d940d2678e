/// Parser for the configuration language.
///
/// The result of [`parse`] is a root node carrying the caller's name whose
/// children are the top-level items of the text.
use crate::error::ConfigError;
use crate::lexer::{lex, Spanned, Token};
use crate::node::ConfigNode;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    source_name: &'a str,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], source_name: &'a str) -> Self {
        Parser {
            tokens,
            pos: 0,
            source_name,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn err(&self, msg: impl Into<String>) -> ConfigError {
        ConfigError::syntax(self.source_name, self.cur().line, msg)
    }

    fn expect_rparen(&mut self) -> Result<(), ConfigError> {
        if self.peek() == &Token::RParen {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected ')', got {:?}", self.peek())))
        }
    }

    /// Items up to (not including) a closing paren or end of input.
    fn parse_list(&mut self, into: &mut ConfigNode) -> Result<(), ConfigError> {
        loop {
            match self.peek() {
                Token::RParen | Token::Eof => return Ok(()),
                _ => {
                    let item = self.parse_item()?;
                    into.children.push(item);
                }
            }
        }
    }

    fn parse_item(&mut self) -> Result<ConfigNode, ConfigError> {
        match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(ConfigNode::leaf(s))
            }
            Token::LParen => {
                self.advance();
                let mut anon = ConfigNode::new("");
                self.parse_list(&mut anon)?;
                self.expect_rparen()?;
                Ok(anon)
            }
            Token::Word(key) => {
                self.advance();
                match self.peek().clone() {
                    Token::Str(v) => {
                        self.advance();
                        Ok(ConfigNode::pair(key, v))
                    }
                    // A word opening its own section is a sibling, not our value.
                    Token::Word(_) if self.peek_at(1) == &Token::LParen => {
                        Ok(ConfigNode::leaf(key))
                    }
                    Token::Word(v) => {
                        self.advance();
                        Ok(ConfigNode::pair(key, v))
                    }
                    Token::LParen => {
                        self.advance();
                        let mut node = ConfigNode::new(key);
                        self.parse_list(&mut node)?;
                        self.expect_rparen()?;
                        Ok(node)
                    }
                    Token::RParen | Token::Eof => Ok(ConfigNode::leaf(key)),
                }
            }
            Token::RParen => Err(self.err("unbalanced ')'")),
            Token::Eof => Err(self.err("unexpected end of input")),
        }
    }

    fn parse_root(&mut self, name: &str) -> Result<ConfigNode, ConfigError> {
        let mut root = ConfigNode::new(name);
        self.parse_list(&mut root)?;
        if self.peek() != &Token::Eof {
            return Err(self.err("unbalanced ')'"));
        }
        Ok(root)
    }
}

/// Parse `src` into a node named `name`.
pub fn parse(name: &str, src: &str) -> Result<ConfigNode, ConfigError> {
    let tokens = lex(src, name)?;
    let mut p = Parser::new(&tokens, name);
    p.parse_root(name)
}

/// Parse `src`, which must contain exactly one top-level item, and return that item.
pub fn parse_single(name: &str, src: &str) -> Result<ConfigNode, ConfigError> {
    let tokens = lex(src, name)?;
    let mut p = Parser::new(&tokens, name);
    if p.peek_at(0) == &Token::Eof {
        return Err(p.err("empty input"));
    }
    let mut root = p.parse_root(name)?;
    if root.children.len() != 1 {
        return Err(ConfigError::syntax(
            name,
            1,
            format!("expected a single item, found {}", root.children.len()),
        ));
    }
    Ok(root.children.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_payload() {
        let root = parse("anchor", "WM(CMD 'insertFormValue' ID 'Nachname' TRAFO 'Gross')").unwrap();
        assert_eq!(root.count(), 1);
        let wm = &root.children[0];
        assert_eq!(wm.name, "WM");
        assert_eq!(wm.get("CMD").unwrap().value(), "insertFormValue");
        assert_eq!(wm.get("ID").unwrap().value(), "Nachname");
        assert_eq!(wm.get("TRAFO").unwrap().value(), "Gross");
    }

    #[test]
    fn nested_sections_and_anonymous_lists() {
        let root = parse(
            "conf",
            "Druckfunktionen((FUNCTION 'A') (FUNCTION 'B' ARG 'x'))",
        )
        .unwrap();
        let df = root.get("Druckfunktionen").unwrap();
        assert_eq!(df.count(), 2);
        assert_eq!(df.children[0].name, "");
        assert_eq!(df.children[1].get("ARG").unwrap().value(), "x");
    }

    #[test]
    fn bare_words_pair_and_trailing_word_is_leaf() {
        let root = parse("conf", "WM(CMD setType TYPE formDocument) end").unwrap();
        let sib = parse("conf", "A B(C 'x')").unwrap();
        assert!(sib.children[0].is_leaf());
        assert_eq!(sib.children[1].name, "B");
        let wm = root.get("WM").unwrap();
        assert_eq!(wm.get("CMD").unwrap().value(), "setType");
        assert_eq!(wm.get("TYPE").unwrap().value(), "formDocument");
        assert!(root.children[1].is_leaf());
        assert_eq!(root.children[1].name, "end");
    }

    #[test]
    fn string_values_inside_lists_are_leaves() {
        let root = parse("conf", "GROUPS('G1' 'G2')").unwrap();
        let groups: Vec<String> = root
            .get("GROUPS")
            .unwrap()
            .children
            .iter()
            .map(ConfigNode::value)
            .collect();
        assert_eq!(groups, vec!["G1", "G2"]);
    }

    #[test]
    fn unbalanced_parens_are_errors() {
        assert!(parse("conf", "A(B 'x'").is_err());
        assert!(parse("conf", "A 'x')").is_err());
    }

    #[test]
    fn parse_single_requires_one_item() {
        assert_eq!(parse_single("f", "CAT('a' 'b')").unwrap().name, "CAT");
        assert!(parse_single("f", "A 'x' B 'y'").is_err());
        assert!(parse_single("f", "   ").is_err());
    }
}
