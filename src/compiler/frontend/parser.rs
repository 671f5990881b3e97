//! Line-oriented block parser: consumes the token stream produced by
//! [`super::lexer`] and produces an [`AstFile`].

use std::collections::HashMap;

use crate::compiler::frontend::ast::{
    AstFile, AstProperty, ComponentNode, ComponentPropertyDef, ElementNode, StyleNode, TopLevelNode,
};
use crate::compiler::frontend::lexer::{Lexer, Token, TokenKind};
use crate::core::constants::MAX_BLOCK_DEPTH;
use crate::error::{CompilerError, Result};

pub fn parse(file: &str, source: &str) -> Result<AstFile> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser {
        tokens,
        pos: 0,
        file: file.to_string(),
        block_stack: Vec::new(),
    };
    parser.parse_file()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
    /// (opener description, line) stack, used to name the outermost
    /// unclosed block in `UnclosedBlock` diagnostics.
    block_stack: Vec<(String, usize)>,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn expect_lbrace(&mut self, opener: &str) -> Result<()> {
        match self.peek_kind() {
            TokenKind::LBrace => {
                let line = self.line();
                self.advance();
                self.block_stack.push((opener.to_string(), line));
                if self.block_stack.len() > MAX_BLOCK_DEPTH {
                    return Err(CompilerError::limit(
                        "block nesting depth",
                        MAX_BLOCK_DEPTH,
                        self.block_stack.len(),
                    ));
                }
                Ok(())
            }
            _ => Err(CompilerError::syntax(
                &self.file,
                self.line(),
                format!("expected '{{' after {opener}"),
            )),
        }
    }

    fn expect_rbrace(&mut self) -> Result<()> {
        match self.peek_kind() {
            TokenKind::RBrace => {
                self.advance();
                self.block_stack.pop();
                Ok(())
            }
            TokenKind::Eof => Err(self.unclosed_block_error()),
            _ => Err(CompilerError::syntax(
                &self.file,
                self.line(),
                "expected '}'",
            )),
        }
    }

    /// Names the *outermost* still-open block (spec.md §4.3: "identifying
    /// the outermost unclosed opener"), not the innermost one EOF happened
    /// to interrupt.
    fn unclosed_block_error(&self) -> CompilerError {
        let (opener, line) = self
            .block_stack
            .first()
            .cloned()
            .unwrap_or(("<unknown>".to_string(), 0));
        CompilerError::syntax(&self.file, line, format!("unclosed block opened by '{opener}'"))
    }

    fn parse_file(&mut self) -> Result<AstFile> {
        let mut file = AstFile::default();
        while !self.at_eof() {
            let node = self.parse_top_level_item()?;
            file.nodes.push(node);
        }
        if !self.block_stack.is_empty() {
            return Err(self.unclosed_block_error());
        }
        Ok(file)
    }

    fn parse_top_level_item(&mut self) -> Result<TopLevelNode> {
        let line = self.line();
        match self.peek_kind().clone() {
            TokenKind::Ident(word) if word == "style" => {
                self.advance();
                Ok(TopLevelNode::Style(self.parse_style_block(line)?))
            }
            TokenKind::Ident(word) if word == "Define" => {
                self.advance();
                Ok(TopLevelNode::Component(self.parse_define_block(line)?))
            }
            TokenKind::Ident(word) => {
                self.advance();
                Ok(TopLevelNode::Element(self.parse_element_body(word, line)?))
            }
            other => Err(CompilerError::syntax(
                &self.file,
                line,
                format!("unexpected token at top level: {other:?}"),
            )),
        }
    }

    fn parse_style_block(&mut self, line: usize) -> Result<StyleNode> {
        let name = self.expect_string("style name")?;
        self.expect_lbrace("style")?;

        let mut extends = Vec::new();
        let mut properties = Vec::new();
        let mut first = true;
        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            if self.at_eof() {
                return Err(self.unclosed_block_error());
            }
            let prop_line = self.line();
            let key = self.expect_ident("property name")?;
            if key == "extends" {
                if !first {
                    log::warn!("{}:{}: 'extends' should be the first property in a style", self.file, prop_line);
                }
                self.expect_colon()?;
                extends = self.parse_extends_value(prop_line)?;
            } else if key == "padding" || key == "margin" {
                let mut expanded = self.parse_property_or_edge_block(&key, prop_line)?;
                properties.append(&mut expanded);
            } else {
                let prop = self.parse_simple_property(key, prop_line)?;
                properties.push(prop);
            }
            first = false;
        }
        self.expect_rbrace()?;

        Ok(StyleNode { name, extends, properties, line })
    }

    fn parse_extends_value(&mut self, line: usize) -> Result<Vec<String>> {
        match self.peek_kind().clone() {
            TokenKind::Str(s) => {
                self.advance();
                self.consume_optional_semicolon();
                Ok(vec![s])
            }
            TokenKind::LBracket => {
                self.advance();
                let mut names = Vec::new();
                while !matches!(self.peek_kind(), TokenKind::RBracket) {
                    match self.peek_kind().clone() {
                        TokenKind::Str(s) => {
                            self.advance();
                            names.push(s);
                        }
                        TokenKind::Comma => {
                            self.advance();
                        }
                        _ => {
                            return Err(CompilerError::syntax(
                                &self.file,
                                self.line(),
                                "expected quoted style name in 'extends' list",
                            ))
                        }
                    }
                }
                self.advance(); // RBracket
                self.consume_optional_semicolon();
                Ok(names)
            }
            _ => Err(CompilerError::syntax(
                &self.file,
                line,
                "'extends' must be a quoted string or a bracketed list of quoted strings",
            )),
        }
    }

    fn parse_define_block(&mut self, line: usize) -> Result<ComponentNode> {
        let name = self.expect_ident("component name")?;
        self.expect_lbrace("Define")?;

        let mut property_defs = Vec::new();
        let mut template: Option<ElementNode> = None;

        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            if self.at_eof() {
                return Err(self.unclosed_block_error());
            }
            let item_line = self.line();
            match self.peek_kind().clone() {
                TokenKind::Ident(word) if word == "Properties" => {
                    if template.is_some() {
                        return Err(CompilerError::semantic(
                            &self.file,
                            item_line,
                            "'Properties' block must appear before the template root",
                        ));
                    }
                    self.advance();
                    property_defs = self.parse_properties_block()?;
                }
                TokenKind::Ident(word) => {
                    self.advance();
                    if template.is_some() {
                        return Err(CompilerError::semantic(
                            &self.file,
                            item_line,
                            "a 'Define' block may only have one template root",
                        ));
                    }
                    template = Some(self.parse_element_body(word, item_line)?);
                }
                other => {
                    return Err(CompilerError::syntax(
                        &self.file,
                        item_line,
                        format!("unexpected token inside Define: {other:?}"),
                    ))
                }
            }
        }
        self.expect_rbrace()?;

        let template = template.ok_or_else(|| {
            CompilerError::semantic(&self.file, line, format!("component '{name}' has no template root"))
        })?;

        Ok(ComponentNode { name, property_defs, template, line })
    }

    fn parse_properties_block(&mut self) -> Result<Vec<ComponentPropertyDef>> {
        self.expect_lbrace("Properties")?;
        let mut defs = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            if self.at_eof() {
                return Err(self.unclosed_block_error());
            }
            let line = self.line();
            let name = self.expect_ident("property definition name")?;
            self.expect_colon()?;
            let type_name = self.expect_ident("property type")?;
            let property_type = if matches!(self.peek_kind(), TokenKind::LParen) {
                self.advance();
                let mut variants = Vec::new();
                while !matches!(self.peek_kind(), TokenKind::RParen) {
                    match self.peek_kind().clone() {
                        TokenKind::Ident(v) => {
                            self.advance();
                            variants.push(v);
                        }
                        TokenKind::Comma => {
                            self.advance();
                        }
                        _ => {
                            return Err(CompilerError::syntax(
                                &self.file,
                                self.line(),
                                "expected enum variant list",
                            ))
                        }
                    }
                }
                self.advance(); // RParen
                format!("{type_name}({})", variants.join(","))
            } else {
                type_name
            };

            let default_value = if matches!(self.peek_kind(), TokenKind::Equals) {
                self.advance();
                Some(self.read_inline_value(line)?)
            } else {
                None
            };
            self.consume_optional_semicolon();
            defs.push(ComponentPropertyDef { name, property_type, default_value, line });
        }
        self.expect_rbrace()?;
        Ok(defs)
    }

    /// Parses the body (after the opening brace) of an `Element { ... }`
    /// / `Component { ... }` block: a mix of `key: value` property lines
    /// and nested child element blocks, in any order.
    fn parse_element_body(&mut self, type_name: String, line: usize) -> Result<ElementNode> {
        self.expect_lbrace(&type_name)?;

        let mut properties = Vec::new();
        let mut children = Vec::new();

        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            if self.at_eof() {
                return Err(self.unclosed_block_error());
            }
            let item_line = self.line();
            let word = self.expect_ident("property name or child element")?;
            match self.peek_kind() {
                TokenKind::LBrace => {
                    children.push(self.parse_element_body(word, item_line)?);
                }
                TokenKind::Colon => {
                    if word == "padding" || word == "margin" {
                        let mut expanded = self.parse_property_or_edge_block(&word, item_line)?;
                        properties.append(&mut expanded);
                    } else {
                        let prop = self.parse_simple_property(word, item_line)?;
                        properties.push(prop);
                    }
                }
                other => {
                    return Err(CompilerError::syntax(
                        &self.file,
                        item_line,
                        format!("expected ':' or '{{' after '{word}', found {other:?}"),
                    ))
                }
            }
        }
        self.expect_rbrace()?;

        Ok(ElementNode { type_name, properties, children, line })
    }

    /// `key` has already been consumed; the colon has not.
    fn parse_simple_property(&mut self, key: String, line: usize) -> Result<AstProperty> {
        self.expect_colon()?;
        let value = self.read_inline_value(line)?;
        self.consume_optional_semicolon();
        Ok(AstProperty { key, value, line })
    }

    /// Handles `padding: value;` (plain shorthand) as well as
    /// `padding: { top: 1; right: 2; ... }` (edge-inset block), expanding
    /// either into up to four `{key}_{side}` properties.
    fn parse_property_or_edge_block(&mut self, key: &str, line: usize) -> Result<Vec<AstProperty>> {
        self.expect_colon()?;
        if matches!(self.peek_kind(), TokenKind::LBrace) {
            self.advance();
            self.block_stack.push((format!("{key}:"), line));
            let mut sides: HashMap<&'static str, String> = HashMap::new();
            while !matches!(self.peek_kind(), TokenKind::RBrace) {
                if self.at_eof() {
                    return Err(self.unclosed_block_error());
                }
                let side_line = self.line();
                let side = self.expect_ident("edge-inset side name")?;
                self.expect_colon()?;
                let value = self.read_inline_value(side_line)?;
                self.consume_optional_semicolon();
                match side.as_str() {
                    "all" => {
                        sides.insert("top", value.clone());
                        sides.insert("right", value.clone());
                        sides.insert("bottom", value.clone());
                        sides.insert("left", value);
                    }
                    "horizontal" => {
                        sides.insert("left", value.clone());
                        sides.insert("right", value);
                    }
                    "vertical" => {
                        sides.insert("top", value.clone());
                        sides.insert("bottom", value);
                    }
                    "top" => {
                        sides.insert("top", value);
                    }
                    "right" => {
                        sides.insert("right", value);
                    }
                    "bottom" => {
                        sides.insert("bottom", value);
                    }
                    "left" => {
                        sides.insert("left", value);
                    }
                    other => {
                        log::warn!("{}:{}: unknown edge-inset key '{}'", self.file, side_line, other);
                    }
                }
            }
            self.expect_rbrace()?;
            let mut out = Vec::new();
            for side in ["top", "right", "bottom", "left"] {
                if let Some(v) = sides.get(side) {
                    out.push(AstProperty {
                        key: format!("{key}_{side}"),
                        value: v.clone(),
                        line,
                    });
                }
            }
            Ok(out)
        } else {
            let value = self.read_inline_value(line)?;
            self.consume_optional_semicolon();
            Ok(vec![AstProperty { key: key.to_string(), value, line }])
        }
    }

    /// Reads a value token run: stops at `;`, at the closing `}` of the
    /// enclosing block, or when the next token starts a new line (the
    /// line-oriented convention spec.md describes) unless we're inside a
    /// `[ ... ]` array, which may span lines.
    fn read_inline_value(&mut self, start_line: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.peek_kind().clone() {
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => break,
                TokenKind::LBracket => {
                    out.push('[');
                    self.advance();
                    let mut first = true;
                    while !matches!(self.peek_kind(), TokenKind::RBracket) {
                        if !first {
                            out.push_str(", ");
                        }
                        first = false;
                        match self.peek_kind().clone() {
                            TokenKind::Str(s) => {
                                out.push('"');
                                out.push_str(&s);
                                out.push('"');
                                self.advance();
                            }
                            TokenKind::Ident(s) => {
                                out.push_str(&s);
                                self.advance();
                            }
                            TokenKind::Comma => {
                                self.advance();
                            }
                            _ => {
                                return Err(CompilerError::syntax(
                                    &self.file,
                                    self.line(),
                                    "malformed array literal",
                                ))
                            }
                        }
                    }
                    self.advance(); // RBracket
                    out.push(']');
                }
                TokenKind::Str(s) => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push('"');
                    out.push_str(&s);
                    out.push('"');
                    self.advance();
                }
                _ if self.line() != start_line => break,
                TokenKind::Ident(s) => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&s);
                    self.advance();
                }
                TokenKind::Comma => {
                    out.push(',');
                    self.advance();
                }
                TokenKind::Colon => {
                    out.push(':');
                    self.advance();
                }
                TokenKind::Equals => {
                    out.push('=');
                    self.advance();
                }
                TokenKind::LParen | TokenKind::RParen => {
                    self.advance();
                }
            }
        }
        if out.is_empty() {
            return Err(CompilerError::syntax(&self.file, start_line, "expected a value"));
        }
        Ok(out)
    }

    fn consume_optional_semicolon(&mut self) {
        if matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn expect_colon(&mut self) -> Result<()> {
        match self.peek_kind() {
            TokenKind::Colon => {
                self.advance();
                Ok(())
            }
            _ => Err(CompilerError::syntax(&self.file, self.line(), "expected ':'")),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(CompilerError::syntax(
                &self.file,
                self.line(),
                format!("expected {what}, found {other:?}"),
            )),
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String> {
        match self.peek_kind().clone() {
            TokenKind::Str(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(CompilerError::syntax(
                &self.file,
                self.line(),
                format!("expected quoted {what}, found {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_app() {
        let src = r#"App { window_title: "Hi" }"#;
        let file = parse("test.kry", src).unwrap();
        assert_eq!(file.nodes.len(), 1);
        match &file.nodes[0] {
            TopLevelNode::Element(el) => {
                assert_eq!(el.type_name, "App");
                assert_eq!(el.properties.len(), 1);
                assert_eq!(el.properties[0].key, "window_title");
                assert_eq!(el.properties[0].cleaned_value(), "Hi");
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn parses_style_with_extends_list() {
        let src = r#"style "c" { extends: ["a", "b"]; background_color: "#00FF00FF" }"#;
        let file = parse("test.kry", src).unwrap();
        match &file.nodes[0] {
            TopLevelNode::Style(s) => {
                assert_eq!(s.extends, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(s.properties.len(), 1);
            }
            _ => panic!("expected style"),
        }
    }

    #[test]
    fn parses_define_with_properties_and_template() {
        let src = r#"
            Define Card {
                Properties {
                    title: String = "untitled"
                }
                Container {
                    text: $title
                }
            }
        "#;
        let file = parse("test.kry", src).unwrap();
        match &file.nodes[0] {
            TopLevelNode::Component(c) => {
                assert_eq!(c.name, "Card");
                assert_eq!(c.property_defs.len(), 1);
                assert_eq!(c.property_defs[0].default_value.as_deref(), Some("\"untitled\""));
                assert_eq!(c.template.type_name, "Container");
            }
            _ => panic!("expected component"),
        }
    }

    #[test]
    fn unclosed_block_reports_outermost_opener() {
        let src = "App { Container {";
        let err = parse("test.kry", src).unwrap_err();
        assert!(format!("{err}").contains("App"));
    }

    #[test]
    fn padding_shorthand_block_expands_sides() {
        let src = "App { padding: { top: 1; horizontal: 2 } }";
        let file = parse("test.kry", src).unwrap();
        match &file.nodes[0] {
            TopLevelNode::Element(el) => {
                let keys: Vec<_> = el.properties.iter().map(|p| p.key.as_str()).collect();
                assert!(keys.contains(&"padding_top"));
                assert!(keys.contains(&"padding_left"));
                assert!(keys.contains(&"padding_right"));
            }
            _ => panic!("expected element"),
        }
    }
}
