// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Shared tokenizer and section type for the dhcpd-style and mke2fs-style
//! formats, whose values are sequences of words and nested blocks.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::convert::convert_string;
use crate::error::{Error, ErrorContext, Result};
use crate::lazy_ref::LazyRef;
use crate::manager::ConfigManager;
use crate::section::{
    merge_repr, strip_part_suffix, Parts, Rendered, Section, APPEND_SUFFIX, PREPEND_SUFFIX,
};
use crate::types::{ConfigValue, SectionRef, TypeTag, Value};

#[cfg(test)]
#[path = "./tokens_test.rs"]
mod tokens_test;

/// One value item: a bare or quoted word, or a nested block.
#[derive(Debug, Clone)]
pub enum Token {
    Word(String),
    Block(Rc<TokenSection>),
}

/// A section whose values are token sequences.
#[derive(Debug, Clone, Default)]
pub struct TokenSection {
    values: IndexMap<String, Vec<Token>>,
}

impl TokenSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[Token]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub(crate) fn insert(&mut self, key: String, tokens: Vec<Token>) -> bool {
        self.values.insert(key, tokens).is_none()
    }

    fn single<'a>(tokens: &'a [Token], key: &str) -> Result<&'a Token> {
        match tokens {
            [token] => Ok(token),
            _ => Err(Error::configuration(format!(
                "{key:?}: only one argument required, got {}",
                tokens.len()
            ))),
        }
    }

    fn single_word<'a>(tokens: &'a [Token], key: &str) -> Result<&'a str> {
        match Self::single(tokens, key)? {
            Token::Word(word) => Ok(word),
            Token::Block(_) => Err(Error::configuration(format!(
                "{key:?}: need a string, not a section"
            ))),
        }
    }

    fn reference(manager: &ConfigManager, typename: &str, token: &Token) -> LazyRef {
        match token {
            Token::Word(name) => LazyRef::named(manager, typename, name.as_str()),
            Token::Block(block) => {
                LazyRef::anonymous(manager, typename, Rc::clone(block) as Rc<dyn Section>)
            }
        }
    }

    fn render_tokens(
        &self,
        manager: &ConfigManager,
        key: &str,
        tokens: &[Token],
        ty: &TypeTag,
    ) -> Result<ConfigValue> {
        match ty {
            TypeTag::Ref(target) | TypeTag::LazyRef(target) => Ok(ConfigValue::LazyRef(
                Self::reference(manager, target, Self::single(tokens, key)?),
            )),
            TypeTag::Refs(target) | TypeTag::LazyRefs(target) => Ok(ConfigValue::LazyRefs(
                tokens
                    .iter()
                    .map(|token| Self::reference(manager, target, token))
                    .collect(),
            )),
            TypeTag::List => {
                let mut words = Vec::with_capacity(tokens.len());
                for token in tokens {
                    match token {
                        Token::Word(word) => words.push(word.clone()),
                        Token::Block(_) => {
                            return Err(Error::configuration(format!(
                                "{key:?}: need a string, not a section"
                            )));
                        }
                    }
                }
                Ok(ConfigValue::List(words))
            }
            TypeTag::Str => Ok(ConfigValue::Str(Self::single_word(tokens, key)?.to_string())),
            _ => convert_string(manager, Self::single_word(tokens, key)?, ty),
        }
    }

    fn repr_of(tokens: &[Token]) -> Value {
        let as_ref = |token: &Token| match token {
            Token::Word(name) => SectionRef::Named(name.clone()),
            Token::Block(block) => SectionRef::Inline(Rc::clone(block) as Rc<dyn Section>),
        };
        match tokens {
            [Token::Word(word)] => Value::Str(word.clone()),
            [block @ Token::Block(_)] => Value::Ref(as_ref(block)),
            _ if tokens.iter().all(|t| matches!(t, Token::Word(_))) => Value::List(
                tokens
                    .iter()
                    .filter_map(|t| match t {
                        Token::Word(w) => Some(w.clone()),
                        Token::Block(_) => None,
                    })
                    .collect(),
            ),
            _ => Value::Refs(tokens.iter().map(as_ref).collect()),
        }
    }
}

impl Section for TokenSection {
    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
            || self.values.contains_key(&format!("{key}{PREPEND_SUFFIX}"))
            || self.values.contains_key(&format!("{key}{APPEND_SUFFIX}"))
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.values.keys() {
            let base = strip_part_suffix(key);
            if !keys.iter().any(|k| k == base) {
                keys.push(base.to_string());
            }
        }
        keys
    }

    fn render_value(&self, manager: &ConfigManager, key: &str, ty: &TypeTag) -> Result<Rendered> {
        let not_found = || Error::configuration(format!("{key:?} not found"));
        if !ty.is_incremental() && *ty != TypeTag::Repr {
            let tokens = self.values.get(key).ok_or_else(not_found)?;
            return self
                .render_tokens(manager, key, tokens, ty)
                .with_context(|| format!("Converting argument {key:?} to {ty}"))
                .map(Rendered::Value);
        }

        let prepend_key = format!("{key}{PREPEND_SUFFIX}");
        let append_key = format!("{key}{APPEND_SUFFIX}");
        let raw = Parts {
            prepend: self.values.get(&prepend_key).map(|t| (prepend_key.as_str(), t)),
            base: self.values.get(key).map(|t| (key, t)),
            append: self.values.get(&append_key).map(|t| (append_key.as_str(), t)),
        };
        if raw.is_empty() {
            return Err(not_found());
        }
        if *ty == TypeTag::Repr {
            let parts = raw.map(|(_, tokens)| Ok(Self::repr_of(tokens)))?;
            return Ok(Rendered::Repr(merge_repr(parts)));
        }
        let parts = raw.map(|(name, tokens)| {
            self.render_tokens(manager, name, tokens, ty)
                .with_context(|| format!("Converting argument {name:?} to {ty}"))
        })?;
        Ok(Rendered::Parts(parts))
    }
}

/// Which of the two block grammars is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// `name { key value...; }`
    Dhcp,
    /// `[name]` followed by `key = value...` lines
    Mke2fs,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Word(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Equals,
    Newline,
}

fn describe(tok: Option<&Tok>) -> String {
    match tok {
        None => "end of input".to_string(),
        Some(Tok::Word(w)) => format!("{w:?}"),
        Some(Tok::LBrace) => "'{'".to_string(),
        Some(Tok::RBrace) => "'}'".to_string(),
        Some(Tok::LBracket) => "'['".to_string(),
        Some(Tok::RBracket) => "']'".to_string(),
        Some(Tok::Semicolon) => "';'".to_string(),
        Some(Tok::Equals) => "'='".to_string(),
        Some(Tok::Newline) => "end of line".to_string(),
    }
}

fn tokenize(text: &str, origin: &str, dialect: Dialect) -> Result<Vec<(Tok, usize)>> {
    let is_special = |c: char| match c {
        '{' | '}' | ';' | '#' | '"' | '\'' => true,
        '=' | '[' | ']' => dialect == Dialect::Mke2fs,
        _ => false,
    };

    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                tokens.push((Tok::Newline, line));
                line += 1;
            }
            c if c.is_whitespace() => {}
            '#' => {
                while chars.peek().is_some_and(|c| *c != '\n') {
                    chars.next();
                }
            }
            '{' => tokens.push((Tok::LBrace, line)),
            '}' => tokens.push((Tok::RBrace, line)),
            ';' => tokens.push((Tok::Semicolon, line)),
            '=' if dialect == Dialect::Mke2fs => tokens.push((Tok::Equals, line)),
            '[' if dialect == Dialect::Mke2fs => tokens.push((Tok::LBracket, line)),
            ']' if dialect == Dialect::Mke2fs => tokens.push((Tok::RBracket, line)),
            '"' | '\'' => {
                let start = line;
                let mut word = String::new();
                loop {
                    match chars.next() {
                        None => {
                            return Err(Error::parsing(
                                origin,
                                Some(start),
                                "unterminated quoted string",
                            ));
                        }
                        Some(q) if q == c => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => {
                                if escaped == '\n' {
                                    line += 1;
                                }
                                word.push(escaped);
                            }
                            None => {
                                return Err(Error::parsing(
                                    origin,
                                    Some(start),
                                    "unterminated quoted string",
                                ));
                            }
                        },
                        Some(other) => {
                            if other == '\n' {
                                line += 1;
                            }
                            word.push(other);
                        }
                    }
                }
                tokens.push((Tok::Word(word), start));
            }
            c => {
                let mut word = String::from(c);
                while let Some(next) = chars.peek() {
                    if next.is_whitespace() || is_special(*next) {
                        break;
                    }
                    word.push(*next);
                    chars.next();
                }
                tokens.push((Tok::Word(word), line));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    origin: &'a str,
    dialect: Dialect,
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn line(&self) -> Option<usize> {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(tok, _)| tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parsing(self.origin, self.line(), message)
    }

    fn unexpected(&self, expected: &str) -> Error {
        self.error(format!("expected {expected}, got {}", describe(self.peek())))
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Tok::Newline) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, tok: Tok, expected: &str) -> Result<()> {
        if self.peek() == Some(&tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn word(&mut self, expected: &str) -> Result<String> {
        match self.peek() {
            Some(Tok::Word(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn sections(&mut self) -> Result<IndexMap<String, TokenSection>> {
        let mut sections = IndexMap::new();
        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }
            let line = self.line();
            let (name, section) = match self.dialect {
                Dialect::Dhcp => {
                    let name = self.word("a section name")?;
                    self.skip_newlines();
                    self.expect(Tok::LBrace, "'{'")?;
                    (name, self.dhcp_block()?)
                }
                Dialect::Mke2fs => {
                    self.expect(Tok::LBracket, "'['")?;
                    let name = self.word("a section name")?;
                    self.expect(Tok::RBracket, "']'")?;
                    (name, self.mke2fs_entries(false)?)
                }
            };
            if sections.contains_key(&name) {
                return Err(Error::parsing(
                    self.origin,
                    line,
                    format!("section {name:?} already exists"),
                ));
            }
            sections.insert(name, section);
        }
        Ok(sections)
    }

    fn add_entry(&self, section: &mut TokenSection, key: String, values: Vec<Token>) -> Result<()> {
        if values.is_empty() {
            return Err(self.error(format!("{key:?} has no value")));
        }
        if !section.insert(key.clone(), values) {
            return Err(self.error(format!("option {key:?} already exists")));
        }
        Ok(())
    }

    /// Entries up to and including the closing brace.
    fn dhcp_block(&mut self) -> Result<TokenSection> {
        let mut section = TokenSection::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Some(Tok::RBrace) => {
                    self.pos += 1;
                    return Ok(section);
                }
                None => return Err(self.error("unterminated block")),
                _ => {}
            }
            let key = self.word("a key")?;
            let mut values = Vec::new();
            loop {
                match self.peek() {
                    Some(Tok::Word(_)) => {
                        if let Some(Tok::Word(word)) = self.next() {
                            values.push(Token::Word(word));
                        }
                    }
                    Some(Tok::LBrace) => {
                        self.pos += 1;
                        values.push(Token::Block(Rc::new(self.dhcp_block()?)));
                    }
                    Some(Tok::Semicolon) => {
                        self.pos += 1;
                        break;
                    }
                    Some(Tok::Newline) if !values.is_empty() => break,
                    Some(Tok::Newline) => self.pos += 1,
                    Some(Tok::RBrace) if !values.is_empty() => break,
                    _ => return Err(self.unexpected("a value or ';'")),
                }
            }
            self.add_entry(&mut section, key, values)?;
        }
    }

    /// `key = value...` lines, ending at a closing brace when nested or at
    /// the next header otherwise.
    fn mke2fs_entries(&mut self, nested: bool) -> Result<TokenSection> {
        let mut section = TokenSection::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Some(Tok::RBrace) if nested => {
                    self.pos += 1;
                    return Ok(section);
                }
                None if nested => return Err(self.error("unterminated block")),
                None | Some(Tok::LBracket) if !nested => return Ok(section),
                _ => {}
            }
            let key = self.word("a key")?;
            self.expect(Tok::Equals, "'='")?;
            let mut values = Vec::new();
            loop {
                match self.peek() {
                    Some(Tok::Word(_)) => {
                        if let Some(Tok::Word(word)) = self.next() {
                            values.push(Token::Word(word));
                        }
                    }
                    Some(Tok::LBrace) => {
                        self.pos += 1;
                        values.push(Token::Block(Rc::new(self.mke2fs_entries(true)?)));
                    }
                    Some(Tok::Newline) | None => break,
                    Some(Tok::RBrace) if nested => break,
                    _ => return Err(self.unexpected("a value")),
                }
            }
            self.add_entry(&mut section, key, values)?;
        }
    }
}

/// Parse text of either block grammar into named sections.
pub(crate) fn parse_sections(
    text: &str,
    origin: &str,
    dialect: Dialect,
) -> Result<IndexMap<String, TokenSection>> {
    let tokens = tokenize(text, origin, dialect)?;
    Parser {
        origin,
        dialect,
        tokens,
        pos: 0,
    }
    .sections()
}

