// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Conversion of raw section values to their declared types.

use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::lazy_ref::LazyRef;
use crate::manager::ConfigManager;
use crate::types::{ConfigValue, TypeTag, Value};

#[cfg(test)]
#[path = "./convert_test.rs"]
mod convert_test;

/// Split on whitespace, honouring single and double quotes and backslash escapes.
pub fn str_to_list(input: &str) -> Result<Vec<String>> {
    let quote_error = || Error::new(ErrorKind::QuoteInterpretation(input.to_string()));
    let is_quote = |c: char| c == '\'' || c == '"';

    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let mut token = String::new();
        if is_quote(chars[i]) {
            let quote = chars[i];
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                token.push(*chars.get(i).ok_or_else(quote_error)?);
                i += 1;
            }
            if i >= chars.len() {
                return Err(quote_error());
            }
        } else {
            while i < chars.len() && !(chars[i].is_whitespace() || is_quote(chars[i])) {
                if chars[i] == '\\' {
                    i += 1;
                }
                token.push(*chars.get(i).ok_or_else(quote_error)?);
                i += 1;
            }
            if i < chars.len() && is_quote(chars[i]) {
                return Err(quote_error());
            }
        }
        tokens.push(token);
        i += 1;
    }
    Ok(tokens)
}

/// Trim whitespace and one pair of matching quotes, flattening newlines and tabs.
pub fn str_to_str(input: &str) -> String {
    let mut s = input.trim();
    let mut chars = s.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        if (first == '"' || first == '\'') && first == last {
            s = &s[1..s.len() - 1];
        }
    }
    s.replace(['\n', '\t'], " ")
}

pub fn str_to_bool(input: &str) -> Result<bool> {
    let s = str_to_str(input).to_lowercase();
    match s.as_str() {
        "no" | "false" | "0" => Ok(false),
        "yes" | "true" | "1" => Ok(true),
        _ => Err(Error::configuration(format!("{s:?} is not a boolean"))),
    }
}

pub fn str_to_int(input: &str) -> Result<i64> {
    let s = str_to_str(input);
    s.parse()
        .map_err(|_| Error::configuration(format!("{s:?} is not an integer")))
}

/// Conversion for sections whose values are all raw strings.
pub fn convert_string(manager: &ConfigManager, value: &str, ty: &TypeTag) -> Result<ConfigValue> {
    let converted = match ty {
        TypeTag::Str => ConfigValue::Str(str_to_str(value)),
        TypeTag::Bool => ConfigValue::Bool(str_to_bool(value)?),
        TypeTag::Int => ConfigValue::Int(str_to_int(value)?),
        TypeTag::List => ConfigValue::List(str_to_list(value)?),
        TypeTag::Callable => ConfigValue::Callable(manager.registry().resolve(value.trim())?),
        TypeTag::Ref(target) | TypeTag::LazyRef(target) => {
            ConfigValue::LazyRef(LazyRef::named(manager, target, str_to_str(value)))
        }
        TypeTag::Refs(target) | TypeTag::LazyRefs(target) => ConfigValue::LazyRefs(
            str_to_list(value)?
                .into_iter()
                .map(|name| LazyRef::named(manager, target, name))
                .collect(),
        ),
        TypeTag::Repr => {
            return Err(Error::configuration("repr is not a convertible type"));
        }
    };
    Ok(converted)
}

fn wrong_type(value: &Value, ty: &TypeTag) -> Error {
    Error::configuration(format!("{value:?} does not have type {:?}", ty.to_string()))
}

/// Conversion for values that are already typed.
pub fn convert_asis(manager: &ConfigManager, value: &Value, ty: &TypeTag) -> Result<ConfigValue> {
    let converted = match (ty, value) {
        (TypeTag::Str, Value::Str(s)) => ConfigValue::Str(s.clone()),
        (TypeTag::Bool, Value::Bool(b)) => ConfigValue::Bool(*b),
        (TypeTag::Int, Value::Int(i)) => ConfigValue::Int(*i),
        (TypeTag::List, Value::List(l)) => ConfigValue::List(l.clone()),
        (TypeTag::Callable, Value::Callable(c)) => ConfigValue::Callable(Rc::clone(c)),
        (TypeTag::Callable, other) => {
            return Err(Error::configuration(format!("{other:?} is not callable")));
        }
        (TypeTag::Ref(target) | TypeTag::LazyRef(target), Value::Ref(section)) => {
            ConfigValue::LazyRef(LazyRef::from_section_ref(manager, target, section.clone()))
        }
        (TypeTag::Ref(_) | TypeTag::LazyRef(_), other) => {
            return Err(Error::configuration(format!(
                "{other:?} is not a config section"
            )));
        }
        (TypeTag::Refs(target) | TypeTag::LazyRefs(target), Value::Refs(sections)) => {
            ConfigValue::LazyRefs(
                sections
                    .iter()
                    .map(|section| LazyRef::from_section_ref(manager, target, section.clone()))
                    .collect(),
            )
        }
        (TypeTag::Refs(_) | TypeTag::LazyRefs(_), other) => {
            return Err(Error::configuration(format!(
                "{other:?} is not a config section"
            )));
        }
        (_, other) => return Err(wrong_type(other, ty)),
    };
    Ok(converted)
}

/// String semantics for string values of non-`str` types, as-is otherwise.
pub fn convert_hybrid(manager: &ConfigManager, value: &Value, ty: &TypeTag) -> Result<ConfigValue> {
    match value {
        Value::Str(s) if *ty != TypeTag::Str => convert_string(manager, s, ty),
        _ => convert_asis(manager, value, ty),
    }
}

