/// Parser for the plain-text task files that configure the experiments.
///
/// A document is a sequence of sections; each section is a title followed by
/// `key: value1, value2` pairs:
///
/// ```text
/// van_der_pol
///   e: 0.1
///   h: 0.001
///   methods: RK4, AB4, BDF2
/// ```
///
/// Values are typed on the fly (integer, float, boolean, otherwise string). Lines starting
/// with `//`, `#`, `%` or `;` are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_string(&self) -> Option<&String> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// integers are accepted where a float is expected
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: a letter or underscore followed by letters, digits or underscores
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = parse_identifier(input)?;
    Ok((input.trim(), result))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\r' | '\n' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator = delimited(space0, tag(","), space0);
    separated_list0(separator, parse_value).parse(input)
}

fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon = delimited(space0, tag(":"), space0);
    let (input, result) = separated_pair(parse_identifier, colon, parse_value_list).parse(input)?;
    Ok((input.trim(), result))
}

fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, space0)).parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

fn parse_sections(input: &str) -> IResult<&str, DocumentMap> {
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    let (input, sections) = parser.parse(input)?;
    Ok((input, sections.into_iter().collect()))
}

/// Parses a whole document; trailing unparsed text is an error.
pub fn parse_document(input: &str) -> Result<DocumentMap, String> {
    let filtered = filter_comments(input);
    if filtered.trim().is_empty() {
        return Ok(DocumentMap::new());
    }
    match parse_sections(&filtered) {
        Ok((remaining, parsed)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "failed to parse entire document, remaining: '{}'",
                    remaining
                ));
            }
            Ok(parsed)
        }
        Err(e) => Err(format!("parsing error: {:?}", e)),
    }
}

pub fn parse_task_file(path: &Path) -> Result<DocumentMap, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read task file {}: {}", path.display(), e))?;
    parse_document(&text)
}

/// Typed lookups into one section. A missing key yields `Ok(None)`, a key with a value
/// of the wrong type yields an error.
pub trait SectionAccess {
    fn get_f64(&self, key: &str) -> Result<Option<f64>, String>;
    fn get_usize(&self, key: &str) -> Result<Option<usize>, String>;
    fn get_f64_list(&self, key: &str) -> Result<Option<Vec<f64>>, String>;
    fn get_usize_list(&self, key: &str) -> Result<Option<Vec<usize>>, String>;
    fn get_string_list(&self, key: &str) -> Option<Vec<String>>;
}

fn single<'a>(section: &'a SectionMap, key: &str) -> Result<Option<&'a Value>, String> {
    match section.get(key) {
        None => Ok(None),
        Some(values) if values.len() == 1 => Ok(Some(&values[0])),
        Some(values) => Err(format!("key '{}' expects one value, got {}", key, values.len())),
    }
}

fn to_usize(key: &str, value: &Value) -> Result<usize, String> {
    value
        .as_integer()
        .filter(|i| *i >= 0)
        .map(|i| i as usize)
        .ok_or_else(|| format!("key '{}' expects a non-negative integer, got '{}'", key, value))
}

fn to_f64(key: &str, value: &Value) -> Result<f64, String> {
    value
        .as_float()
        .ok_or_else(|| format!("key '{}' expects a number, got '{}'", key, value))
}

impl SectionAccess for SectionMap {
    fn get_f64(&self, key: &str) -> Result<Option<f64>, String> {
        single(self, key)?.map(|v| to_f64(key, v)).transpose()
    }

    fn get_usize(&self, key: &str) -> Result<Option<usize>, String> {
        single(self, key)?.map(|v| to_usize(key, v)).transpose()
    }

    fn get_f64_list(&self, key: &str) -> Result<Option<Vec<f64>>, String> {
        self.get(key)
            .map(|values| values.iter().map(|v| to_f64(key, v)).collect())
            .transpose()
    }

    fn get_usize_list(&self, key: &str) -> Result<Option<Vec<usize>>, String> {
        self.get(key)
            .map(|values| values.iter().map(|v| to_usize(key, v)).collect())
            .transpose()
    }

    fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
            .map(|values| values.iter().map(|v| v.to_string()).collect())
    }
}
