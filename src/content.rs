use bstr::ByteSlice;

use crate::{
    error::Result,
    fold,
    parse::{self, BytesExt, FromBytes},
};

/// A single parameter on a content line, e.g., `TZID=America/New_York`.
///
/// Parameter names are case insensitive and are always stored in upper case.
/// A parameter may carry more than one value, e.g., `MEMBER="a","b"`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    name: String,
    values: Vec<String>,
}

impl Parameter {
    pub fn new(name: &str, value: impl Into<String>) -> Parameter {
        Parameter::with_values(name, vec![value.into()])
    }

    pub fn with_values(name: &str, values: Vec<String>) -> Parameter {
        Parameter { name: name.to_ascii_uppercase(), values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first value of this parameter, or an empty string if
    /// it has none.
    pub fn value(&self) -> &str {
        self.values.first().map(|v| v.as_str()).unwrap_or("")
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Values are written with RFC 6868 caret encoding, and quoted when they
/// contain a `:`, `;` or `,`.
impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}=", self.name)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let quote = value.contains([':', ';', ',']);
            if quote {
                f.write_str("\"")?;
            }
            for ch in value.chars() {
                match ch {
                    '^' => f.write_str("^^")?,
                    '\n' => f.write_str("^n")?,
                    '"' => f.write_str("^'")?,
                    _ => write!(f, "{ch}")?,
                }
            }
            if quote {
                f.write_str("\"")?;
            }
        }
        Ok(())
    }
}

/// One logical (i.e., unfolded) line of iCalendar content:
/// `NAME *(";" param) ":" value`.
///
/// The value is kept as raw text. Interpreting it is up to whoever knows
/// what the property means.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContentLine {
    name: String,
    params: Vec<Parameter>,
    value: String,
}

impl ContentLine {
    pub fn new(name: &str, value: impl Into<String>) -> ContentLine {
        ContentLine {
            name: name.to_ascii_uppercase(),
            params: vec![],
            value: value.into(),
        }
    }

    /// Parse a single unfolded content line.
    pub fn parse(line: &str) -> Result<ContentLine> {
        Ok(line.as_bytes().parse()?)
    }

    /// Appends a parameter. Parameters are written in the order they were
    /// added.
    pub fn param(&mut self, param: Parameter) -> &mut ContentLine {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns the first parameter with the given name, ignoring case.
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns this line folded for the wire, including its trailing CRLF.
    pub fn to_folded(&self) -> String {
        fold::fold(&self.to_string())
    }
}

impl std::fmt::Display for ContentLine {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.name)?;
        for param in self.params.iter() {
            write!(f, ";{param}")?;
        }
        write!(f, ":{}", self.value)
    }
}

impl std::str::FromStr for ContentLine {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<ContentLine> {
        ContentLine::parse(s)
    }
}

impl FromBytes for ContentLine {
    type Err = anyhow::Error;

    fn from_bytes(line: &[u8]) -> anyhow::Result<ContentLine> {
        let line = line.to_str()?;
        let Some(name_end) = line.find([';', ':']) else {
            anyhow::bail!("content line `{line}` is missing a `:`");
        };
        let name = &line[..name_end];
        anyhow::ensure!(
            is_name(name),
            "invalid property name `{name}` in content line `{line}`",
        );
        let mut params = vec![];
        let mut rest = &line[name_end..];
        while let Some(tail) = rest.strip_prefix(';') {
            let (param, tail) = parse_parameter(tail).map_err(|err| {
                err.context(format!("invalid parameter in `{line}`"))
            })?;
            params.push(param);
            rest = tail;
        }
        let Some(value) = rest.strip_prefix(':') else {
            anyhow::bail!("content line `{line}` is missing a `:`");
        };
        Ok(ContentLine {
            name: name.to_ascii_uppercase(),
            params,
            value: value.to_string(),
        })
    }
}

/// Parses one `NAME=value[,value...]` parameter from the beginning of `s`.
///
/// Returns the parameter and whatever follows it, which starts with either a
/// `;` or a `:` on success.
fn parse_parameter(s: &str) -> anyhow::Result<(Parameter, &str)> {
    let Some((name, mut rest)) = s.split_once('=') else {
        anyhow::bail!("parameter `{s}` is missing a `=`");
    };
    anyhow::ensure!(is_name(name), "invalid parameter name `{name}`");
    let mut values = vec![];
    loop {
        let (raw, tail) = if let Some(quoted) = rest.strip_prefix('"') {
            let Some(end) = quoted.find('"') else {
                anyhow::bail!("unclosed quote in parameter `{name}`");
            };
            (&quoted[..end], &quoted[end + 1..])
        } else {
            let end = rest.find([',', ';', ':']).unwrap_or(rest.len());
            anyhow::ensure!(
                !rest[..end].contains('"'),
                "unexpected quote in parameter `{name}`",
            );
            (&rest[..end], &rest[end..])
        };
        values.push(decode_caret(raw));
        match tail.strip_prefix(',') {
            Some(next) => rest = next,
            None => {
                anyhow::ensure!(
                    tail.starts_with([';', ':']),
                    "unexpected text after value of parameter `{name}`",
                );
                return Ok((Parameter::with_values(name, values), tail));
            }
        }
    }
}

/// Undoes RFC 6868 caret encoding. Unrecognized escapes are kept verbatim.
fn decode_caret(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '^' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('^') => out.push('^'),
            Some('n') => out.push('\n'),
            Some('\'') => out.push('"'),
            _ => {
                out.push('^');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Names are `iana-token` or `x-name` in RFC 5545, which both boil down to
/// ASCII letters, digits and dashes.
fn is_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Returns the logical lines of `text` along with the physical line number
/// on which each one starts.
///
/// Continuation lines (starting with a space or tab) are joined to the line
/// before them, blank lines are skipped and both CRLF and bare LF line
/// terminators are accepted. Unfolding happens on bytes, so a producer that
/// split a UTF-8 sequence across lines is handled correctly.
pub fn content_lines(
    text: &[u8],
) -> impl Iterator<Item = (usize, String)> {
    let mut lines = parse::physical_lines(text).peekable();
    std::iter::from_fn(move || {
        loop {
            let first = lines.next()?;
            if first.content().is_empty() {
                continue;
            }
            let mut buf = first.content().to_vec();
            while let Some(next) = lines.next_if(|l| l.is_continuation()) {
                buf.extend_from_slice(&next.content()[1..]);
            }
            return Some((first.number(), buf.to_str_lossy().into_owned()));
        }
    })
}

/// Unfolds and parses every content line in `text`.
///
/// Errors mention the line number on which the offending content line
/// starts.
pub fn parse_content_lines(text: &str) -> Result<Vec<ContentLine>> {
    let mut parsed = vec![];
    for (number, line) in content_lines(text.as_bytes()) {
        let cl = line.as_bytes().parse::<ContentLine>().map_err(|err| {
            err.context(format!("failed to parse content line {number}"))
        })?;
        parsed.push(cl);
    }
    Ok(parsed)
}
