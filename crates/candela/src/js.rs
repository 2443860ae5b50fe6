//! The JS→CSS import contract.
//!
//! The JavaScript side of the bundler is an external collaborator; the only
//! thing this subsystem needs from a JS file is its import statements and,
//! for namespace imports, which members get accessed. A small `nom` scanner
//! covers exactly that.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

#[derive(Debug, Clone)]
pub struct JsImport {
    pub spec: String,
    /// Byte offset of the `import` keyword, for diagnostics ordering.
    pub offset: usize,
    pub default_name: Option<String>,
    pub namespace: Option<String>,
    /// `(exported name, local name)` pairs from `{ a, b as c }`.
    pub named: Vec<(String, String)>,
}

impl JsImport {
    pub fn is_side_effect_only(&self) -> bool {
        self.default_name.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

/// Scans `source` for import statements, in document order.
pub fn scan_imports(source: &str) -> Vec<JsImport> {
    let mut imports = Vec::new();
    let bytes = source.as_bytes();

    for (offset, _) in source.match_indices("import") {
        // Must sit at a token boundary on both sides.
        if offset > 0 && is_ident_byte(bytes[offset - 1]) {
            continue;
        }
        match bytes.get(offset + "import".len()) {
            Some(&b) if is_ident_byte(b) => continue,
            None => continue,
            _ => {}
        }
        if let Ok((_, mut import)) = parse_import(&source[offset..]) {
            import.offset = offset;
            imports.push(import);
        }
    }

    imports
}

/// Finds `<namespace>.<member>` accesses for a namespace binding.
pub fn member_accesses(source: &str, namespace: &str) -> Vec<(String, usize)> {
    let mut accesses = Vec::new();
    let bytes = source.as_bytes();
    for (offset, _) in source.match_indices(namespace) {
        if offset > 0 && is_ident_byte(bytes[offset - 1]) {
            continue;
        }
        let rest = &source[offset + namespace.len()..];
        let Some(rest) = rest.strip_prefix('.') else {
            continue;
        };
        let member: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        if !member.is_empty() {
            accesses.push((member, offset));
        }
    }
    accesses
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        nom::bytes::complete::take_while1(|c: char| {
            c.is_ascii_alphabetic() || c == '_' || c == '$'
        }),
        nom::bytes::complete::take_while(|c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$'
        }),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), is_not("\""), char('"')),
        delimited(char('\''), is_not("'"), char('\'')),
    ))(input)
}

/// `a` or `a as b`.
fn named_specifier(input: &str) -> IResult<&str, (String, String)> {
    let (input, exported) = preceded(multispace0, identifier)(input)?;
    let (input, alias) = opt(preceded(
        tuple((multispace1, tag("as"), multispace1)),
        identifier,
    ))(input)?;
    let (input, _) = multispace0(input)?;
    let local = alias.unwrap_or(exported);
    Ok((input, (exported.to_string(), local.to_string())))
}

fn named_imports(input: &str) -> IResult<&str, Vec<(String, String)>> {
    delimited(
        char('{'),
        separated_list1(char(','), named_specifier),
        char('}'),
    )(input)
}

fn namespace_import(input: &str) -> IResult<&str, String> {
    map(
        preceded(
            tuple((char('*'), multispace0, tag("as"), multispace1)),
            identifier,
        ),
        |name| name.to_string(),
    )(input)
}

fn parse_import(input: &str) -> IResult<&str, JsImport> {
    let (input, _) = tag("import")(input)?;

    // Side-effect form: `import "./a.css"`.
    if let Ok((rest, spec)) = preceded(multispace0::<&str, nom::error::Error<&str>>, string_literal)(input) {
        return Ok((
            rest,
            JsImport {
                spec: spec.to_string(),
                offset: 0,
                default_name: None,
                namespace: None,
                named: Vec::new(),
            },
        ));
    }

    let (input, _) = multispace1(input)?;

    let (input, (default_name, mut namespace, mut named)) = alt((
        map(namespace_import, |ns| (None, Some(ns), Vec::new())),
        map(named_imports, |names| (None, None, names)),
        map(identifier, |name| {
            (Some(name.to_string()), None, Vec::new())
        }),
    ))(input)?;
    let (mut input, _) = multispace0::<&str, nom::error::Error<&str>>(input)?;

    // `import def, { a }` / `import def, * as ns`.
    if default_name.is_some() {
        if let Ok((rest, extra)) = preceded(
            pair(char(','), multispace0::<&str, nom::error::Error<&str>>),
            alt((
                map(namespace_import, |ns| (Some(ns), Vec::new())),
                map(named_imports, |names| (None, names)),
            )),
        )(input)
        {
            namespace = extra.0;
            named = extra.1;
            input = rest;
        }
        let (rest, _) = multispace0::<&str, nom::error::Error<&str>>(input)?;
        input = rest;
    }

    let (input, spec) = preceded(pair(tag("from"), multispace0), string_literal)(input)?;

    Ok((
        input,
        JsImport {
            spec: spec.to_string(),
            offset: 0,
            default_name,
            namespace,
            named,
        },
    ))
}
