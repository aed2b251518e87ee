use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::parsers::TokenParser;

/// Entity delimiters come first so `&quot;` is not read as a bare `&`.
const DELIMITERS: [&str; 4] = ["&quot;", "&amp;", "\"", "'"];

/// String literals: quoted, `@` verbatim, entity-delimited, and `$` interpolated.
///
/// Interpolated strings with holes become `string.Format(format, args..)`.
pub struct StringTokenParser;

struct Hole {
    end: usize,
    expression: String,
    alignment: Option<String>,
    format: Option<String>,
}

impl TokenParser for StringTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        if prev.is_some() {
            return None;
        }
        let mut p = ctx.skip_whitespace();
        let (mut interpolated, mut verbatim) = (false, false);
        for _ in 0..2 {
            match ctx.char_at(p) {
                Some('$') if !interpolated => interpolated = true,
                Some('@') if !verbatim => verbatim = true,
                _ => break,
            }
            p += 1;
        }
        let delimiter = *DELIMITERS.iter().find(|d| ctx.starts_with_at(p, d))?;
        let width = delimiter.chars().count();
        p += width;

        let mut text = String::new();
        let mut args = Vec::new();
        loop {
            let c = ctx.char_at(p)?;
            if ctx.starts_with_at(p, delimiter) {
                if verbatim && width == 1 && ctx.starts_with_at(p + 1, delimiter) {
                    text.push(c);
                    p += 2;
                    continue;
                }
                p += width;
                break;
            }
            if !verbatim && c == '\\' {
                let (unescaped, next) = unescape(ctx, p + 1)?;
                text.push(unescaped);
                p = next;
                continue;
            }
            if interpolated && (c == '{' || c == '}') {
                if ctx.char_at(p + 1) == Some(c) {
                    text.push(c);
                    text.push(c);
                    p += 2;
                    continue;
                }
                if c == '}' {
                    return None;
                }
                let hole = scan_hole(ctx, p + 1)?;
                let node = ctx.parse_nested(&hole.expression)?;
                text.push('{');
                text.push_str(&args.len().to_string());
                if let Some(alignment) = hole.alignment {
                    text.push(',');
                    text.push_str(&alignment);
                }
                if let Some(format) = hole.format {
                    text.push(':');
                    text.push_str(&format);
                }
                text.push('}');
                args.push(node);
                p = hole.end;
                continue;
            }
            text.push(c);
            p += 1;
        }
        ctx.set_position(p);

        if !interpolated {
            return Some(ExpressionNode::constant(text));
        }
        if args.is_empty() {
            return Some(ExpressionNode::constant(
                text.replace("{{", "{").replace("}}", "}"),
            ));
        }
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(ExpressionNode::constant(text));
        call_args.extend(args);
        Some(ExpressionNode::method_call(
            Some(ExpressionNode::type_access("string")),
            "Format",
            call_args,
        ))
    }
}

fn unescape(ctx: &TokenParserContext, p: usize) -> Option<(char, usize)> {
    let c = match ctx.char_at(p)? {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0C}',
        'v' => '\u{0B}',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        'u' => {
            let hex = ctx.slice(p + 1, p + 5);
            if hex.chars().count() != 4 {
                return None;
            }
            let code = u32::from_str_radix(&hex, 16).ok()?;
            return Some((char::from_u32(code)?, p + 5));
        }
        _ => return None,
    };
    Some((c, p + 1))
}

/// Scans an interpolation hole starting after its `{`.
fn scan_hole(ctx: &TokenParserContext, start: usize) -> Option<Hole> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut p = start;
    let mut split: Option<usize> = None;
    loop {
        let c = ctx.char_at(p)?;
        if let Some(q) = quote {
            if c == '\\' {
                p += 1;
            } else if c == q {
                quote = None;
            }
            p += 1;
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' => depth = depth.checked_sub(1)?,
            '}' if depth > 0 => depth -= 1,
            '}' => break,
            ',' | ':' if depth == 0 => {
                split = Some(p);
                break;
            }
            _ => {}
        }
        p += 1;
    }
    let expression = ctx.slice(start, p);
    if expression.trim().is_empty() {
        return None;
    }
    let mut hole = Hole {
        end: p + 1,
        expression,
        alignment: None,
        format: None,
    };
    let Some(mut p) = split else {
        return Some(hole);
    };
    if ctx.char_at(p) == Some(',') {
        let from = p + 1;
        while !matches!(ctx.char_at(p + 1)?, ':' | '}') {
            p += 1;
        }
        let alignment = ctx.slice(from, p + 1).trim().to_string();
        alignment.parse::<i32>().ok()?;
        hole.alignment = Some(alignment);
        p += 1;
    }
    if ctx.char_at(p) == Some(':') {
        let from = p + 1;
        while ctx.char_at(p + 1)? != '}' {
            p += 1;
        }
        hole.format = Some(ctx.slice(from, p + 1));
        p += 1;
    }
    hole.end = p + 1;
    Some(hole)
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/string.rs"]
mod tests;
