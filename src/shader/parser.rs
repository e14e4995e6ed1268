//! Shader DSL parser.
//!
//! The DSL is a structural wrapper around native shader code:
//!
//! ```text
//! Shader "Custom/Standard"
//! {
//!     RenderQueue "Deferred"
//!     Properties
//!     {
//!         //# Float Roughness { default(0.7), min(0.0), max(1.0), ui(slider) }
//!         //# Texture2D BaseColor
//!     }
//!     ShadingModel
//!     {
//!         shadingmodel = 7;
//!         BRDF = ToonBRDF(input);
//!         BRDF { float3 ToonBRDF(BRDFInput input) { ... } }
//!     }
//!     Pass
//!     {
//!         Name "GBuffer"
//!         HLSLPROGRAM
//!         #pragma vertex VSMain
//!         #pragma fragment PSMain
//!         ...
//!         ENDHLSL
//!     }
//! }
//! ```
//!
//! Blocks are delimited by brace counting from the first `{` after their
//! keyword. Only the `ShadingModel` block is allowed to fail without failing
//! the whole shader.

use std::ops::Range;

use thiserror::Error;

use super::definition::*;
use super::sources::ShaderSources;

const PROGRAM_BEGIN: &str = "HLSLPROGRAM";
const PROGRAM_END: &str = "ENDHLSL";
const PROPERTY_MARKER: &str = "//#";

/// A parse error in shader DSL source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based source line of the offending construct.
    pub line: usize,
}

impl ParseError {
    fn at(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(text.len());
        let line = text.as_bytes()[..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        Self {
            message: message.into(),
            line,
        }
    }
}

/// Parser that completes Deferred shaders with the shared lighting pass.
pub struct ShaderParser<'a> {
    sources: &'a ShaderSources,
    screen_shader: &'a str,
}

impl<'a> ShaderParser<'a> {
    /// `screen_shader` names the shader whose first pass becomes the lighting
    /// pass of every single-pass Deferred shader.
    pub fn new(sources: &'a ShaderSources, screen_shader: &'a str) -> Self {
        Self {
            sources,
            screen_shader,
        }
    }

    /// Parse a shader and apply Deferred auto-completion.
    pub fn parse(&self, source: &str) -> Result<ShaderDefinition, ParseError> {
        let mut definition = parse_shader(source)?;
        if definition.render_queue == RenderQueue::Deferred && definition.name != self.screen_shader
        {
            self.complete_deferred(&mut definition)?;
        }
        Ok(definition)
    }

    fn complete_deferred(&self, definition: &mut ShaderDefinition) -> Result<(), ParseError> {
        if definition.passes.len() != 1 {
            return Err(ParseError {
                message: format!(
                    "Deferred shader {:?} must declare exactly one pass, found {}",
                    definition.name,
                    definition.passes.len()
                ),
                line: 1,
            });
        }

        let screen_source = self.sources.read(self.screen_shader).map_err(|e| ParseError {
            message: format!("cannot resolve shared shader {:?}: {e}", self.screen_shader),
            line: 1,
        })?;
        let screen = parse_shader(&screen_source).map_err(|e| ParseError {
            message: format!("shared shader {:?}: {}", self.screen_shader, e.message),
            line: e.line,
        })?;
        let mut lighting = screen.passes.into_iter().next().ok_or_else(|| ParseError {
            message: format!("shared shader {:?} declares no passes", self.screen_shader),
            line: 1,
        })?;
        lighting.render_queue = RenderQueue::Deferred;

        log::debug!(
            "shader {:?}: appended lighting pass {:?} from {:?}",
            definition.name,
            lighting.name,
            self.screen_shader
        );
        definition.passes.push(lighting);
        Ok(())
    }
}

/// Parse a shader without Deferred auto-completion.
pub fn parse_shader(text: &str) -> Result<ShaderDefinition, ParseError> {
    let mut scanner = Scanner::new(text, 0..text.len());
    let name = loop {
        scanner.skip_trivia();
        match scanner.peek() {
            None => {
                return Err(ParseError::at(
                    text,
                    text.len(),
                    "missing `Shader \"<name>\"` declaration",
                ))
            }
            Some(b'"') => scanner.skip_string()?,
            Some(c) if is_ident_start(c) => {
                if scanner.read_ident() == "Shader" {
                    break scanner.read_quoted()?.to_string();
                }
            }
            Some(_) => scanner.pos += 1,
        }
    };
    if name.trim().is_empty() {
        return Err(scanner.error("shader name is empty"));
    }

    let block = extract_block(text, scanner.pos, text.len())?;
    let mut body = Scanner::new(text, block.body.clone());

    let mut render_queue = None;
    let mut properties = Vec::new();
    let mut drafts = Vec::new();
    let mut shading_model = None;

    loop {
        body.skip_trivia();
        let Some(c) = body.peek() else { break };
        if c == b'"' {
            body.skip_string()?;
            continue;
        }
        if !is_ident_start(c) {
            body.pos += 1;
            continue;
        }

        let keyword_pos = body.pos;
        match body.read_ident() {
            "RenderQueue" => {
                let queue = body.read_quoted()?;
                render_queue = Some(
                    queue
                        .parse::<RenderQueue>()
                        .map_err(|e| ParseError::at(text, keyword_pos, e))?,
                );
            }
            "Properties" => {
                let block = extract_block(text, body.pos, body.end)?;
                properties.extend(parse_properties(text, block.body.clone())?);
                body.pos = block.after;
            }
            "ShadingModel" => {
                let block = extract_block(text, body.pos, body.end)?;
                match parse_shading_model(text, block.body.clone()) {
                    Ok(model) => shading_model = Some(model),
                    Err(e) => log::warn!(
                        "shader {name:?}: ignoring malformed ShadingModel block ({e})"
                    ),
                }
                body.pos = block.after;
            }
            "Pass" => {
                let block = extract_block(text, body.pos, body.end)?;
                drafts.push(parse_pass(text, block.body.clone())?);
                body.pos = block.after;
            }
            _ => {}
        }
    }

    if drafts.is_empty() {
        return Err(ParseError::at(
            text,
            block.body.start,
            format!("shader {name:?} declares no passes"),
        ));
    }

    let render_queue = render_queue.unwrap_or_default();
    let passes = drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| PassDefinition {
            name: draft.name.unwrap_or_else(|| format!("Pass{index}")),
            render_queue: draft.render_queue.unwrap_or(render_queue),
            vertex_entry: draft.vertex_entry,
            fragment_entry: draft.fragment_entry,
            body: draft.body,
        })
        .collect();

    Ok(ShaderDefinition {
        name,
        render_queue,
        properties,
        passes,
        shading_model,
    })
}

struct PassDraft {
    name: Option<String>,
    render_queue: Option<RenderQueue>,
    vertex_entry: String,
    fragment_entry: String,
    body: String,
}

fn parse_pass(text: &str, range: Range<usize>) -> Result<PassDraft, ParseError> {
    let region = &text[range.clone()];
    let begin = region
        .find(PROGRAM_BEGIN)
        .ok_or_else(|| ParseError::at(text, range.start, "pass is missing HLSLPROGRAM"))?;
    let code_start = begin + PROGRAM_BEGIN.len();
    let code_end = region[code_start..]
        .find(PROGRAM_END)
        .map(|i| code_start + i)
        .ok_or_else(|| {
            ParseError::at(text, range.start + begin, "HLSLPROGRAM without matching ENDHLSL")
        })?;

    let mut name = None;
    let mut render_queue = None;
    let mut header = Scanner::new(text, range.start..range.start + begin);
    loop {
        header.skip_trivia();
        let Some(c) = header.peek() else { break };
        if c == b'"' {
            header.skip_string()?;
            continue;
        }
        if !is_ident_start(c) {
            header.pos += 1;
            continue;
        }
        let keyword_pos = header.pos;
        match header.read_ident() {
            "Name" => name = Some(header.read_quoted()?.to_string()),
            "RenderQueue" => {
                let queue = header.read_quoted()?;
                render_queue = Some(
                    queue
                        .parse::<RenderQueue>()
                        .map_err(|e| ParseError::at(text, keyword_pos, e))?,
                );
            }
            _ => {}
        }
    }

    let mut vertex_entry = None;
    let mut fragment_entry = None;
    let mut kept = Vec::new();
    let mut line_offset = range.start + code_start;
    for line in region[code_start..code_end].split('\n') {
        let line_start = line_offset;
        line_offset += line.len() + 1;

        if let Some(pragma) = line.trim().strip_prefix("#pragma") {
            let mut words = pragma.split_whitespace();
            let slot = match words.next() {
                Some("vertex") => Some(&mut vertex_entry),
                Some("fragment") => Some(&mut fragment_entry),
                _ => None,
            };
            if let Some(slot) = slot {
                let entry = words.next().ok_or_else(|| {
                    ParseError::at(text, line_start, "#pragma is missing its entry point")
                })?;
                *slot = Some(entry.to_string());
                continue;
            }
        }
        kept.push(line);
    }

    let program_line = range.start + begin;
    Ok(PassDraft {
        name,
        render_queue,
        vertex_entry: vertex_entry
            .ok_or_else(|| ParseError::at(text, program_line, "missing #pragma vertex"))?,
        fragment_entry: fragment_entry
            .ok_or_else(|| ParseError::at(text, program_line, "missing #pragma fragment"))?,
        body: trim_blank_lines(&kept.join("\n")),
    })
}

fn parse_properties(
    text: &str,
    range: Range<usize>,
) -> Result<Vec<PropertyDefinition>, ParseError> {
    let mut properties: Vec<PropertyDefinition> = Vec::new();
    let mut offset = range.start;
    for line in text[range].split('\n') {
        let line_start = offset;
        offset += line.len() + 1;

        let Some(rest) = line.trim().strip_prefix(PROPERTY_MARKER) else {
            continue;
        };
        let property =
            parse_property_line(rest.trim()).map_err(|m| ParseError::at(text, line_start, m))?;
        if properties.iter().any(|p| p.name == property.name) {
            return Err(ParseError::at(
                text,
                line_start,
                format!("duplicate property {:?}", property.name),
            ));
        }
        properties.push(property);
    }
    Ok(properties)
}

fn parse_property_line(line: &str) -> Result<PropertyDefinition, String> {
    let (head, attributes) = match line.find('{') {
        Some(open) => {
            let close = line
                .rfind('}')
                .filter(|&close| close > open)
                .ok_or("unmatched '{' in property attributes")?;
            let trailing = line[close + 1..].trim();
            if !trailing.is_empty() && trailing != ";" {
                return Err(format!("unexpected {trailing:?} after property attributes"));
            }
            (&line[..open], Some(&line[open + 1..close]))
        }
        None if line.contains('}') => return Err("unmatched '}' in property".into()),
        None => (line.trim_end().trim_end_matches(';'), None),
    };

    let mut words = head.split_whitespace();
    let type_word = words.next().ok_or("missing property type")?;
    let ty = type_word.parse::<PropertyType>()?;
    let name = words
        .next()
        .ok_or_else(|| format!("missing name for {type_word} property"))?;
    if let Some(extra) = words.next() {
        return Err(format!("unexpected {extra:?} after property name {name:?}"));
    }
    if !is_identifier(name) {
        return Err(format!("{name:?} is not a valid property name"));
    }

    let mut property = PropertyDefinition::new(name, ty);
    if let Some(attributes) = attributes {
        parse_attributes(attributes, &mut property)?;
    }
    Ok(property)
}

fn parse_attributes(text: &str, property: &mut PropertyDefinition) -> Result<(), String> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() || c == b',' {
            pos += 1;
            continue;
        }
        if !is_ident_start(c) {
            return Err(format!("unexpected '{}' in property attributes", c as char));
        }
        let key_start = pos;
        while pos < bytes.len() && is_ident_continue(bytes[pos]) {
            pos += 1;
        }
        let key = &text[key_start..pos];
        if bytes.get(pos) != Some(&b'(') {
            return Err(format!("expected '(' after {key}"));
        }

        let value_start = pos + 1;
        let mut depth = 0usize;
        let mut close = None;
        for (i, &b) in bytes[pos..].iter().enumerate() {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(pos + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| format!("unclosed {key}(...)"))?;
        let value = Some(text[value_start..close].trim().to_string());
        match key {
            "default" => property.default = value,
            "min" => property.min = value,
            "max" => property.max = value,
            "ui" => property.ui = value,
            other => return Err(format!("unknown property attribute {other:?}")),
        }
        pos = close + 1;
    }
    Ok(())
}

fn parse_shading_model(
    text: &str,
    range: Range<usize>,
) -> Result<ShadingModelDefinition, ParseError> {
    let mut scanner = Scanner::new(text, range.clone());
    let mut id = None;
    let mut call = None;
    let mut body = None;

    loop {
        scanner.skip_trivia();
        let Some(c) = scanner.peek() else { break };
        if !is_ident_start(c) {
            return Err(scanner.error(format!(
                "unexpected '{}' in ShadingModel block",
                c as char
            )));
        }
        let key_pos = scanner.pos;
        let key = scanner.read_ident();
        scanner.skip_trivia();
        match scanner.peek() {
            Some(b'=') => {
                let value_start = scanner.pos + 1;
                let semicolon = text.as_bytes()[value_start..scanner.end]
                    .iter()
                    .position(|&b| b == b';')
                    .map(|i| value_start + i)
                    .ok_or_else(|| ParseError::at(text, key_pos, format!("expected ';' after {key}")))?;
                let value = text[value_start..semicolon].trim();
                scanner.pos = semicolon + 1;

                if key.eq_ignore_ascii_case("shadingmodel") {
                    id = Some(value.parse::<u32>().map_err(|_| {
                        ParseError::at(text, key_pos, format!("invalid shading model id {value:?}"))
                    })?);
                } else if key == "BRDF" {
                    if value.is_empty() {
                        return Err(ParseError::at(text, key_pos, "empty BRDF expression"));
                    }
                    call = Some(value.to_string());
                } else {
                    return Err(ParseError::at(text, key_pos, format!("unknown key {key:?}")));
                }
            }
            Some(b'{') if key == "BRDF" => {
                let block = extract_block(text, scanner.pos, scanner.end)?;
                body = Some(trim_blank_lines(&text[block.body.clone()]));
                scanner.pos = block.after;
            }
            _ => {
                return Err(ParseError::at(
                    text,
                    key_pos,
                    format!("expected '=' or '{{' after {key}"),
                ))
            }
        }
    }

    let missing = |what: &str| ParseError::at(text, range.start, format!("ShadingModel is missing {what}"));
    Ok(ShadingModelDefinition {
        id: id.ok_or_else(|| missing("`shadingmodel = <id>;`"))?,
        call: call.ok_or_else(|| missing("`BRDF = <expr>;`"))?,
        body: body.ok_or_else(|| missing("a `BRDF { ... }` body"))?,
    })
}

struct Block {
    body: Range<usize>,
    after: usize,
}

/// Locate the first `{` at or after `from` and its balanced `}`.
fn extract_block(text: &str, from: usize, limit: usize) -> Result<Block, ParseError> {
    let bytes = text.as_bytes();
    let open = bytes[from..limit]
        .iter()
        .position(|&b| b == b'{')
        .map(|i| from + i)
        .ok_or_else(|| ParseError::at(text, from, "expected '{'"))?;

    let mut depth = 0usize;
    for (i, &b) in bytes[open..limit].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + i;
                    return Ok(Block {
                        body: open + 1..close,
                        after: close + 1,
                    });
                }
            }
            _ => {}
        }
    }
    Err(ParseError::at(text, open, "unmatched '{'"))
}

fn trim_blank_lines(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let last = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(first);
    lines[first..=last].join("\n")
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty() && is_ident_start(bytes[0]) && bytes.iter().all(|&b| is_ident_continue(b))
}

/// Cursor over a byte range of the source.
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, range: Range<usize>) -> Self {
        Self {
            text,
            pos: range.start,
            end: range.end,
        }
    }

    fn peek(&self) -> Option<u8> {
        (self.pos < self.end).then(|| self.text.as_bytes()[self.pos])
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.text, self.pos, message)
    }

    /// Skip whitespace, `//` and `/* */` comments.
    fn skip_trivia(&mut self) {
        let bytes = self.text.as_bytes();
        while self.pos < self.end {
            let next = bytes.get(self.pos + 1).copied();
            match (bytes[self.pos], next) {
                (c, _) if c.is_ascii_whitespace() => self.pos += 1,
                (b'/', Some(b'/')) => {
                    self.pos = bytes[self.pos..self.end]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(self.end, |i| self.pos + i + 1);
                }
                (b'/', Some(b'*')) => {
                    self.pos = self.text[self.pos + 2..self.end]
                        .find("*/")
                        .map_or(self.end, |i| self.pos + 2 + i + 2);
                }
                _ => break,
            }
        }
    }

    /// Read an identifier; the caller has checked `is_ident_start`.
    fn read_ident(&mut self) -> &'a str {
        let start = self.pos;
        let bytes = self.text.as_bytes();
        while self.pos < self.end && is_ident_continue(bytes[self.pos]) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn read_quoted(&mut self) -> Result<&'a str, ParseError> {
        self.skip_trivia();
        if self.peek() != Some(b'"') {
            return Err(self.error("expected a quoted string"));
        }
        let start = self.pos + 1;
        let close = self.text.as_bytes()[start..self.end]
            .iter()
            .position(|&b| b == b'"' || b == b'\n')
            .map(|i| start + i)
            .filter(|&i| self.text.as_bytes()[i] == b'"')
            .ok_or_else(|| self.error("unterminated string"))?;
        self.pos = close + 1;
        Ok(&self.text[start..close])
    }

    fn skip_string(&mut self) -> Result<(), ParseError> {
        self.read_quoted().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORWARD: &str = r#"
Shader "Unlit"
{
    RenderQueue "Forward"
    Properties
    {
        //# Float Roughness { default(0.7), min(0.0), max(1.0), ui(slider) }
        //# Vector4 Tint { default(1, 0.5, 0.25, 1) }
        //# Texture2D BaseColor
    }
    Pass
    {
        Name "Main"
        HLSLPROGRAM
        #pragma vertex VSMain
        #pragma fragment PSMain
        float4 PSMain() : SV_Target { return Tint; }
        ENDHLSL
    }
}
"#;

    #[test]
    fn test_parse_forward_shader() {
        let def = parse_shader(FORWARD).unwrap();
        assert_eq!(def.name, "Unlit");
        assert_eq!(def.render_queue, RenderQueue::Forward);
        assert_eq!(def.properties.len(), 3);

        let roughness = &def.properties[0];
        assert_eq!(roughness.ty, PropertyType::Float);
        assert_eq!(roughness.default.as_deref(), Some("0.7"));
        assert_eq!(roughness.min.as_deref(), Some("0.0"));
        assert_eq!(roughness.max.as_deref(), Some("1.0"));
        assert_eq!(roughness.ui.as_deref(), Some("slider"));
        assert_eq!(def.properties[1].default.as_deref(), Some("1, 0.5, 0.25, 1"));
        assert_eq!(def.properties[2].ty, PropertyType::Texture2D);

        assert_eq!(def.passes.len(), 1);
        let pass = &def.passes[0];
        assert_eq!(pass.name, "Main");
        assert_eq!(pass.render_queue, RenderQueue::Forward);
        assert_eq!(pass.vertex_entry, "VSMain");
        assert_eq!(pass.fragment_entry, "PSMain");
        assert!(!pass.body.contains("#pragma"));
        assert!(pass.body.contains("float4 PSMain()"));
        assert!(def.shading_model.is_none());
    }

    #[test]
    fn test_unmatched_brace_fails() {
        let src = "Shader \"Broken\" { Pass { HLSLPROGRAM #pragma vertex A\n ENDHLSL ";
        let err = parse_shader(src).unwrap_err();
        assert!(err.message.contains("unmatched"));
    }

    #[test]
    fn test_missing_shader_keyword() {
        assert!(parse_shader("Pass { }").is_err());
    }

    #[test]
    fn test_missing_pragma_fails() {
        let src = "Shader \"S\" { Pass { HLSLPROGRAM\n#pragma vertex VS\nENDHLSL } }";
        let err = parse_shader(src).unwrap_err();
        assert!(err.message.contains("#pragma fragment"));
    }

    #[test]
    fn test_unknown_property_type_reports_line() {
        let src = "Shader \"S\"\n{\n Properties\n {\n //# Matrix M\n }\n Pass { HLSLPROGRAM\n#pragma vertex V\n#pragma fragment P\nENDHLSL }\n}";
        let err = parse_shader(src).unwrap_err();
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_shading_model_block() {
        let src = r#"
Shader "Toon"
{
    ShadingModel
    {
        shadingmodel = 7;
        BRDF = ToonBRDF(input);
        BRDF
        {
            float3 ToonBRDF(BRDFInput input) { return input.albedo; }
        }
    }
    Pass { HLSLPROGRAM
    #pragma vertex V
    #pragma fragment P
    ENDHLSL }
}
"#;
        let model = parse_shader(src).unwrap().shading_model.unwrap();
        assert_eq!(model.id, 7);
        assert_eq!(model.call, "ToonBRDF(input)");
        assert_eq!(
            model.body,
            "            float3 ToonBRDF(BRDFInput input) { return input.albedo; }"
        );
    }

    #[test]
    fn test_malformed_shading_model_is_not_fatal() {
        let src = r#"
Shader "Toon"
{
    ShadingModel { shadingmodel = seven; }
    Pass { HLSLPROGRAM
    #pragma vertex V
    #pragma fragment P
    ENDHLSL }
}
"#;
        let def = parse_shader(src).unwrap();
        assert!(def.shading_model.is_none());
        assert_eq!(def.passes.len(), 1);
    }

    #[test]
    fn test_pass_inherits_shader_queue() {
        let src = "Shader \"S\" { Pass { HLSLPROGRAM\n#pragma vertex V\n#pragma fragment P\nENDHLSL } RenderQueue \"Deferred\" }";
        let def = parse_shader(src).unwrap();
        assert_eq!(def.passes[0].render_queue, RenderQueue::Deferred);
        assert_eq!(def.passes[0].name, "Pass0");
    }

    #[test]
    fn test_deferred_completion() {
        let mut sources = ShaderSources::new();
        sources.register(
            "Screen",
            "Shader \"Screen\" { Pass { Name \"Lighting\" HLSLPROGRAM\n#pragma vertex FullscreenVS\n#pragma fragment LightingPS\nfloat4 LightingPS() : SV_Target { return 1; }\nENDHLSL } }",
        );
        let parser = ShaderParser::new(&sources, "Screen");
        let src = "Shader \"Lit\" { RenderQueue \"Deferred\" Pass { HLSLPROGRAM\n#pragma vertex V\n#pragma fragment P\nENDHLSL } }";

        let def = parser.parse(src).unwrap();
        assert_eq!(def.passes.len(), 2);
        assert_eq!(def.passes[1].name, "Lighting");
        assert_eq!(def.passes[1].render_queue, RenderQueue::Deferred);
        assert_eq!(def.passes[1].fragment_entry, "LightingPS");
    }

    #[test]
    fn test_deferred_with_two_passes_fails() {
        let sources = ShaderSources::new();
        let parser = ShaderParser::new(&sources, "Screen");
        let pass = "Pass { HLSLPROGRAM\n#pragma vertex V\n#pragma fragment P\nENDHLSL }";
        let src = format!("Shader \"Lit\" {{ RenderQueue \"Deferred\" {pass} {pass} }}");
        let err = parser.parse(&src).unwrap_err();
        assert!(err.message.contains("exactly one pass"));
    }
}
