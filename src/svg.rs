//! # SVG Module
//!
//! Probe e resize dei file SVG senza tool esterni, sull'albero XML di `roxmltree`.
//!
//! - `dimensions()`: legge `width`/`height` dell'elemento `<svg>` radice, con fallback su `viewBox`
//! - `resize()`: riscrive solo il tag di apertura della radice (`width`/`height`); se manca un
//!   `viewBox` valido lo aggiunge con le dimensioni originali, così il disegno viene scalato e
//!   non ritagliato. Il resto del documento resta byte-identico.
//!
//! La radice può essere `<svg>` senza namespace, nel namespace SVG di default o con prefisso
//! (`<svg:svg xmlns:svg="...">`). Solo unità assolute semplici (`px` o nessuna unità) vengono
//! lette da `width`/`height`; percentuali e unità relative ricadono sul `viewBox`.

use roxmltree::{Document, Node};

use crate::error::OptimizeError;
use crate::format::ImageMetadata;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

fn probe_error(msg: impl std::fmt::Display) -> OptimizeError {
    OptimizeError::Probe(format!("invalid SVG: {}", msg))
}

fn parse_document(doc: &[u8]) -> Result<(&str, Document<'_>), OptimizeError> {
    let text = std::str::from_utf8(doc).map_err(|_| probe_error("not UTF-8 text"))?;
    let parsed = Document::parse(text).map_err(probe_error)?;
    Ok((text, parsed))
}

fn svg_root<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>, OptimizeError> {
    let root = doc.root_element();
    let tag = root.tag_name();
    let in_svg_namespace = tag.namespace().map_or(true, |ns| ns == SVG_NS);
    if tag.name() != "svg" || !in_svg_namespace {
        return Err(probe_error(format!("root element is <{}>, not <svg>", tag.name())));
    }
    Ok(root)
}

/// Parse a length in user units; `None` for percentages and relative units
fn parse_length(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    let value: f64 = number.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_view_box(raw: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

fn intrinsic_size(root: Node) -> Result<(f64, f64), OptimizeError> {
    let width = root.attribute("width").and_then(parse_length);
    let height = root.attribute("height").and_then(parse_length);
    let view_box = root.attribute("viewBox").and_then(parse_view_box);

    match (width, height, view_box) {
        (Some(w), Some(h), _) => Ok((w, h)),
        (Some(w), None, Some((vw, vh))) => Ok((w, w * vh / vw)),
        (None, Some(h), Some((vw, vh))) => Ok((h * vw / vh, h)),
        (None, None, Some(size)) => Ok(size),
        _ => Err(probe_error("no usable width/height or viewBox")),
    }
}

fn to_pixels(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Pixel dimensions of an SVG document
pub fn dimensions(doc: &[u8]) -> Result<ImageMetadata, OptimizeError> {
    let (_, parsed) = parse_document(doc)?;
    let (w, h) = intrinsic_size(svg_root(&parsed)?)?;
    Ok(ImageMetadata {
        width: to_pixels(w),
        height: to_pixels(h),
    })
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

/// Byte offset just past the `>` closing the start tag at `start`
fn start_tag_end(text: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, c) in text[start..].char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return Some(start + offset + 1),
            _ => {}
        }
    }
    None
}

/// Qualified attribute name, with the prefix declared for its namespace
fn qualified_name(root: Node, attr: &roxmltree::Attribute) -> String {
    let prefix = match attr.namespace() {
        None => None,
        Some(XML_NS) => Some("xml"),
        Some(uri) => root
            .namespaces()
            .find(|ns| ns.uri() == uri && ns.name().is_some())
            .and_then(|ns| ns.name()),
    };
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, attr.name()),
        None => attr.name().to_string(),
    }
}

/// Rewrite the root element so the document renders at `target`
pub fn resize(doc: &[u8], target: ImageMetadata) -> Result<Vec<u8>, OptimizeError> {
    let (text, parsed) = parse_document(doc)?;
    let root = svg_root(&parsed)?;
    let (w, h) = intrinsic_size(root)?;

    let start = root.range().start;
    let end = start_tag_end(text, start).ok_or_else(|| probe_error("unterminated root tag"))?;
    let self_closing = text[..end].ends_with("/>");
    let element_name: String = text[start + 1..end]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
        .collect();
    let keep_view_box = root.attribute("viewBox").and_then(parse_view_box).is_some();

    let mut tag = format!("<{}", element_name);
    for ns in root.namespaces().filter(|ns| ns.uri() != XML_NS) {
        match ns.name() {
            Some(prefix) => tag.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_attr(ns.uri()))),
            None => tag.push_str(&format!(" xmlns=\"{}\"", escape_attr(ns.uri()))),
        }
    }
    for attr in root.attributes() {
        let unqualified = attr.namespace().is_none();
        if unqualified && matches!(attr.name(), "width" | "height") {
            continue;
        }
        if unqualified && attr.name() == "viewBox" && !keep_view_box {
            continue;
        }
        tag.push_str(&format!(" {}=\"{}\"", qualified_name(root, &attr), escape_attr(attr.value())));
    }
    if !keep_view_box {
        tag.push_str(&format!(" viewBox=\"0 0 {} {}\"", w, h));
    }
    tag.push_str(&format!(" width=\"{}\" height=\"{}\"", target.width, target.height));
    tag.push_str(if self_closing { "/>" } else { ">" });

    let mut out = String::with_capacity(text.len() + 32);
    out.push_str(&text[..start]);
    out.push_str(&tag);
    out.push_str(&text[end..]);
    Ok(out.into_bytes())
}
