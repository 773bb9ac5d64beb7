//! Sync regeneration: replace the generated struct inside an existing file
//!
//! The existing file is parsed with `syn`, the `LifeModel` struct for the
//! table is located by its `derive` and `table_name` attributes, and the bytes
//! from its first generator-owned attribute to its closing brace are replaced.
//! Everything outside that region is copied through unchanged. Attributes
//! inside the region that the generator does not own are carried over
//! verbatim, between the generated attributes and the struct keyword. Paths
//! added to the generated `derive` list by hand are kept after the generated
//! ones.

use crate::entity::RenderedEntity;
use crate::error::{CodegenError, Result};
use crate::writer::{derive_with, DERIVE, GENERATED_DERIVES, OWNED_ATTRIBUTES};
use proc_macro2::LineColumn;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ExprLit, Fields, Item, ItemStruct, Lit, Meta, Path, Token};

const BOM: &str = "\u{feff}";

/// Byte range of the generated struct inside a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

/// Splice `entity` over its previous rendering in `existing`
pub fn sync_source(existing: &str, entity: &RenderedEntity) -> Result<String> {
    let (bom, body) = match existing.strip_prefix(BOM) {
        Some(rest) => (BOM, rest),
        None => ("", existing),
    };
    let file = syn::parse_file(body)?;
    let offsets = LineOffsets::new(body);

    let item = find_entity(&file.items, &entity.table_name).ok_or_else(|| {
        CodegenError::CodeRegionNotFound {
            table: entity.table_name.clone(),
        }
    })?;
    let owned = owned_region(item, &offsets, body)?;
    let region = owned.region;

    let line_start = body[..region.start].rfind('\n').map_or(0, |n| n + 1);
    let indent = &body[line_start..region.start];
    let indent = if indent.chars().all(char::is_whitespace) { indent } else { "" };

    let mut rendered = entity.clone();
    if let Some(derive) = rendered.attributes.iter_mut().find(|a| a.as_str() == DERIVE) {
        *derive = derive_with(&owned.derives);
    }
    rendered.attributes.extend(owned.kept);
    let replacement = rendered.struct_source(indent);

    let mut out = String::with_capacity(existing.len() + replacement.len());
    out.push_str(bom);
    out.push_str(&body[..region.start]);
    out.push_str(&replacement);
    out.push_str(&body[region.end..]);
    Ok(out)
}

/// Locate the byte region a sync pass would replace
pub fn locate(existing: &str, table: &str) -> Result<Region> {
    let body = existing.strip_prefix(BOM).unwrap_or(existing);
    let shift = existing.len() - body.len();
    let file = syn::parse_file(body)?;
    let offsets = LineOffsets::new(body);
    let item = find_entity(&file.items, table).ok_or_else(|| CodegenError::CodeRegionNotFound {
        table: table.to_string(),
    })?;
    let region = owned_region(item, &offsets, body)?.region;
    Ok(Region {
        start: region.start + shift,
        end: region.end + shift,
    })
}

/// First `LifeModel` struct for `table`, searching inline modules too
fn find_entity<'a>(items: &'a [Item], table: &str) -> Option<&'a ItemStruct> {
    let mut found = None;
    for item in items {
        let candidate = match item {
            Item::Struct(s) if is_entity_for(s, table) => Some(s),
            Item::Mod(m) => m
                .content
                .as_ref()
                .and_then(|(_, nested)| find_entity(nested, table)),
            _ => None,
        };
        if let Some(s) = candidate {
            if found.is_some() {
                log::warn!("more than one LifeModel struct for `{table}`; syncing the first");
                break;
            }
            found = Some(s);
        }
    }
    found
}

fn is_entity_for(item: &ItemStruct, table: &str) -> bool {
    let derives_life_model = item.attrs.iter().any(derives_life_model);
    let table_matches = item
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("table_name"))
        .any(|attr| string_value(attr).as_deref() == Some(table));
    derives_life_model && table_matches
}

fn derive_paths(attr: &Attribute) -> Vec<Path> {
    if !attr.path().is_ident("derive") {
        return Vec::new();
    }
    attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)
        .map(|paths| paths.into_iter().collect())
        .unwrap_or_default()
}

fn last_segment_is(path: &Path, name: &str) -> bool {
    path.segments.last().is_some_and(|s| s.ident == name)
}

fn derives_life_model(attr: &Attribute) -> bool {
    derive_paths(attr).iter().any(|p| last_segment_is(p, "LifeModel"))
}

fn path_text(path: &Path) -> String {
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    let prefix = if path.leading_colon.is_some() { "::" } else { "" };
    format!("{prefix}{}", segments.join("::"))
}

fn string_value(attr: &Attribute) -> Option<String> {
    match &attr.meta {
        Meta::NameValue(nv) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => Some(s.value()),
            _ => None,
        },
        _ => None,
    }
}

fn is_owned(attr: &Attribute) -> bool {
    if attr.path().is_ident("derive") {
        return derives_life_model(attr);
    }
    OWNED_ATTRIBUTES.iter().any(|name| attr.path().is_ident(name))
}

/// What a sync pass replaces and what it carries over
struct Owned {
    region: Region,
    /// Inner text of unowned attributes inside the region
    kept: Vec<String>,
    /// Hand-added paths from the generated `derive` list
    derives: Vec<String>,
}

/// Region from the first owned attribute to the end of the struct
fn owned_region(item: &ItemStruct, offsets: &LineOffsets, body: &str) -> Result<Owned> {
    let first = item
        .attrs
        .iter()
        .position(is_owned)
        .ok_or_else(|| CodegenError::Generation("entity struct has no owned attributes".to_string()))?;
    let start = offsets.offset(item.attrs[first].pound_token.spans[0].start())?;

    let end = match &item.fields {
        Fields::Named(named) => named.brace_token.span.close().end(),
        Fields::Unnamed(_) | Fields::Unit => match &item.semi_token {
            Some(semi) => semi.spans[0].end(),
            None => item.ident.span().end(),
        },
    };
    let end = offsets.offset(end)?;

    let mut kept = Vec::new();
    for attr in item.attrs[first..].iter().filter(|attr| !is_owned(attr)) {
        let from = offsets.offset(attr.pound_token.spans[0].start())?;
        let to = offsets.offset(attr.bracket_token.span.close().end())?;
        let text = &body[from..to];
        // Doc comments are kept in their `#[doc = ..]` form.
        let inner = text
            .strip_prefix("#[")
            .and_then(|t| t.strip_suffix(']'))
            .map(str::to_string)
            .unwrap_or_else(|| doc_attribute(attr));
        kept.push(inner);
    }

    let mut derives: Vec<String> = Vec::new();
    for path in item.attrs.iter().filter(|a| derives_life_model(a)).flat_map(derive_paths) {
        let text = path_text(&path);
        let generated = GENERATED_DERIVES.iter().any(|name| last_segment_is(&path, name));
        if !generated && !derives.contains(&text) {
            derives.push(text);
        }
    }

    Ok(Owned {
        region: Region { start, end },
        kept,
        derives,
    })
}

fn doc_attribute(attr: &Attribute) -> String {
    let text = string_value(attr).unwrap_or_default();
    format!("doc = {text:?}")
}

/// Maps `proc-macro2` line/column positions back to byte offsets
struct LineOffsets<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineOffsets<'a> {
    fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(n, _)| n + 1));
        Self { text, starts }
    }

    /// Lines are 1-based, columns count chars from 0
    fn offset(&self, at: LineColumn) -> Result<usize> {
        let line_start = at
            .line
            .checked_sub(1)
            .and_then(|n| self.starts.get(n))
            .copied()
            .ok_or_else(|| CodegenError::Generation(format!("span line {} out of range", at.line)))?;
        let line = &self.text[line_start..];
        let within = line
            .char_indices()
            .map(|(n, _)| n)
            .chain(std::iter::once(line.len()))
            .nth(at.column)
            .ok_or_else(|| CodegenError::Generation(format!("span column {} out of range", at.column)))?;
        Ok(line_start + within)
    }
}
