//! Bundled ECMAScript backend.
//!
//! Sources are parsed with `oxc_parser`; a visitor collects the span of every
//! `import`, `export ... from`, `import()` and `require()` specifier literal.
//! The arena-allocated AST is dropped right after, so the tree keeps only the
//! source text and those spans. Printing splices rewritten literals back into
//! the untouched source.

use std::collections::BTreeMap;
use std::fmt::Write;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportDefaultDeclaration,
    ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression, StringLiteral,
};
use oxc_ast::visit::walk;
use oxc_ast::Visit;
use oxc_parser::Parser;
use oxc_span::{SourceType as OxcSourceType, Span};

use super::{
    Dialect, LocationToken, Reference, ReferenceKind, SourceType, Syntax, SyntaxError, SyntaxTree,
};
use crate::diagnostic::Location;

const MODULE_ONLY: &str = "'import' and 'export' may appear only with 'sourceType: module'";

/// `oxc`-backed ECMAScript parser and printer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcmaSyntax;

impl EcmaSyntax {
    /// Create the backend.
    pub const fn new() -> Self {
        Self
    }
}

impl Syntax for EcmaSyntax {
    fn parse(&self, source: &str, dialect: &Dialect) -> Result<Box<dyn SyntaxTree>, SyntaxError> {
        Ok(Box::new(EcmaTree::parse(source, dialect)?))
    }
}

/// A specifier literal, as a byte range of the source.
#[derive(Debug, Clone, Copy)]
struct Literal {
    start: usize,
    end: usize,
    quote: char,
}

/// Parsed ECMAScript module.
#[derive(Debug, Clone)]
pub struct EcmaTree {
    source: String,
    references: Vec<Reference>,
    /// Indexed by [`LocationToken`].
    literals: Vec<Literal>,
    rewrites: BTreeMap<usize, String>,
}

impl EcmaTree {
    /// Parse `source` under `dialect`.
    pub fn parse(source: &str, dialect: &Dialect) -> Result<Self, SyntaxError> {
        let source_type = match dialect.source_type {
            SourceType::Module => OxcSourceType::mjs(),
            SourceType::Script => OxcSourceType::cjs(),
        };

        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if let Some(err) = ret.errors.first() {
            let offset = err
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map_or(0, |label| label.offset());
            return Err(SyntaxError::new(
                err.message.to_string(),
                Location::from_offset(source, offset),
            ));
        }

        let mut collector = Collector::new(source, dialect);
        collector.visit_program(&ret.program);
        if let Some(err) = collector.error {
            return Err(err);
        }

        Ok(Self {
            source: source.to_owned(),
            references: collector.references,
            literals: collector.literals,
            rewrites: BTreeMap::new(),
        })
    }
}

impl SyntaxTree for EcmaTree {
    fn references(&self) -> Vec<Reference> {
        self.references.clone()
    }

    fn rewrite(&mut self, token: LocationToken, value: &str) {
        if token.index() < self.literals.len() {
            self.rewrites.insert(token.index(), value.to_owned());
        }
    }

    fn print(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (&index, value) in &self.rewrites {
            let literal = self.literals[index];
            out.push_str(&self.source[cursor..literal.start]);
            write_string_literal(&mut out, value, literal.quote);
            cursor = literal.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

fn write_string_literal(out: &mut String, value: &str, quote: char) {
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

// =============================================================================
// Reference Collector
// =============================================================================

/// Walks the program in source order.
struct Collector<'s> {
    source: &'s str,
    dialect: &'s Dialect,
    references: Vec<Reference>,
    literals: Vec<Literal>,
    /// First dialect violation; the walk keeps going but the parse fails.
    error: Option<SyntaxError>,
}

impl<'s> Collector<'s> {
    fn new(source: &'s str, dialect: &'s Dialect) -> Self {
        Self {
            source,
            dialect,
            references: Vec::new(),
            literals: Vec::new(),
            error: None,
        }
    }

    fn push(&mut self, kind: ReferenceKind, literal: &StringLiteral<'_>) {
        let start = literal.span.start as usize;
        let quote = match self.source[start..].chars().next() {
            Some('\'') => '\'',
            _ => '"',
        };
        self.references.push(Reference {
            kind,
            specifier: literal.value.as_str().to_owned(),
            location: Location::from_offset(self.source, start),
            token: LocationToken::new(self.literals.len()),
        });
        self.literals.push(Literal {
            start,
            end: literal.span.end as usize,
            quote,
        });
    }

    fn fail(&mut self, message: &str, span: Span) {
        if self.error.is_none() {
            let location = Location::from_offset(self.source, span.start as usize);
            self.error = Some(SyntaxError::new(message, location));
        }
    }

    /// Module declarations are rejected under `sourceType: script`.
    fn module_only(&mut self, span: Span) -> bool {
        if self.dialect.source_type == SourceType::Script {
            self.fail(MODULE_ONLY, span);
            return false;
        }
        true
    }
}

impl<'a> Visit<'a> for Collector<'_> {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        if self.module_only(it.span) {
            self.push(ReferenceKind::Import, &it.source);
        }
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        if self.module_only(it.span) {
            self.push(ReferenceKind::ExportAll, &it.source);
        }
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if !self.module_only(it.span) {
            return;
        }
        if let Some(source) = &it.source {
            self.push(ReferenceKind::ExportNamed, source);
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        if self.module_only(it.span) {
            walk::walk_export_default_declaration(self, it);
        }
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if !self.dialect.ecma_version.supports_dynamic_import() {
            self.fail("Unexpected token", it.span);
            return;
        }
        if let Expression::StringLiteral(literal) = &it.source {
            self.push(ReferenceKind::DynamicImport, literal);
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name.as_str() == "require" {
                if let Some(Argument::StringLiteral(literal)) = it.arguments.first() {
                    self.push(ReferenceKind::Require, literal);
                }
            }
        }
        walk::walk_call_expression(self, it);
    }
}
