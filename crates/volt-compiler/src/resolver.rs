//! Template inheritance: flattens an `extends` chain into one body.
//!
//! The chain is walked from the leaf up to the root. The root's body is the
//! output skeleton; each block in it is replaced by the nearest descendant
//! definition, and `{{ super() }}` inside an override expands to the next
//! definition further up the chain.

use std::collections::{BTreeSet, HashMap, HashSet};

use volt_syntax::{error, error_at, Error, ErrorKind, Expr, ForLoop, Literal, Result, Stmt, Template};

use crate::Compiler;

/// Result of flattening a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub body: Vec<Stmt>,
    /// Template names from the leaf to the root
    pub chain: Vec<String>,
    /// Blocks defined by a descendant that the root never renders
    pub dead_blocks: Vec<String>,
}

/// Extends paths must be string literals.
pub(crate) fn literal_path(path: &Expr, line: usize) -> Result<&str> {
    match path {
        Expr::Literal(Literal::Str(p)) => Ok(p),
        _ => error_at(ErrorKind::Resolution, line, "Extends path must be a literal string"),
    }
}

pub(crate) fn resolve(compiler: &Compiler, leaf: Template, name: &str) -> Result<Resolution> {
    let mut chain = vec![name.to_string()];
    let mut seen: HashSet<String> = chain.iter().cloned().collect();
    let mut levels = vec![leaf];

    while let Some((path, line)) = levels.last().and_then(Template::extends) {
        let current = chain.last().cloned().unwrap_or_default();
        let target = literal_path(path, line).map_err(|e| e.in_source(&current))?;
        let resolved = compiler.loader.resolve(target);
        if !seen.insert(resolved.clone()) {
            chain.push(resolved);
            return error(ErrorKind::Resolution, format!("Inheritance cycle detected: {}", chain.join(" -> ")))
                .map_err(|e| e.in_source(&current));
        }
        let parent = compiler.load_template(&resolved).map_err(|e| match e.source {
            None => Error::with_line(e.kind, e.msg, line).in_source(&current),
            Some(_) => e,
        })?;
        chain.push(resolved);
        levels.push(parent);
    }

    let tables: Vec<HashMap<String, Vec<Stmt>>> = levels
        .iter()
        .map(|t| {
            let mut blocks = HashMap::new();
            collect_blocks(&t.body, &mut blocks);
            blocks
        })
        .collect();

    let root = levels.pop().map(|t| t.body).unwrap_or_default();
    let mut flattener = Flattener { tables: &tables, used: HashSet::new() };
    let body = flattener.expand(root, None);

    let root_level = tables.len() - 1;
    let dead_blocks: BTreeSet<String> = tables[..root_level]
        .iter()
        .flat_map(|t| t.keys())
        .filter(|n| !flattener.used.contains(*n))
        .cloned()
        .collect();

    Ok(Resolution { body, chain, dead_blocks: dead_blocks.into_iter().collect() })
}

fn collect_blocks(body: &[Stmt], out: &mut HashMap<String, Vec<Stmt>>) {
    for stmt in body {
        if let Stmt::Block { name, body } = stmt {
            // First definition wins within one template
            out.entry(name.clone()).or_insert_with(|| body.clone());
        }
        for inner in child_bodies(stmt) {
            collect_blocks(inner, out);
        }
    }
}

fn child_bodies(stmt: &Stmt) -> Vec<&Vec<Stmt>> {
    match stmt {
        Stmt::If { branches, else_body } => branches.iter().map(|(_, b)| b).chain(else_body.iter()).collect(),
        Stmt::For(f) => std::iter::once(&f.body).chain(f.else_body.iter()).collect(),
        Stmt::Block { body, .. }
        | Stmt::Cache { body, .. }
        | Stmt::Autoescape { body, .. }
        | Stmt::Macro { body, .. } => vec![body],
        _ => Vec::new(),
    }
}

struct Flattener<'a> {
    /// Block tables indexed by level, 0 being the leaf
    tables: &'a [HashMap<String, Vec<Stmt>>],
    used: HashSet<String>,
}

impl Flattener<'_> {
    /// Nearest level at or above `from` that defines `name`.
    fn defining_level(&self, name: &str, from: usize) -> Option<usize> {
        (from..self.tables.len()).find(|&l| self.tables[l].contains_key(name))
    }

    fn block(&mut self, name: &str, level: usize) -> Vec<Stmt> {
        self.used.insert(name.to_string());
        let body = self.tables[level].get(name).cloned().unwrap_or_default();
        self.expand(body, Some((name, level)))
    }

    /// `current` is the block being expanded and the level it came from.
    fn expand(&mut self, body: Vec<Stmt>, current: Option<(&str, usize)>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            match stmt {
                Stmt::Block { name, body } => {
                    let body = match self.defining_level(&name, 0) {
                        Some(level) => self.block(&name, level),
                        None => self.expand(body, current),
                    };
                    out.push(Stmt::Block { name, body });
                }
                Stmt::Print(ref expr) if expr.call_name() == Some("super") => {
                    if let Some((name, level)) = current {
                        if let Some(parent) = self.defining_level(name, level + 1) {
                            let body = self.block(name, parent);
                            out.push(Stmt::Block { name: name.to_string(), body });
                        }
                    }
                }
                Stmt::Extends { .. } => {}
                other => out.push(self.expand_children(other, current)),
            }
        }
        out
    }

    fn expand_children(&mut self, stmt: Stmt, current: Option<(&str, usize)>) -> Stmt {
        match stmt {
            Stmt::If { branches, else_body } => Stmt::If {
                branches: branches.into_iter().map(|(c, b)| (c, self.expand(b, current))).collect(),
                else_body: else_body.map(|b| self.expand(b, current)),
            },
            Stmt::For(f) => Stmt::For(ForLoop {
                body: self.expand(f.body, current),
                else_body: f.else_body.map(|b| self.expand(b, current)),
                ..f
            }),
            Stmt::Cache { key, lifetime, body } => Stmt::Cache { key, lifetime, body: self.expand(body, current) },
            Stmt::Autoescape { enabled, body } => Stmt::Autoescape { enabled, body: self.expand(body, current) },
            Stmt::Macro { name, params, body } => Stmt::Macro { name, params, body: self.expand(body, current) },
            other => other,
        }
    }
}
