use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use volt_lexer::Lexer;
use volt_parser::Parser;
use volt_syntax::{error, Arg, Delimiters, ErrorKind, Result, Template, Token};

use crate::codegen::Generator;
use crate::loader::{FileSystemLoader, TemplateLoader};
use crate::resolver;

/// Source name used for templates compiled from a string.
pub const EVAL_CODE: &str = "eval code";

/// Compiler settings. Every field has a default, so a partial JSON document
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Escape every print that is not explicitly filtered
    pub autoescape: bool,
    /// Prefix of generated loop variables (`$_1loop`)
    pub prefix: String,
    pub delimiters: Delimiters,
    /// Directory for compiled files; next to the template when unset
    pub compiled_path: Option<PathBuf>,
    pub compiled_separator: String,
    pub compiled_extension: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            autoescape: false,
            prefix: "_".to_string(),
            delimiters: Delimiters::default(),
            compiled_path: None,
            compiled_separator: "%%".to_string(),
            compiled_extension: ".php".to_string(),
        }
    }
}

/// How a registered function or filter is emitted.
pub enum Mapping {
    /// `name(args)` becomes `target(args)`
    Rename(String),
    /// Called with the compiled argument list and the raw argument nodes
    Generator(Box<dyn Fn(&str, &[Arg]) -> String>),
}

impl Mapping {
    pub fn generator(f: impl Fn(&str, &[Arg]) -> String + 'static) -> Self {
        Mapping::Generator(Box::new(f))
    }
}

impl From<&str> for Mapping {
    fn from(target: &str) -> Self { Mapping::Rename(target.to_string()) }
}

impl From<String> for Mapping {
    fn from(target: String) -> Self { Mapping::Rename(target) }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Rename(target) => f.debug_tuple("Rename").field(target).finish(),
            Mapping::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Output of one compile together with what inheritance did.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub code: String,
    /// Template names from the compiled template up to its root
    pub chain: Vec<String>,
    /// Overridden blocks the root template never renders
    pub dead_blocks: Vec<String>,
}

/// Compiles Volt templates to PHP.
///
/// A compiler owns its options, its user function and filter registries and
/// a [`TemplateLoader`]. Compiles are independent: nothing carries over from
/// one call to the next except the registries.
pub struct Compiler {
    pub(crate) options: CompilerOptions,
    pub(crate) functions: HashMap<String, Mapping>,
    pub(crate) filters: HashMap<String, Mapping>,
    pub(crate) loader: Box<dyn TemplateLoader>,
}

impl Default for Compiler {
    fn default() -> Self { Self::new() }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        let loader = FileSystemLoader::from_options(None, &options);
        Self {
            options,
            functions: HashMap::new(),
            filters: HashMap::new(),
            loader: Box::new(loader),
        }
    }

    pub fn with_loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn options(&self) -> &CompilerOptions { &self.options }

    pub fn options_mut(&mut self) -> &mut CompilerOptions { &mut self.options }

    pub fn set_autoescape(&mut self, enabled: bool) -> &mut Self {
        self.options.autoescape = enabled;
        self
    }

    /// Registers a user function; it shadows macros and builtins of the same name.
    pub fn add_function(&mut self, name: impl Into<String>, mapping: impl Into<Mapping>) -> &mut Self {
        self.functions.insert(name.into(), mapping.into());
        self
    }

    /// Registers a user filter; it shadows the builtin of the same name.
    pub fn add_filter(&mut self, name: impl Into<String>, mapping: impl Into<Mapping>) -> &mut Self {
        self.filters.insert(name.into(), mapping.into());
        self
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>> {
        if let Some(msg) = self.options.delimiters.validate() {
            return error(ErrorKind::Scanning, msg);
        }
        Lexer::with_delimiters(source, &self.options.delimiters).tokenize()
    }

    /// Parses a string template.
    pub fn parse(&self, source: &str) -> Result<Template> {
        self.parse_source(source, EVAL_CODE)
    }

    /// Parses `source`, naming it `name` in errors.
    pub fn parse_source(&self, source: &str, name: &str) -> Result<Template> {
        let tokens = self.tokenize(source).map_err(|e| e.in_source(name))?;
        Parser::new(tokens).parse_template().map_err(|e| e.in_source(name))
    }

    pub fn compile_string(&self, source: &str) -> Result<String> {
        Ok(self.compile_source(source, EVAL_CODE)?.code)
    }

    pub fn compile_source(&self, source: &str, name: &str) -> Result<Compilation> {
        let template = self.parse_source(source, name)?;
        self.generate(template, name)
    }

    /// Resolves inheritance and emits PHP for an already parsed template.
    pub fn generate(&self, template: Template, name: &str) -> Result<Compilation> {
        self.generate_unit(template, name, &[])
    }

    /// Compiles the template at `path` and writes the result to `destination`.
    pub fn compile_file(&self, path: &str, destination: &str) -> Result<String> {
        let source = self.loader.load(path)?;
        let code = self.compile_source(&source, path)?.code;
        self.loader.persist(destination, &code)?;
        Ok(code)
    }

    /// Compiles the template at `path` into the loader's compiled location.
    pub fn compile(&self, path: &str) -> Result<String> {
        let destination = self.compiled_path(path);
        self.compile_file(path, &destination)
    }

    pub fn compiled_path(&self, path: &str) -> String {
        self.loader.compiled_path(path)
    }

    pub(crate) fn load_template(&self, path: &str) -> Result<Template> {
        let source = self.loader.load(path)?;
        self.parse_source(&source, path)
    }

    /// Compiles an included template inline. `includes` holds the templates
    /// already being compiled above it.
    pub(crate) fn compile_include(&self, path: &str, includes: &[String]) -> Result<String> {
        let resolved = self.loader.resolve(path);
        if includes.contains(&resolved) {
            let mut cycle = includes.to_vec();
            cycle.push(resolved);
            return error(ErrorKind::Resolution, format!("Recursive include detected: {}", cycle.join(" -> ")));
        }
        let template = self.load_template(&resolved)?;
        Ok(self.generate_unit(template, &resolved, includes)?.code)
    }

    fn generate_unit(&self, template: Template, name: &str, includes: &[String]) -> Result<Compilation> {
        let (body, chain, dead_blocks) = if template.extends().is_some() {
            let resolution = resolver::resolve(self, template, name)?;
            (resolution.body, resolution.chain, resolution.dead_blocks)
        } else {
            (template.body, vec![name.to_string()], Vec::new())
        };

        let mut stack = includes.to_vec();
        stack.push(name.to_string());
        let code = Generator::new(self, stack).generate(&body).map_err(|e| e.in_source(name))?;
        Ok(Compilation { code, chain, dead_blocks })
    }
}
