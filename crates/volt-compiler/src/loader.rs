use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use volt_syntax::{error, ErrorKind, Result};

use crate::CompilerOptions;

/// Where templates come from and where compiled output goes.
pub trait TemplateLoader {
    /// Read the source of a template.
    fn load(&self, path: &str) -> Result<String>;
    /// Turn an `extends`/`include` path into a loadable one.
    fn resolve(&self, path: &str) -> String;
    /// Destination of the compiled form of `path`.
    fn compiled_path(&self, path: &str) -> String;
    /// Store compiled output.
    fn persist(&self, target: &str, code: &str) -> Result<()>;
}

/// Loads templates from disk, optionally relative to a views directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: Option<PathBuf>,
    compiled_dir: Option<PathBuf>,
    separator: String,
    extension: String,
}

impl FileSystemLoader {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self::from_options(root, &CompilerOptions::default())
    }

    pub fn from_options(root: Option<PathBuf>, options: &CompilerOptions) -> Self {
        Self {
            root,
            compiled_dir: options.compiled_path.clone(),
            separator: options.compiled_separator.clone(),
            extension: options.compiled_extension.clone(),
        }
    }
}

impl Default for FileSystemLoader {
    fn default() -> Self { Self::new(None) }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, path: &str) -> Result<String> {
        fs::read_to_string(path)
            .or_else(|_| error(ErrorKind::Resolution, format!("Template file {} could not be opened", path)))
    }

    fn resolve(&self, path: &str) -> String {
        match &self.root {
            Some(root) if Path::new(path).is_relative() => root.join(path).to_string_lossy().into_owned(),
            _ => path.to_string(),
        }
    }

    fn compiled_path(&self, path: &str) -> String {
        match &self.compiled_dir {
            Some(dir) => {
                let real = fs::canonicalize(path)
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| path.to_string());
                let file = format!("{}{}", prepare_virtual_path(&real, &self.separator), self.extension);
                dir.join(file).to_string_lossy().into_owned()
            }
            None => format!("{}{}", path, self.extension),
        }
    }

    fn persist(&self, target: &str, code: &str) -> Result<()> {
        if let Some(parent) = Path::new(target).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(target, code)?;
        Ok(())
    }
}

/// Flattens a path into a single file name: separators and drive colons
/// become `separator`, letters are lowercased.
pub fn prepare_virtual_path(path: &str, separator: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '/' | '\\' | ':' => out.push_str(separator),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

#[derive(Debug, Default)]
struct MemoryStore {
    templates: HashMap<String, String>,
    compiled: HashMap<String, String>,
}

/// In-memory templates. Clones share the same store, so a handle kept
/// outside the compiler can inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    store: Rc<RefCell<MemoryStore>>,
}

impl MemoryLoader {
    pub fn new() -> Self { Self::default() }

    pub fn with(self, path: &str, source: &str) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&self, path: &str, source: &str) {
        self.store.borrow_mut().templates.insert(path.to_string(), source.to_string());
    }

    pub fn compiled(&self, target: &str) -> Option<String> {
        self.store.borrow().compiled.get(target).cloned()
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, path: &str) -> Result<String> {
        match self.store.borrow().templates.get(path) {
            Some(source) => Ok(source.clone()),
            None => error(ErrorKind::Resolution, format!("Template file {} could not be opened", path)),
        }
    }

    fn resolve(&self, path: &str) -> String { path.to_string() }

    fn compiled_path(&self, path: &str) -> String { format!("{}.php", path) }

    fn persist(&self, target: &str, code: &str) -> Result<()> {
        self.store.borrow_mut().compiled.insert(target.to_string(), code.to_string());
        Ok(())
    }
}
