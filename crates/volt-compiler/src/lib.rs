//! Volt compiler: IR -> PHP.
//!
//! ```rust
//! use volt_compiler::Compiler;
//!
//! let compiler = Compiler::new();
//! let php = compiler.compile_string("{% if a %}{{ a|upper }}{% endif %}").unwrap();
//! assert_eq!(php, "<?php if ($a) { ?><?= Phalcon\\Text::upper($a) ?><?php } ?>");
//! ```

mod builtins;
mod codegen;
pub mod compiler;
pub mod loader;
pub mod resolver;

pub use compiler::{Compilation, Compiler, CompilerOptions, Mapping, EVAL_CODE};
pub use loader::{prepare_virtual_path, FileSystemLoader, MemoryLoader, TemplateLoader};
pub use resolver::Resolution;
