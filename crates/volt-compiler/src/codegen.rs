//! PHP emission.
//!
//! A [`Generator`] walks one flattened statement list and appends PHP to an
//! output buffer. Statement emitters write `<?php ... ?>` islands around the
//! raw text; expression emitters return the PHP expression as a string.

use std::collections::HashSet;

use volt_syntax::{
    error_at, Arg, AssignOp, Assignment, BinaryOp, Error, ErrorKind, Expr, FilterName, ForLoop, Literal, MacroParam,
    Member, Result, Stmt, UnaryOp,
};

use crate::builtins;
use crate::compiler::{Compiler, Mapping};

pub(crate) struct Generator<'c> {
    compiler: &'c Compiler,
    out: String,
    /// Innermost `autoescape` setting last
    escape: Vec<bool>,
    /// One entry per enclosing `for`; true when it maintains a loop context
    loops: Vec<bool>,
    macros: HashSet<String>,
    /// Templates currently being compiled, outermost first
    includes: Vec<String>,
}

impl<'c> Generator<'c> {
    pub(crate) fn new(compiler: &'c Compiler, includes: Vec<String>) -> Self {
        Self {
            compiler,
            out: String::new(),
            escape: vec![compiler.options.autoescape],
            loops: Vec::new(),
            macros: HashSet::new(),
            includes,
        }
    }

    pub(crate) fn generate(mut self, body: &[Stmt]) -> Result<String> {
        self.emit_block(body)?;
        Ok(self.out)
    }

    fn emit_block(&mut self, body: &[Stmt]) -> Result<()> {
        for stmt in body {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn autoescape(&self) -> bool {
        self.escape.last().copied().unwrap_or(false)
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::RawText(text) => self.out.push_str(text),
            Stmt::Print(expr) => self.emit_print(expr)?,
            Stmt::If { branches, else_body } => {
                for (i, (cond, body)) in branches.iter().enumerate() {
                    let cond = self.expr(cond)?;
                    if i == 0 {
                        self.out.push_str(&format!("<?php if ({}) {{ ?>", cond));
                    } else {
                        self.out.push_str(&format!("<?php }} elseif ({}) {{ ?>", cond));
                    }
                    self.emit_block(body)?;
                }
                if let Some(body) = else_body {
                    self.out.push_str("<?php } else { ?>");
                    self.emit_block(body)?;
                }
                self.out.push_str("<?php } ?>");
            }
            Stmt::For(f) => self.emit_for(f)?,
            Stmt::Set(assignments) => {
                let mut parts = Vec::with_capacity(assignments.len());
                for a in assignments {
                    parts.push(self.assignment(a)?);
                }
                self.out.push_str(&format!("<?php {} ?>", parts.join(" ")));
            }
            Stmt::Do(expr) => {
                let code = self.expr(expr)?;
                self.out.push_str(&format!("<?php {}; ?>", code));
            }
            Stmt::Return(expr) => {
                let code = self.expr(expr)?;
                self.out.push_str(&format!("<?php return {}; ?>", code));
            }
            Stmt::Break => self.out.push_str("<?php break; ?>"),
            Stmt::Continue => self.out.push_str("<?php continue; ?>"),
            Stmt::Block { body, .. } => self.emit_block(body)?,
            // Only reachable when a chain was not resolved; nothing to print
            Stmt::Extends { .. } => {}
            Stmt::Include { path, params, line } => self.emit_include(path, params.as_ref(), *line)?,
            Stmt::Cache { key, lifetime, body } => self.emit_cache(key, lifetime.as_ref(), body)?,
            Stmt::Autoescape { enabled, body } => {
                self.escape.push(*enabled);
                let result = self.emit_block(body);
                self.escape.pop();
                result?;
            }
            Stmt::Macro { name, params, body } => self.emit_macro(name, params, body)?,
        }
        Ok(())
    }

    fn emit_print(&mut self, expr: &Expr) -> Result<()> {
        // super() with nothing above it renders nothing
        if expr.call_name() == Some("super") {
            return Ok(());
        }
        let code = self.expr(expr)?;
        let explicit = matches!(expr, Expr::Filter { filter: FilterName::Named(n), .. } if builtins::is_escaping_filter(n));
        if self.autoescape() && !explicit {
            self.out.push_str(&format!("<?= $this->escaper->escapeHtml({}) ?>", code));
        } else {
            self.out.push_str(&format!("<?= {} ?>", code));
        }
        Ok(())
    }

    fn assignment(&mut self, a: &Assignment) -> Result<String> {
        let op = match a.op {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        };
        Ok(format!("{} {} {};", self.expr(&a.target)?, op, self.expr(&a.value)?))
    }

    fn emit_for(&mut self, f: &ForLoop) -> Result<()> {
        let context = f.filter.as_ref().map_or(false, mentions_loop) || f.body.iter().any(stmt_mentions_loop);
        let level = self.loops.len() + 1;
        let p = format!("${}{}", self.compiler.options.prefix, level);
        let mut iterable = self.expr(&f.iterable)?;

        if context {
            let parent = match self.loops.last() {
                Some(true) => format!(" {p}loop->parent = ${}{}loop;", self.compiler.options.prefix, level - 1),
                _ => String::new(),
            };
            self.out.push_str(&format!(
                "<?php {p}iterator = {iterable}; {p}incr = 0; {p}loop = new stdClass();{parent} {p}loop->self = &{p}loop; \
                 {p}loop->length = count({p}iterator); {p}loop->index = 1; {p}loop->index0 = 0; \
                 {p}loop->revindex = {p}loop->length; {p}loop->revindex0 = {p}loop->length - 1; ?>"
            ));
            iterable = format!("{p}iterator");
        }
        if f.else_body.is_some() {
            self.out.push_str(&format!("<?php {p}iterated = false; ?>"));
        }

        let binding = match &f.key {
            Some(key) => format!("${} => ${}", key, f.value),
            None => format!("${}", f.value),
        };
        self.out.push_str(&format!("<?php foreach ({} as {}) {{ ", iterable, binding));
        if context {
            self.out.push_str(&format!(
                "{p}loop->first = ({p}incr == 0); {p}loop->index = {p}incr + 1; {p}loop->index0 = {p}incr; \
                 {p}loop->revindex = {p}loop->length - {p}incr; {p}loop->revindex0 = {p}loop->length - ({p}incr + 1); \
                 {p}loop->last = ({p}incr == ({p}loop->length - 1)); "
            ));
            // `continue` would skip an increment at the end of the body
            if f.has_continue {
                self.out.push_str(&format!("{p}incr++; "));
            }
        }
        if f.else_body.is_some() {
            self.out.push_str(&format!("{p}iterated = true; "));
        }

        self.loops.push(context);
        let result = self.emit_loop_body(f);
        self.loops.pop();
        result?;

        if context && !f.has_continue {
            self.out.push_str(&format!("<?php {p}incr++; }} ?>"));
        } else {
            self.out.push_str("<?php } ?>");
        }
        if let Some(body) = &f.else_body {
            self.out.push_str(&format!("<?php if (!{p}iterated) {{ ?>"));
            self.emit_block(body)?;
            self.out.push_str("<?php } ?>");
        }
        Ok(())
    }

    fn emit_loop_body(&mut self, f: &ForLoop) -> Result<()> {
        match &f.filter {
            Some(filter) => {
                let cond = self.expr(filter)?;
                self.out.push_str(&format!("if ({}) {{ ?>", cond));
                self.emit_block(&f.body)?;
                self.out.push_str("<?php } ?>");
            }
            None => {
                self.out.push_str("?>");
                self.emit_block(&f.body)?;
            }
        }
        Ok(())
    }

    fn emit_include(&mut self, path: &Expr, params: Option<&Expr>, line: usize) -> Result<()> {
        if let (Expr::Literal(Literal::Str(target)), None) = (path, params) {
            let code = self.compiler.compile_include(target, &self.includes).map_err(|e| match e.source {
                None => Error::with_line(e.kind, e.msg, line),
                Some(_) => e,
            })?;
            self.out.push_str(&code);
            return Ok(());
        }
        let path = self.expr(path)?;
        match params {
            Some(params) => {
                let params = self.expr(params)?;
                self.out.push_str(&format!("<?php $this->partial({}, {}); ?>", path, params));
            }
            None => self.out.push_str(&format!("<?php $this->partial({}); ?>", path)),
        }
        Ok(())
    }

    fn emit_cache(&mut self, key: &Expr, lifetime: Option<&Expr>, body: &[Stmt]) -> Result<()> {
        let key = self.expr(key)?;
        let lifetime = lifetime.map(|l| self.expr(l)).transpose()?;
        let (start, save) = match &lifetime {
            Some(l) => (format!("{}, {}", key, l), format!("{}, null, {}", key, l)),
            None => (key.clone(), key.clone()),
        };
        self.out.push_str(&format!(
            "<?php $_cache[{k}] = $this->di->get('viewCache'); $_cacheKey[{k}] = $_cache[{k}]->start({start}); \
             if ($_cacheKey[{k}] === null) {{ ?>",
            k = key,
            start = start
        ));
        self.emit_block(body)?;
        self.out.push_str(&format!(
            "<?php $_cache[{k}]->save({save}); }} else {{ echo $_cacheKey[{k}]; }} ?>",
            k = key,
            save = save
        ));
        Ok(())
    }

    fn emit_macro(&mut self, name: &str, params: &[MacroParam], body: &[Stmt]) -> Result<()> {
        // Registered first so the body may call itself
        self.macros.insert(name.to_string());
        self.out.push_str(&format!("<?php $this->macros['{}'] = function($__p = null) {{ ", name));
        for (i, param) in params.iter().enumerate() {
            let missing = match &param.default {
                Some(default) => format!("${} = {};", param.name, self.expr(default)?),
                None => format!(
                    "throw new \\Phalcon\\Mvc\\View\\Exception(\"Macro '{}' was called without parameter: {}\");",
                    name, param.name
                ),
            };
            self.out.push_str(&format!(
                "if (isset($__p[{i}])) {{ ${n} = $__p[{i}]; }} else {{ if (array_key_exists('{n}', $__p)) {{ ${n} = $__p['{n}']; }} else {{ {missing} }} }} ",
                i = i,
                n = param.name,
                missing = missing
            ));
        }
        self.out.push_str("?>");
        // Macro bodies start outside any loop
        let loops = std::mem::take(&mut self.loops);
        let result = self.emit_block(body);
        self.loops = loops;
        result?;
        self.out.push_str(&format!(
            "<?php }}; $this->macros['{n}'] = \\Closure::bind($this->macros['{n}'], $this); ?>",
            n = name
        ));
        Ok(())
    }

    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<String> {
        let code = match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Variable(name) => self.variable(name),
            Expr::Index(base, index) => format!("{}[{}]", self.expr(base)?, self.expr(index)?),
            Expr::Slice { base, start, end } => {
                let base = self.expr(base)?;
                let start = match start {
                    Some(s) => self.expr(s)?,
                    None => "0".to_string(),
                };
                let end = match end {
                    Some(e) => self.expr(e)?,
                    None => "null".to_string(),
                };
                format!("$this->slice({}, {}, {})", base, start, end)
            }
            Expr::Property(base, Member::Named(name)) => format!("{}->{}", self.expr(base)?, name),
            Expr::Property(base, Member::Computed(member)) => format!("{}->{{{}}}", self.expr(base)?, self.expr(member)?),
            Expr::Call { callee, args } => self.call(callee, args)?,
            Expr::Unary(op, operand) => {
                let inner = self.expr(operand)?;
                match op {
                    UnaryOp::Minus => format!("-{}", inner),
                    UnaryOp::Plus => format!("+{}", inner),
                    UnaryOp::Not => match operand.as_ref() {
                        Expr::Binary(..) | Expr::Test { .. } | Expr::Ternary(..) => format!("!({})", inner),
                        _ => format!("!{}", inner),
                    },
                    UnaryOp::PostIncrement => format!("{}++", inner),
                    UnaryOp::PostDecrement => format!("{}--", inner),
                }
            }
            Expr::Binary(op, left, right) => {
                let l = self.expr(left)?;
                let r = self.expr(right)?;
                match op {
                    BinaryOp::In => format!("$this->isIncluded({}, {})", l, r),
                    BinaryOp::NotIn => format!("!$this->isIncluded({}, {})", l, r),
                    BinaryOp::Pow => format!("pow({}, {})", l, r),
                    _ => format!("{} {} {}", l, binary_symbol(*op), r),
                }
            }
            Expr::Range(from, to) => format!("range({}, {})", self.expr(from)?, self.expr(to)?),
            Expr::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.expr(item)?);
                }
                format!("[{}]", parts.join(", "))
            }
            Expr::Map(pairs) => {
                let mut parts = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    parts.push(format!("{} => {}", self.expr(k)?, self.expr(v)?));
                }
                format!("[{}]", parts.join(", "))
            }
            Expr::Filter { expr, filter, args, line } => self.filter(expr, filter, args, *line)?,
            Expr::Test { expr, test, args, negated } => self.test(expr, test, args.as_deref(), *negated)?,
            Expr::Ternary(cond, then, otherwise) => {
                format!("({} ? {} : {})", self.expr(cond)?, self.expr(then)?, self.expr(otherwise)?)
            }
            Expr::Group(inner) => format!("({})", self.expr(inner)?),
        };
        Ok(code)
    }

    fn variable(&self, name: &str) -> String {
        if name == "loop" && self.loops.last() == Some(&true) {
            return format!("${}{}loop", self.compiler.options.prefix, self.loops.len());
        }
        format!("${}", name)
    }

    /// Argument list with named arguments as `'name' => value` pairs.
    fn args(&mut self, args: &[Arg]) -> Result<String> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.expr(&arg.value)?;
            parts.push(match &arg.name {
                Some(name) => format!("{} => {}", quote(name), value),
                None => value,
            });
        }
        Ok(parts.join(", "))
    }

    fn call(&mut self, callee: &Expr, args: &[Arg]) -> Result<String> {
        let compiled = self.args(args)?;
        let name = match callee {
            Expr::Variable(name) => name,
            _ => return Ok(format!("{}({})", self.expr(callee)?, compiled)),
        };
        if let Some(mapping) = self.compiler.functions.get(name) {
            return Ok(apply(mapping, &compiled, args));
        }
        if self.macros.contains(name) {
            return Ok(format!("$this->callMacro({}, [{}])", quote(name), compiled));
        }
        Ok(builtins::function(name, &compiled).unwrap_or_else(|| format!("{}({})", name, compiled)))
    }

    fn filter(&mut self, expr: &Expr, filter: &FilterName, args: &[Arg], line: usize) -> Result<String> {
        let name = match filter {
            FilterName::Named(name) => name,
            FilterName::Computed(_) => return error_at(ErrorKind::UnknownFilterType, line, "Unknown filter type"),
        };
        let left = self.expr(expr)?;
        let mut arg_codes = Vec::with_capacity(args.len());
        for arg in args {
            arg_codes.push(self.expr(&arg.value)?);
        }
        let all = std::iter::once(left.clone()).chain(arg_codes.iter().cloned()).collect::<Vec<_>>().join(", ");

        if let Some(mapping) = self.compiler.filters.get(name) {
            let mut raw = Vec::with_capacity(args.len() + 1);
            raw.push(Arg::positional(expr.clone()));
            raw.extend(args.iter().cloned());
            return Ok(apply(mapping, &all, &raw));
        }
        match builtins::filter(name, &left, &arg_codes, &all) {
            Some(code) => Ok(code),
            None => error_at(ErrorKind::UnknownFilter, line, format!("Unknown filter \"{}\"", name)),
        }
    }

    fn test(&mut self, expr: &Expr, name: &str, args: Option<&[Arg]>, negated: bool) -> Result<String> {
        let subject = self.expr(expr)?;
        let mut arg_codes = Vec::new();
        for arg in args.unwrap_or(&[]) {
            arg_codes.push(self.expr(&arg.value)?);
        }
        if let Some(code) = builtins::test(name, &subject, &arg_codes, negated) {
            return Ok(code);
        }
        let right = match args {
            Some(args) => format!("{}({})", name, self.args(args)?),
            None => format!("${}", name),
        };
        Ok(format!("{} {} {}", subject, if negated { "!=" } else { "==" }, right))
    }
}

fn apply(mapping: &Mapping, compiled: &str, raw: &[Arg]) -> String {
    match mapping {
        Mapping::Rename(target) => format!("{}({})", target, compiled),
        Mapping::Generator(generate) => generate(compiled, raw),
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "||",
        BinaryOp::And => "&&",
        BinaryOp::Eq | BinaryOp::Is => "==",
        BinaryOp::NotEq | BinaryOp::IsNot => "!=",
        BinaryOp::Identical => "===",
        BinaryOp::NotIdentical => "!==",
        BinaryOp::Less => "<",
        BinaryOp::LessEq => "<=",
        BinaryOp::Greater => ">",
        BinaryOp::GreaterEq => ">=",
        BinaryOp::Concat => ".",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        // emitted as calls
        BinaryOp::In | BinaryOp::NotIn | BinaryOp::Pow => "",
    }
}

fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Integer(n) | Literal::Double(n) => n.clone(),
        Literal::Str(s) => quote(s),
        Literal::Bool(true) => "true".to_string(),
        Literal::Bool(false) => "false".to_string(),
        Literal::Null => "null".to_string(),
    }
}

/// Single-quoted PHP string.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn stmt_mentions_loop(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Print(e) | Stmt::Do(e) | Stmt::Return(e) => mentions_loop(e),
        Stmt::If { branches, else_body } => {
            branches.iter().any(|(c, b)| mentions_loop(c) || b.iter().any(stmt_mentions_loop))
                || else_body.iter().flatten().any(stmt_mentions_loop)
        }
        Stmt::For(f) => {
            mentions_loop(&f.iterable)
                || f.filter.as_ref().map_or(false, mentions_loop)
                || f.body.iter().any(stmt_mentions_loop)
                || f.else_body.iter().flatten().any(stmt_mentions_loop)
        }
        Stmt::Set(assignments) => assignments.iter().any(|a| mentions_loop(&a.target) || mentions_loop(&a.value)),
        Stmt::Include { path, params, .. } => mentions_loop(path) || params.as_ref().map_or(false, mentions_loop),
        Stmt::Cache { key, lifetime, body } => {
            mentions_loop(key) || lifetime.as_ref().map_or(false, mentions_loop) || body.iter().any(stmt_mentions_loop)
        }
        Stmt::Block { body, .. } | Stmt::Autoescape { body, .. } => body.iter().any(stmt_mentions_loop),
        // macro bodies get their own scope
        Stmt::Macro { .. } => false,
        Stmt::RawText(_) | Stmt::Extends { .. } | Stmt::Break | Stmt::Continue => false,
    }
}

fn mentions_loop(expr: &Expr) -> bool {
    let any_arg = |args: &[Arg]| args.iter().any(|a| mentions_loop(&a.value));
    match expr {
        Expr::Literal(_) => false,
        Expr::Variable(name) => name == "loop",
        Expr::Index(a, b) | Expr::Binary(_, a, b) | Expr::Range(a, b) => mentions_loop(a) || mentions_loop(b),
        Expr::Slice { base, start, end } => {
            mentions_loop(base) || start.as_deref().map_or(false, mentions_loop) || end.as_deref().map_or(false, mentions_loop)
        }
        Expr::Property(base, member) => {
            mentions_loop(base) || matches!(member, Member::Computed(m) if mentions_loop(m))
        }
        Expr::Call { callee, args } => mentions_loop(callee) || any_arg(args),
        Expr::Unary(_, e) | Expr::Group(e) => mentions_loop(e),
        Expr::Array(items) => items.iter().any(mentions_loop),
        Expr::Map(pairs) => pairs.iter().any(|(k, v)| mentions_loop(k) || mentions_loop(v)),
        Expr::Filter { expr, filter, args, .. } => {
            mentions_loop(expr) || any_arg(args) || matches!(filter, FilterName::Computed(f) if mentions_loop(f))
        }
        Expr::Test { expr, args, .. } => mentions_loop(expr) || args.as_deref().map_or(false, any_arg),
        Expr::Ternary(a, b, c) => mentions_loop(a) || mentions_loop(b) || mentions_loop(c),
    }
}
