use std::fs;

use owo_colors::OwoColorize;
use volt_syntax::Error;

/// Prints a compile error with the offending template line.
///
/// `input` is the template the user asked for; when the error points into
/// another template (a parent or an include) that file is read instead.
pub fn render_error(err: &Error, input_path: &str, input: &str) {
    eprintln!("{}: {}", err.kind.label().red().bold(), err.to_string().red());

    let Some(line) = err.line else {
        provide_error_suggestions(&err.msg);
        return;
    };
    let source = match err.source.as_deref() {
        Some(name) if name != input_path => fs::read_to_string(name).ok(),
        _ => Some(input.to_string()),
    };
    eprintln!("  --> {}:{}", err.source.as_deref().unwrap_or(input_path), line);
    if let Some(src_line) = source.as_deref().and_then(|s| s.lines().nth(line.saturating_sub(1))) {
        let gutter = format!("{:3} | ", line);
        eprintln!("     |");
        eprintln!("{}{}", gutter.bright_black(), src_line);

        let indent = src_line.len() - src_line.trim_start().len();
        let width = src_line.trim().chars().count().max(1);
        let marker = format!("{}{}", " ".repeat(gutter.len() + indent), "^".repeat(width));
        eprintln!("{}", marker.red());
        eprintln!("     |");
    }
    provide_error_suggestions(&err.msg);
}

fn provide_error_suggestions(msg: &str) {
    if msg.starts_with("Unknown filter type") {
        eprintln!("{}", "Help: Filters must be written as a name, e.g. value|upper or value|format(x).".yellow());
    } else if msg.starts_with("Unknown filter") {
        eprintln!("{}", "Help: Check the filter name or register it with add_filter.".yellow());
        eprintln!(
            "    {}",
            "Built-ins: length, e, escape, trim, striptags, upper, lower, join, default, format, json_encode, ...".bright_black()
        );
    } else if msg.contains("unexpected EOF") {
        eprintln!("{}", "Help: A block is still open. Did you forget an end tag such as {% endif %}?".yellow());
    } else if msg.contains("Extends statement must be placed") {
        eprintln!("{}", "Help: Move {% extends %} to the very top of the template.".yellow());
    } else if msg.contains("Child templates only may contain blocks") {
        eprintln!("{}", "Help: Wrap content of a child template in {% block name %} ... {% endblock %}.".yellow());
    } else if msg.contains("could not be opened") {
        eprintln!("{}", "Help: Paths in extends/include resolve against --root when it is given.".yellow());
    } else if msg.contains("cycle") || msg.contains("Recursive include") {
        eprintln!("{}", "Help: A template ends up extending or including itself.".yellow());
    }
}
