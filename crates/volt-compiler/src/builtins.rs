//! Builtin filter, function and test tables.
//!
//! Each lookup returns the emitted PHP for a known name, or `None` so the
//! caller can fall back (user registrations are consulted before these).

/// Filters whose output is already escaped (or explicitly raw).
pub(crate) fn is_escaping_filter(name: &str) -> bool {
    matches!(name, "e" | "escape" | "escape_css" | "escape_js" | "escape_attr" | "raw")
}

/// `left` is the filtered value, `args` the filter's own arguments and
/// `all` both joined as an argument list.
pub(crate) fn filter(name: &str, left: &str, args: &[String], all: &str) -> Option<String> {
    let code = match name {
        "length" => format!("$this->length({})", all),
        "e" | "escape" => format!("$this->escaper->escapeHtml({})", all),
        "escape_css" => format!("$this->escaper->escapeCss({})", all),
        "escape_js" => format!("$this->escaper->escapeJs({})", all),
        "escape_attr" => format!("$this->escaper->escapeHtmlAttr({})", all),
        "trim" => format!("trim({})", all),
        "left_trim" => format!("ltrim({})", all),
        "right_trim" => format!("rtrim({})", all),
        "striptags" => format!("strip_tags({})", all),
        "url_encode" => format!("urlencode({})", all),
        "slashes" => format!("addslashes({})", all),
        "stripslashes" => format!("stripslashes({})", all),
        "nl2br" => format!("nl2br({})", all),
        "keys" => format!("array_keys({})", all),
        "join" => {
            let glue = args.first().map(String::as_str).unwrap_or("''");
            format!("join({}, {})", glue, left)
        }
        "lower" | "lowercase" => format!("Phalcon\\Text::lower({})", all),
        "upper" | "uppercase" => format!("Phalcon\\Text::upper({})", all),
        "capitalize" => format!("ucwords({})", all),
        "sort" => format!("$this->sort({})", all),
        "json_encode" => format!("json_encode({})", all),
        "json_decode" => format!("json_decode({})", all),
        "format" => format!("sprintf({})", all),
        "abs" => format!("abs({})", all),
        "slice" => format!("$this->slice({})", all),
        "default" => {
            let fallback = args.first().map(String::as_str).unwrap_or("null");
            format!("(empty({}) ? ({}) : ({}))", left, fallback, left)
        }
        "convert_encoding" => format!("$this->convertEncoding({})", all),
        "raw" => left.to_string(),
        _ => return None,
    };
    Some(code)
}

/// Tag helpers that take their arguments as a single parameter array.
const ARRAY_TAG_HELPERS: &[&str] = &[
    "link_to",
    "image",
    "form",
    "submit_button",
    "radio_field",
    "check_field",
    "file_field",
    "hidden_field",
    "password_field",
    "text_area",
    "text_field",
    "email_field",
    "date_field",
    "tel_field",
    "numeric_field",
    "image_input",
];

/// Tag helpers that forward their arguments unchanged.
const TAG_HELPERS: &[&str] = &[
    "stylesheet_link",
    "javascript_include",
    "select",
    "select_static",
    "end_form",
    "get_title",
    "get_doctype",
    "friendly_title",
    "set_title",
    "append_title",
    "prepend_title",
    "set_default",
    "set_doctype",
];

pub(crate) fn function(name: &str, args: &str) -> Option<String> {
    let code = match name {
        "content" | "get_content" => "$this->getContent()".to_string(),
        "partial" => format!("$this->partial({})", args),
        "super" => "''".to_string(),
        "url" => format!("$this->url->get({})", args),
        "static_url" => format!("$this->url->getStatic({})", args),
        "dump" => format!("var_dump({})", args),
        "version" => "Phalcon\\Version::get()".to_string(),
        "version_id" => "Phalcon\\Version::getId()".to_string(),
        _ if ARRAY_TAG_HELPERS.contains(&name) => format!("$this->tag->{}([{}])", camelize(name), args),
        _ if TAG_HELPERS.contains(&name) => format!("$this->tag->{}({})", camelize(name), args),
        _ => return None,
    };
    Some(code)
}

/// `link_to` -> `linkTo`
fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn test(name: &str, subject: &str, args: &[String], negated: bool) -> Option<String> {
    let (eq, not) = if negated { ("!=", "!") } else { ("==", "") };
    let code = match (name, args.first()) {
        ("defined", _) => format!("{}isset({})", not, subject),
        ("empty", _) => format!("{}empty({})", not, subject),
        ("even", _) => format!("((({}) % 2) {} 0)", subject, eq),
        ("odd", _) => format!("((({}) % 2) {} 0)", subject, if negated { "==" } else { "!=" }),
        ("numeric", _) => format!("{}is_numeric({})", not, subject),
        ("scalar", _) => format!("{}is_scalar({})", not, subject),
        ("iterable", _) => format!("{}(is_array({}) || ({}) instanceof Traversable)", not, subject, subject),
        ("sameas", Some(other)) => format!("({}) {} ({})", subject, if negated { "!==" } else { "===" }, other),
        ("divisibleby", Some(by)) => format!("((({}) % ({})) {} 0)", subject, by, eq),
        ("type", Some(ty)) => format!("gettype({}) {} ({})", subject, if negated { "!==" } else { "===" }, ty),
        _ => return None,
    };
    Some(code)
}
