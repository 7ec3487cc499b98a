// Templating variable substitution for panel query strings
use crate::domain::dashboard::TemplatingVar;

/// Backend-internal ad-hoc filter placeholders, removed from resolved queries.
const RESERVED_PLACEHOLDERS: [&str; 2] = ["${Filters:lucene}", "${Filters}"];

/// Replace `${var:lucene}`, `${var}` and `$__all` with usable values.
pub fn resolve_template(query: &str, vars: &[TemplatingVar]) -> String {
    let mut resolved = query.to_string();

    for var in vars {
        let value = var.current.render();
        resolved = resolved.replace(&format!("${{{}:lucene}}", var.name), &value);
        resolved = resolved.replace(&format!("${{{}}}", var.name), &value);
    }

    resolved = resolved.replace("$__all", "*");

    for placeholder in RESERVED_PLACEHOLDERS {
        resolved = resolved.replace(placeholder, "");
    }

    resolved
}
