//! `{name}` placeholder substitution for short names, descriptions and messages.

use crate::error::{CheckError, Result};

use super::Parameters;

/// Substitute every `{key}` in `template` with the parameter's text.
///
/// `{{` and `}}` produce literal braces. A placeholder naming a parameter
/// that is not present is a parameter error.
pub fn render(template: &str, params: &Parameters) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    key.push(c);
                }
                if !closed {
                    return Err(CheckError::Parameter(format!(
                        "unterminated placeholder in template: {:?}",
                        template
                    )));
                }
                let value = params.text(key.trim()).ok_or_else(|| {
                    CheckError::Parameter(format!(
                        "template {:?} references undefined parameter '{}'",
                        template,
                        key.trim()
                    ))
                })?;
                out.push_str(&value);
            }
            '}' => {
                return Err(CheckError::Parameter(format!(
                    "single '}}' in template: {:?}",
                    template
                )));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
