use std::{collections::HashMap, ffi::OsStr, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Undefined variable '{0}' at {}", .1+1)]
    UndefinedVar(String, usize),

    #[error("Unclosed brace (found '#{{' at {})", .0+1)]
    UnclosedBrace(usize),
}

/// Expands `#{name}` placeholders. `##` yields a literal `#`.
pub fn expand<V>(template: &str, vars: &HashMap<&str, V>) -> Result<String, TemplateError>
where
    V: AsRef<OsStr>,
{
    let mut res = String::with_capacity(template.len() * 2);
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '#' {
            res.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '#')) => {
                chars.next();
                res.push('#');
            }
            Some((open, '{')) => {
                let name_start = open + 1;
                let Some(len) = template[name_start..].find('}') else {
                    return Err(TemplateError::UnclosedBrace(i))
                };
                let name = &template[name_start..name_start + len];
                let Some(value) = vars.get(name) else {
                    return Err(TemplateError::UndefinedVar(name.to_owned(), i))
                };
                res += &value.as_ref().to_string_lossy();
                // skip past the closing brace
                while let Some((j, _)) = chars.next() {
                    if j == name_start + len {
                        break;
                    }
                }
            }
            _ => res.push(c),
        }
    }
    Ok(res)
}

/// Variables available to the compile command for one `source -> output` step.
pub fn compile_vars<'a>(source: &'a Path, output: &'a Path) -> HashMap<&'static str, &'a OsStr> {
    let mut m: HashMap<_, &OsStr> = HashMap::new();
    m.insert("source", source.as_os_str());
    m.insert("output", output.as_os_str());
    m.insert(
        "sourceDir",
        source.parent().unwrap_or(Path::new(".")).as_os_str(),
    );
    m.insert(
        "sourceStem",
        source.file_stem().unwrap_or(OsStr::new("UNDEFINED_FILE_STEM")),
    );
    m
}
