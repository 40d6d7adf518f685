/// Expand `%VAR%`, `${VAR}`, `$VAR` and a leading `~` using the process environment
pub fn expand_env_vars(path: &str) -> String {
    expand_with(path, |name| std::env::var(name).ok())
}

/// Expand variables with an explicit lookup.
///
/// Unknown `%VAR%` and `$VAR` references are left in place; unknown `${VAR}`
/// references expand to nothing. A lone `%` (as in EVTX channel file names
/// like `...%4Operational.evtx`) is kept verbatim.
pub fn expand_with<F>(path: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let home = lookup("HOME").or_else(|| lookup("USERPROFILE"));
    let mut result = match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            format!("{}{}", home, rest)
        }
        _ => path.to_string(),
    };

    if result.contains('%') {
        result = expand_windows(&result, &lookup);
    }
    if result.contains('$') {
        result = expand_unix(&result, &lookup);
    }
    result
}

fn expand_windows<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if is_var_name(&after[..end]) => match lookup(&after[..end]) {
                Some(value) => {
                    out.push_str(&value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            },
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn expand_unix<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                rest = &braced[end + 1..];
                continue;
            }
        }

        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];
        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => {
                out.push('$');
                out.push_str(name);
            }
        }
        rest = &after[name_len..];
    }
    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '(' || c == ')')
}
