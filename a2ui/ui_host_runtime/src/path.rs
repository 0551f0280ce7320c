pub const ROOT_PATH: &str = "/";

const SELF_PATH: &str = ".";

/// `.` is the context itself and a leading `/` is returned untouched; anything
/// else is appended to the context. No escaping, no `..` traversal.
pub fn resolve_path(path: &str, context_path: Option<&str>) -> String {
    let context = context_path.unwrap_or(ROOT_PATH);

    if path == SELF_PATH {
        return context.to_string();
    }

    if path.starts_with('/') {
        return path.to_string();
    }

    join(context, path)
}

pub fn join(base: &str, tail: &str) -> String {
    let joined: Vec<&str> = segments(base).chain(segments(tail)).collect();
    from_segments(&joined)
}

/// Collapses repeated slashes and `.` segments; always yields a leading `/`.
pub fn normalize(path: &str) -> String {
    let parts: Vec<&str> = segments(path).collect();
    from_segments(&parts)
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != SELF_PATH)
}

fn from_segments(parts: &[&str]) -> String {
    if parts.is_empty() {
        return ROOT_PATH.to_string();
    }

    let mut out = String::with_capacity(parts.iter().map(|part| part.len() + 1).sum());
    for part in parts {
        out.push('/');
        out.push_str(part);
    }
    out
}
