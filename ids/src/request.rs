// request.rs — Request string helpers: library identity and shortening
//
// Requests are `!`-separated loader chains of POSIX-style paths, each part
// optionally carrying a `?query`. Nothing here touches the file system.

/// Shortens absolute identifiers for use in human-facing or hashed output.
pub trait Shorten {
    fn shorten(&self, request: &str) -> String;
}

impl<F> Shorten for F
where
    F: Fn(&str) -> String,
{
    fn shorten(&self, request: &str) -> String {
        self(request)
    }
}

/// Replaces the context directory with `.` and its parent with `..`.
#[derive(Debug, Clone)]
pub struct RequestShortener {
    context: String,
    parent: Option<String>,
}

impl RequestShortener {
    pub fn new(context: &str) -> Self {
        let context = trim_trailing_slash(context).to_string();
        let parent = match context.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => Some(parent.to_string()),
            _ => None,
        };
        RequestShortener { context, parent }
    }
}

impl Shorten for RequestShortener {
    fn shorten(&self, request: &str) -> String {
        if self.context.is_empty() {
            return request.to_string();
        }
        let shortened = replace_dir(request, &self.context, ".");
        match &self.parent {
            Some(parent) => replace_dir(&shortened, parent, ".."),
            None => shortened,
        }
    }
}

/// Express every absolute part of `request` relative to `context`.
///
/// `contextify("/app", "/app/src/a.js")` is `./src/a.js`; paths outside the
/// context climb with `../`. Relative parts and queries pass through.
pub fn contextify(context: &str, request: &str) -> String {
    request
        .split('!')
        .map(|part| contextify_part(context, part))
        .collect::<Vec<_>>()
        .join("!")
}

fn contextify_part(context: &str, part: &str) -> String {
    let (path, query) = match part.find('?') {
        Some(i) => part.split_at(i),
        None => (part, ""),
    };
    if !path.starts_with('/') {
        return part.to_string();
    }
    let rel = relative_path(context, path);
    let rel = if rel.is_empty() {
        ".".to_string()
    } else if rel == ".." || rel.starts_with("../") {
        rel
    } else {
        format!("./{}", rel)
    };
    format!("{}{}", rel, query)
}

fn relative_path(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = std::iter::repeat("..").take(from.len() - common).collect();
    parts.extend(&to[common..]);
    parts.join("/")
}

fn trim_trailing_slash(s: &str) -> &str {
    if s.len() > 1 {
        s.trim_end_matches('/')
    } else {
        s
    }
}

/// Replace `dir` wherever it appears as a whole path: at the start of the
/// input or after a loader, type or whitespace delimiter, and followed by a
/// separator, a loader/query delimiter, or the end of input.
fn replace_dir(input: &str, dir: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for (idx, _) in input.match_indices(dir) {
        let starts_path = match input[..idx].chars().next_back() {
            None => true,
            Some(c) => c == '|' || c == '!' || c.is_whitespace(),
        };
        let ends_path = match input[idx + dir.len()..].chars().next() {
            None => true,
            Some(c) => matches!(c, '/' | '!' | '|' | '?' | ')' | ' '),
        };
        if starts_path && ends_path {
            out.push_str(&input[last..idx]);
            out.push_str(replacement);
            last = idx + dir.len();
        }
    }
    out.push_str(&input[last..]);
    out
}
