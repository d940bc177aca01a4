use crate::builtins::is_builtin;

/// What a specifier refers to, before any filesystem access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    Builtin,
    Relative,
    Bare,
    Url,
}

pub fn classify_specifier(specifier: &str) -> SpecifierKind {
    if is_builtin(specifier) {
        SpecifierKind::Builtin
    } else if is_relative(specifier) {
        SpecifierKind::Relative
    } else if is_url_like(specifier) {
        SpecifierKind::Url
    } else {
        SpecifierKind::Bare
    }
}

/// `./x`, `../x`, `.`, `..` or an absolute path.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || is_windows_absolute(specifier)
}

/// Has a `scheme:` prefix (`http:`, `data:`, `file:`, unknown `node:` names).
///
/// Single-letter schemes are left alone so `C:\x` is not mistaken for a URL.
pub fn is_url_like(specifier: &str) -> bool {
    let Some((scheme, _)) = specifier.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    scheme.len() >= 2
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_windows_absolute(specifier: &str) -> bool {
    let bytes = specifier.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// A bare specifier split into package name and subpath key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BareSpecifier<'a> {
    /// `lodash` or `@scope/name`
    pub package: &'a str,
    /// `.` for the package root, otherwise `./<rest>`
    pub subpath: String,
}

impl BareSpecifier<'_> {
    pub fn is_root(&self) -> bool {
        self.subpath == "."
    }
}

/// Splits `@scope/name/sub/path` into `@scope/name` and `./sub/path`.
///
/// Returns `None` for malformed names such as a lone `@scope`.
pub fn parse_bare(specifier: &str) -> Option<BareSpecifier<'_>> {
    if specifier.is_empty() || specifier.starts_with('/') || specifier.starts_with('.') {
        return None;
    }
    let name_end = if specifier.starts_with('@') {
        let slash = specifier.find('/')?;
        if slash == 1 {
            return None;
        }
        specifier[slash + 1..].find('/').map_or(specifier.len(), |i| slash + 1 + i)
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };
    let package = &specifier[..name_end];
    if package.ends_with('/') {
        return None;
    }
    let rest = specifier[name_end..].trim_start_matches('/');
    let subpath = if rest.is_empty() { ".".to_string() } else { format!("./{rest}") };
    Some(BareSpecifier { package, subpath })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify_specifier("fs"), SpecifierKind::Builtin);
        assert_eq!(classify_specifier("node:fs"), SpecifierKind::Builtin);
        assert_eq!(classify_specifier("./a"), SpecifierKind::Relative);
        assert_eq!(classify_specifier(".."), SpecifierKind::Relative);
        assert_eq!(classify_specifier("/abs/a.js"), SpecifierKind::Relative);
        assert_eq!(classify_specifier("lodash/fp"), SpecifierKind::Bare);
        assert_eq!(classify_specifier("@scope/pkg"), SpecifierKind::Bare);
        assert_eq!(classify_specifier("https://esm.sh/react"), SpecifierKind::Url);
        assert_eq!(classify_specifier("data:text/javascript,1"), SpecifierKind::Url);
        assert_eq!(classify_specifier("node:unknown"), SpecifierKind::Url);
    }

    #[test]
    fn test_windows_paths_are_not_urls() {
        assert!(!is_url_like("C:\\x\\y.js"));
        assert!(is_relative("C:\\x\\y.js"));
    }

    #[test]
    fn test_parse_bare_plain() {
        let bare = parse_bare("lodash").unwrap();
        assert_eq!(bare.package, "lodash");
        assert!(bare.is_root());

        let bare = parse_bare("lodash/fp/map").unwrap();
        assert_eq!(bare.package, "lodash");
        assert_eq!(bare.subpath, "./fp/map");
    }

    #[test]
    fn test_parse_bare_scoped() {
        let bare = parse_bare("@scope/pkg").unwrap();
        assert_eq!(bare.package, "@scope/pkg");
        assert_eq!(bare.subpath, ".");

        let bare = parse_bare("@scope/pkg/sub").unwrap();
        assert_eq!(bare.package, "@scope/pkg");
        assert_eq!(bare.subpath, "./sub");
    }

    #[test]
    fn test_parse_bare_rejects_malformed() {
        assert!(parse_bare("@scope").is_none());
        assert!(parse_bare("@/pkg").is_none());
        assert!(parse_bare("@scope/").is_none());
        assert!(parse_bare("").is_none());
        assert!(parse_bare("./rel").is_none());
    }
}
