//! Package name conversions between PyPI and Spack

use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("Invalid regex"));

/// Spack packages whose upstream name already starts with `py-` yet still
/// carry the prefix
const DOUBLE_PREFIXED: &[&str] = &["py-cpuinfo", "py-tes", "py-spy"];

/// PEP 503 normalization: lowercase with separator runs collapsed to `-`
pub fn normalize_name(name: &str) -> String {
    SEPARATOR_RUN
        .replace_all(name.trim(), "-")
        .to_ascii_lowercase()
}

/// Spack package name for a PyPI project
pub fn spack_name(pypi_name: &str) -> String {
    let normalized = normalize_name(pypi_name);
    if normalized == "python" {
        return normalized;
    }
    if normalized.starts_with("py-") && !DOUBLE_PREFIXED.contains(&normalized.as_str()) {
        return normalized;
    }
    format!("py-{}", normalized)
}

/// Python class name Spack derives from a package name
pub fn class_name(spack_name: &str) -> String {
    let mut class: String = spack_name
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if class.starts_with(|c: char| c.is_ascii_digit()) {
        class.insert(0, '_');
    }
    class
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Flask_SQLAlchemy"), "flask-sqlalchemy");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("a-._b"), "a-b");
    }

    #[test]
    fn test_spack_name() {
        assert_eq!(spack_name("requests"), "py-requests");
        assert_eq!(spack_name("Python"), "python");
        assert_eq!(spack_name("py-cpuinfo"), "py-py-cpuinfo");
        assert_eq!(spack_name("py_spy"), "py-py-spy");
        assert_eq!(spack_name("py-ubjson"), "py-ubjson");
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("py-foo-bar"), "PyFooBar");
        assert_eq!(class_name("py-3to2"), "Py3to2");
        assert_eq!(class_name("3proxy"), "_3proxy");
    }
}
