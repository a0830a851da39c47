//! Build backend blocks
//!
//! Each supported backend renders a short block naming it, plus the native
//! tools the backend drives that no requirement already brought in.

use crate::domain::BuildBackend;
use std::collections::BTreeSet;

/// Native tools a backend invokes during the build
pub fn implied_tools(backend: &BuildBackend) -> &'static [&'static str] {
    match backend {
        BuildBackend::Maturin => &["rust"],
        BuildBackend::MesonPython => &["meson", "ninja", "pkgconfig"],
        BuildBackend::ScikitBuildCore
        | BuildBackend::ScikitBuild
        | BuildBackend::PyBuildCmake
        | BuildBackend::Cmeel => &["cmake", "ninja"],
        _ => &[],
    }
}

/// Lines of the backend block, without indentation
///
/// `present` holds the native build tools the dependency sections already
/// declare; those are not repeated.
pub fn backend_block(backend: Option<&BuildBackend>, present: &BTreeSet<String>) -> Vec<String> {
    let Some(backend) = backend else {
        return vec![
            "# FIXME: the build backend could not be determined (no sdist inspected)".to_string(),
            "# FIXME: add build dependencies and override build phases if needed".to_string(),
        ];
    };

    if let BuildBackend::Other(name) = backend {
        return vec![
            format!("# FIXME: unsupported build backend \"{}\"", name),
            "# FIXME: add build dependencies and override build phases if needed".to_string(),
        ];
    }

    let mut lines = vec![format!("# Build backend: {}", backend)];
    lines.extend(
        implied_tools(backend)
            .iter()
            .filter(|tool| !present.contains(**tool))
            .map(|tool| format!("depends_on(\"{}\", type=\"build\")", tool)),
    );
    lines
}
