use kvsite_types::Manifest;

use crate::error::{RenderError, RenderResult};
use crate::template;

/// Render the worker script for `manifest`, bound to the `namespace` store binding.
///
/// `large_files` is emitted with keys in sorted order and `small_files` in
/// manifest order, so identical inputs give byte-identical scripts. The
/// manifest is validated first; a chunk list with gaps or foreign keys is
/// never emitted.
pub fn render(namespace: &str, manifest: &Manifest) -> RenderResult<String> {
    validate_namespace(namespace)?;
    manifest.validate()?;

    let large_files =
        serde_json::to_string(manifest.large_files()).map_err(|source| RenderError::Encoding {
            field: "large_files",
            source,
        })?;
    let small_files =
        serde_json::to_string(manifest.small_files()).map_err(|source| RenderError::Encoding {
            field: "small_files",
            source,
        })?;

    fill(
        template::WORKER,
        &[
            (template::NAMESPACE, namespace),
            (template::LARGE_FILES, &large_files),
            (template::SMALL_FILES, &small_files),
        ],
    )
}

/// Check that `name` can be emitted verbatim as a JavaScript identifier.
///
/// The namespace is the name of the store binding in the worker's scope, so
/// it is written unquoted.
pub fn validate_namespace(name: &str) -> RenderResult<()> {
    let invalid = |reason| {
        Err(RenderError::InvalidNamespace {
            name: name.to_string(),
            reason,
        })
    };
    let mut chars = name.chars();
    match chars.next() {
        None => return invalid("empty"),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_' || c == '$') => {
            return invalid("must start with a letter, `_` or `$`")
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return invalid("may only contain letters, digits, `_` and `$`");
    }
    Ok(())
}

/// Substitute every placeholder in a single left-to-right pass.
///
/// Substituted values are never rescanned, so data that happens to contain
/// placeholder text is emitted literally.
fn fill(template: &str, values: &[(&'static str, &str)]) -> RenderResult<String> {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut filled = vec![false; values.len()];
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .enumerate()
            .filter_map(|(i, (placeholder, _))| rest.find(placeholder).map(|at| (at, i)))
            .min();
        let Some((at, i)) = next else {
            out.push_str(rest);
            break;
        };
        let (placeholder, value) = values[i];
        out.push_str(&rest[..at]);
        out.push_str(value);
        filled[i] = true;
        rest = &rest[at + placeholder.len()..];
    }

    if let Some(i) = filled.iter().position(|done| !done) {
        return Err(RenderError::UnfilledPlaceholder(values[i].0));
    }
    Ok(out)
}
