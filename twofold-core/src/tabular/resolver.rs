/*!
Format resolution and option translation.

Resolution reconciles two signals: the format inferred from the path suffix
and the format the caller named explicitly. [`ConflictPolicy`] decides what
happens when they disagree. Everything here runs before any storage access.
*/

use super::format::{Format, FormatHint};
use super::registry::{self, TabularBackend};
use crate::{BackendOptions, FilePath, Result, TwofoldError};
use tracing::debug;

/// Name of the logical column allowlist accepted by `load`
pub const COLUMNS_OPTION: &str = "columns";

/// What to do when the explicit format and the suffix disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail with [`TwofoldError::ConflictingFormat`]
    Strict,
    /// Use the explicit format
    Permissive,
}

impl ConflictPolicy {
    pub fn allows_conflict(self) -> bool {
        matches!(self, ConflictPolicy::Permissive)
    }
}

/// Format hint from the path suffix, if any
pub fn infer_format(filepath: &FilePath) -> Option<FormatHint> {
    FormatHint::from_suffix(&filepath.suffix())
}

/// Pick the effective hint from the inferred and explicit ones
pub fn combine(
    inferred: Option<FormatHint>,
    explicit: Option<FormatHint>,
    policy: ConflictPolicy,
) -> Result<FormatHint> {
    match (inferred, explicit) {
        (None, Some(explicit)) => Ok(explicit),
        (Some(inferred), None) => Ok(inferred),
        (Some(inferred), Some(explicit)) if inferred == explicit => Ok(explicit),
        (Some(inferred), Some(explicit)) => {
            if policy.allows_conflict() {
                debug!(inferred = %inferred, provided = %explicit, "Explicit format overrides file extension");
                Ok(explicit)
            } else {
                Err(TwofoldError::ConflictingFormat {
                    inferred: inferred.name,
                    provided: explicit.name,
                })
            }
        }
        (None, None) => Err(TwofoldError::FormatUnresolvable),
    }
}

/// Resolve the effective hint for a call without validating it
pub fn resolve_hint(
    filepath: &FilePath,
    explicit: Option<&str>,
    policy: ConflictPolicy,
) -> Result<FormatHint> {
    combine(infer_format(filepath), explicit.map(FormatHint::explicit), policy)
}

/// Resolve and validate the effective format for a call
pub fn resolve_format(
    filepath: &FilePath,
    explicit: Option<&str>,
    policy: ConflictPolicy,
) -> Result<Format> {
    resolve_hint(filepath, explicit, policy)?.validate()
}

/// Resolve the backend serving a call
pub fn resolve_backend(
    filepath: &FilePath,
    explicit: Option<&str>,
    policy: ConflictPolicy,
) -> Result<&'static dyn TabularBackend> {
    let hint = resolve_hint(filepath, explicit, policy)?;
    let backend = registry::resolve_adapter(&hint.name)?;
    debug!(path = %filepath, format = %backend.format(), ?policy, "Resolved tabular format");
    Ok(backend)
}

/// Move the logical column allowlist into the backend's own option key
///
/// Fails with [`TwofoldError::ConflictingOptions`] when the caller already
/// filled that key in `options`.
pub fn translate_columns(
    backend: &dyn TabularBackend,
    columns: Option<&[&str]>,
    mut options: BackendOptions,
) -> Result<BackendOptions> {
    let Some(columns) = columns else {
        return Ok(options);
    };
    let native = backend.column_selector();
    if options.contains_key(native) {
        return Err(TwofoldError::ConflictingOptions {
            logical: COLUMNS_OPTION,
            native,
        });
    }
    options.insert(native, columns.to_vec());
    Ok(options)
}
