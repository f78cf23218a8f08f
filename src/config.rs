//! Conversion policy configuration
//!
//! The build default comes from the `strict` feature. Each thread may override
//! it at runtime, which lets one test binary exercise both regimes.

use std::cell::Cell;

/// What a type-mismatched conversion does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Fail with [`ValueError::TypeMismatch`](crate::ValueError::TypeMismatch)
    Strict,
    /// Return the documented zero value (`false`, `0`, `0.0`, empty string)
    Permissive,
}

impl MismatchPolicy {
    /// Policy selected by the crate features at build time
    #[inline]
    pub const fn build_default() -> Self {
        if cfg!(feature = "strict") {
            MismatchPolicy::Strict
        } else {
            MismatchPolicy::Permissive
        }
    }

    #[inline]
    pub const fn is_strict(self) -> bool {
        matches!(self, MismatchPolicy::Strict)
    }
}

impl Default for MismatchPolicy {
    fn default() -> Self {
        mismatch_policy()
    }
}

thread_local! {
    static POLICY_OVERRIDE: Cell<Option<MismatchPolicy>> = const { Cell::new(None) };
}

/// Current policy for this thread
pub fn mismatch_policy() -> MismatchPolicy {
    POLICY_OVERRIDE
        .with(Cell::get)
        .unwrap_or(MismatchPolicy::build_default())
}

/// Override the policy for this thread, returning the previous override
pub fn set_mismatch_policy(policy: Option<MismatchPolicy>) -> Option<MismatchPolicy> {
    POLICY_OVERRIDE.with(|cell| cell.replace(policy))
}
