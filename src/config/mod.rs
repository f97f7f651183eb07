// src/config/mod.rs

//! Process-wide configuration for dispatch and view-export behavior.
//!
//! Settings follow the init-then-freeze discipline the registry uses:
//! configure once at startup, before operations begin flowing, then treat the
//! values as frozen. The lock exists so configuration and reads share one
//! static; the crate defines no protocol for reconfiguring mid-computation.

use std::sync::{LazyLock, RwLock};

use crate::core::DataKind;

/// How `invoke` picks the output variant when the caller does not request
/// one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Produce the same variant as the (first) operand. The default.
    Operand,
    /// Always produce the named variant.
    Fixed(DataKind),
}

/// Process-wide data-layer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Output-variant policy applied when a caller passes no explicit
    /// output kind.
    pub default_output: OutputPolicy,
    /// Whether the dispatch fallback path emits its efficiency diagnostic.
    pub fallback_diagnostics: bool,
    /// Whether exported views may be writable. Off by default: in-place
    /// external mutation bypasses representation invariants.
    pub writable_views: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_output: OutputPolicy::Operand,
            fallback_diagnostics: true,
            writable_views: false,
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

/// Snapshot of the current settings.
pub fn current() -> Settings {
    *SETTINGS.read().unwrap_or_else(|e| e.into_inner())
}

/// Applies a configuration change. Intended for process startup, before
/// operations begin flowing.
pub fn configure(apply: impl FnOnce(&mut Settings)) {
    let mut settings = SETTINGS.write().unwrap_or_else(|e| e.into_inner());
    apply(&mut settings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Buffer;
    use num_complex::Complex;

    #[test]
    fn defaults_are_conservative() {
        let settings = Settings::default();
        assert_eq!(settings.default_output, OutputPolicy::Operand);
        assert!(settings.fallback_diagnostics);
        assert!(!settings.writable_views);
    }

    #[test]
    fn writable_views_gate_in_place_mutation() {
        configure(|s| s.writable_views = true);

        let mut buffer = Buffer::adopted(vec![Complex::new(1.0, 0.0); 2], 2).unwrap();
        let view = buffer.export_view(true).unwrap();
        view.write().unwrap()[0] = Complex::new(9.0, 0.0);
        // The owning buffer observes the external mutation.
        assert_eq!(buffer.read()[0], Complex::new(9.0, 0.0));

        configure(|s| s.writable_views = false);
    }
}
