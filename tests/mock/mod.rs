//! Re-exports `std` or `loom` depending on the `check-loom` feature.

#[cfg(not(feature = "check-loom"))]
pub use std::*;

#[cfg(feature = "check-loom")]
pub use loom::*;

/// Runs `f` under `loom::model` if compiled with the `check-loom` feature,
/// and directly otherwise.
pub fn model<F: Fn() + Sync + Send + 'static>(f: F) {
    cfg_if::cfg_if! {
        if #[cfg(feature = "check-loom")] {
            loom::model(f)
        } else {
            f()
        }
    }
}
