//! Distribution crate for `scakit-core`, built as the static and dynamic
//! libraries the Swift and Kotlin packages link against.

pub use scakit_core::*;

uniffi::setup_scaffolding!("scakit");
