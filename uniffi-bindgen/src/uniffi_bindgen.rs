//! Generates the Kotlin and Swift bindings for the `scakit` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
