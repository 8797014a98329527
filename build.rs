//! Build script for the HdSome Tauri app.
//!
//! Tauri codegen only runs for the `desktop` feature; the core library
//! builds without any host toolchain.

fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
