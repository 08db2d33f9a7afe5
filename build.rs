// ABOUTME: Build script for compile-time validation of enabled features
// ABOUTME: Warns when the binary is built without any chat platform

fn main() {
    println!("cargo::rerun-if-changed=build.rs");

    // Cargo exposes enabled features to build scripts as CARGO_FEATURE_* env vars
    let has_discord = std::env::var_os("CARGO_FEATURE_DISCORD").is_some();

    if !has_discord {
        println!(
            "cargo::warning=No platform features enabled. \
             Enable at least one: discord. `dragme run` will refuse to start."
        );
    }
}
