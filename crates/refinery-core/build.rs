//! Build script for refinery-core
//!
//! Checks the toolchain before compilation:
//! - Minimum Rust version (let-else and `Option::is_some_and` need 1.70.0+)

fn main()
{
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        assert!(
            rustc_version >= min_rust_version,
            "refinery-core requires Rust {min_rust_version} or newer, found {rustc_version}"
        );
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }
}
