// build.rs — Expose the compile-time target triple as a rustc env var.
//
// Cargo provides the `TARGET` env var to build scripts, which contains the
// canonical target triple of the launcher itself (e.g., "aarch64-apple-darwin",
// "x86_64-unknown-linux-gnu"). We re-export it as `cargo:rustc-env=TARGET=...`
// so runtime code can access it via `env!("TARGET")` when printing the
// "no compatible binary" diagnostic.

fn main() {
    // Cargo always sets `TARGET` for build scripts.
    let target = std::env::var("TARGET")
        .expect("TARGET env var not set by Cargo. This should never happen in a normal build.");

    println!("cargo:rustc-env=TARGET={target}");
}
