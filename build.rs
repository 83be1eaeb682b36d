fn main() {
    // cfg!(target_os) in a build script describes the host, so read the target instead
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    // Link against macOS frameworks used for USB device notifications
    if target_os == "macos" {
        println!("cargo:rustc-link-lib=framework=IOKit");
        println!("cargo:rustc-link-lib=framework=CoreFoundation");
    }
}
