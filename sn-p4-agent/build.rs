fn main() {
    // `vendor_ffi` binds the vendor P4 target driver shared by every
    // managed device; the library itself is provided by the deployment
    // environment, not this crate.
    println!("cargo:rustc-link-lib=dylib=snp4");
}
