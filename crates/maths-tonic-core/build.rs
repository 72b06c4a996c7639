/// Builds the gRPC client and server code for the `maths.proto` definition
/// using `tonic-prost-build`.
///
/// The generated bindings land in `OUT_DIR` together with an encoded file
/// descriptor set (`maths_descriptor.bin`), which the server registers with the
/// gRPC reflection service.
///
/// # Files and Paths
///
/// - Proto file: `proto/maths.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails; both abort the build.
///
/// # Output
///
/// Generated code is exposed through [`proto`]:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("maths");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("maths_descriptor.bin");

    println!("cargo:rerun-if-changed=proto/maths.proto");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/maths.proto"], &["proto"])
        .unwrap();
}
