#[cfg(not(feature = "bpf"))]
fn main() {}

#[cfg(feature = "bpf")]
fn main() {
    bpf::readlat();
}

#[cfg(feature = "bpf")]
mod bpf {
    use libbpf_cargo::SkeletonBuilder;
    use std::env;
    use std::path::PathBuf;

    pub fn readlat() {
        const SRC: &str = "src/probe/mod.bpf.c";

        let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR must be set"))
            .join("readlat.bpf.rs");

        SkeletonBuilder::new()
            .source(SRC)
            .build_and_generate(&out)
            .unwrap();
        println!("cargo:rerun-if-changed={SRC}");
    }
}
