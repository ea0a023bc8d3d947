use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=DEM_EPOCH_LENGTH_MS");

    let out_dir = env::var("OUT_DIR").expect("no out directory");
    let dest = Path::new(&out_dir).join("build_constants.rs");

    let mut file = File::create(&dest).expect("could not create file");

    let millis: u64 = option_env!("DEM_EPOCH_LENGTH_MS")
        .map_or(Ok(40), str::parse)
        .expect("failed to parse env variable DEM_EPOCH_LENGTH_MS");

    if millis == 0 {
        panic!("invalid DEM_EPOCH_LENGTH_MS value (0)");
    }

    write!(&mut file, "const DEFAULT_EPOCH_LENGTH_MS: u64 = {};", millis)
        .expect("could not write to file");
}
