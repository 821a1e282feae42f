use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Mirrors `assets/` (the avatar and decor models) next to the build output so
/// that the native binary finds them regardless of the working directory.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[&assets_src], &out_dir, &copy_options)?;

    println!(
        "cargo:rustc-env=AVATAR_VIEWER_ASSET_DIR={}",
        out_dir.join("assets").display()
    );
    Ok(())
}
