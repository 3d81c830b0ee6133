//! `pagepress doctor` — check the environment and diagnose issues.

use crate::renderer::chromium::find_chromium;
use anyhow::Result;

pub async fn run() -> Result<()> {
    println!("pagepress doctor");
    println!("----------------");

    match find_chromium() {
        Some(path) => println!("  Chromium: {}", path.display()),
        None => {
            println!("  Chromium: NOT FOUND");
            println!("    Install Chrome/Chromium, or set PAGEPRESS_CHROMIUM_PATH.");
        }
    }

    match std::env::var("PAGEPRESS_CHROMIUM_PATH") {
        Ok(p) => println!("  PAGEPRESS_CHROMIUM_PATH: {p}"),
        Err(_) => println!("  PAGEPRESS_CHROMIUM_PATH: (unset)"),
    }

    Ok(())
}
