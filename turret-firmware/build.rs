//! Build script for turret-firmware
//!
//! - Sets up linker search paths and scripts for memory.x
//! - Validates turret.toml at compile time and embeds it as postcard bytes

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use turret_core::TurretConfig;

/// Top-level keys accepted in turret.toml
const KNOWN_KEYS: &[&str] = &[
    "tick_interval_ms",
    "yaw",
    "tilt",
    "sensors",
    "jog",
    "calibration",
    "trigger",
    "safety",
];

fn main() {
    setup_linker();
    embed_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate turret.toml and write the binary config to OUT_DIR
fn embed_config() {
    println!("cargo:rerun-if-changed=turret.toml");

    let config_path = Path::new("turret.toml");
    let config = if config_path.exists() {
        load_config(config_path)
    } else {
        println!("cargo:warning=turret.toml not found, embedding default configuration");
        TurretConfig::default()
    };

    if let Err(e) = config.validate() {
        fail(
            "Invalid configuration in turret.toml",
            &[format!("{:?}", e), "See the comments in turret.toml for valid ranges".into()],
        );
    }

    let bytes = match postcard::to_stdvec(&config) {
        Ok(bytes) => bytes,
        Err(e) => fail("Failed to serialize configuration", &[e.to_string()]),
    };

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("turret_config.bin"), bytes).unwrap();

    println!("cargo:warning=turret.toml validated successfully");
}

fn load_config(path: &Path) -> TurretConfig {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read turret.toml", &[e.to_string()]),
    };

    // Syntax and unknown sections first, so typos are not silently defaulted
    let value: toml::Table = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in turret.toml",
            &e.to_string().lines().map(String::from).collect::<Vec<_>>(),
        ),
    };
    let unknown: Vec<String> = value
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|key| format!("Unknown key '{}'", key))
        .collect();
    if !unknown.is_empty() {
        fail("Unknown keys in turret.toml", &unknown);
    }

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => fail(
            "Invalid value in turret.toml",
            &e.to_string().lines().map(String::from).collect::<Vec<_>>(),
        ),
    }
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.clone()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
