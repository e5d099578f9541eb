// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn bool_override(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .global(true)
        .value_name("BOOL")
        .num_args(0..=1)
        .default_missing_value("true")
        .require_equals(true)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("octofarm-installer")
        .version(env!("CARGO_PKG_VERSION"))
        .author("OctoFarm Installer Contributors")
        .about("Keeps an OctoFarm deployment on its latest release")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_name("PATH")
                .help("Configuration file (default: ./octofarm-installer.config.json)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Hide the download progress bar"),
        )
        .arg(
            Arg::new("release-folder")
                .long("release-folder")
                .global(true)
                .value_name("PATH")
                .help("Folder holding one subdirectory per installed release"),
        )
        .arg(bool_override(
            "overwrite",
            "Replace an existing folder of the release being installed",
        ))
        .arg(bool_override(
            "cleanup-archive",
            "Delete the downloaded archive after extraction",
        ))
        .arg(bool_override(
            "prune",
            "Delete all other release folders after a successful install",
        ))
        .arg(bool_override("skip-pm2-checks", "Do not check for (or install) pm2"))
        .arg(bool_override(
            "prereleases",
            "Consider prereleases when looking for the latest release",
        ))
        .arg(
            Arg::new("org")
                .long("org")
                .global(true)
                .help("GitHub organization publishing the releases"),
        )
        .arg(
            Arg::new("repo")
                .long("repo")
                .global(true)
                .help("GitHub repository publishing the releases"),
        )
        .subcommand(
            Command::new("upgrade")
                .about("Install the latest release unless it is already installed (default)"),
        )
        .subcommand(
            Command::new("check")
                .about("Report whether a newer release is available without installing it"),
        )
        .subcommand(
            Command::new("releases").about("List installable releases with their download URL"),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell to generate completions for"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("octofarm-installer.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
