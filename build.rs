// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("aptrepo")
        .version(env!("CARGO_PKG_VERSION"))
        .author("aptrepo Contributors")
        .about("Build APT repositories from Debian packages")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging (overridden by RUST_LOG)"),
        )
        .subcommand(
            Command::new("build")
                .about("Build a repository from a directory of .deb files")
                .arg(
                    Arg::new("source")
                        .short('s')
                        .long("source")
                        .value_name("DIR")
                        .required(true)
                        .help("Directory containing the .deb files"),
                )
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .value_name("DIR")
                        .required(true)
                        .help("Repository root to create (must not exist)"),
                )
                .arg(
                    Arg::new("distribution")
                        .short('d')
                        .long("distribution")
                        .default_value("devel")
                        .help("Distribution codename"),
                )
                .arg(
                    Arg::new("component")
                        .short('c')
                        .long("component")
                        .default_value("main")
                        .help("Component receiving all packages"),
                )
                .arg(
                    Arg::new("arch")
                        .short('a')
                        .long("arch")
                        .value_name("ARCH")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .default_values(["amd64", "i386"])
                        .help("Architectures to index (comma-separated or repeated)"),
                )
                .arg(Arg::new("origin").long("origin").help("Origin of the distribution"))
                .arg(Arg::new("label").long("label").help("Label of the distribution"))
                .arg(
                    Arg::new("description")
                        .long("description")
                        .help("Description of the distribution"),
                )
                .arg(
                    Arg::new("component_label")
                        .long("component-label")
                        .help("Label of the component"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the build report as JSON"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Show the index stanza of a single .deb file")
                .arg(
                    Arg::new("package_path")
                        .required(true)
                        .help("Path to the package file"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
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

    let man_path = man_dir.join("aptrepo.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
