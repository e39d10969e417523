// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("disposal")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Disposal Contributors")
        .about("Compare installed packages with a from-scratch reinstall")
        .subcommand_required(true)
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .visible_alias("silent")
                .action(ArgAction::Count)
                .help("Less diagnostic output; repeat to silence it"),
        )
        .arg(
            Arg::new("config_file")
                .short('c')
                .long("config-file")
                .value_name("FILE")
                .help("Read configuration from this TOML file"),
        )
        .arg(
            Arg::new("option")
                .short('o')
                .long("option")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Override a configuration key"),
        )
        .arg(
            Arg::new("debug_marker")
                .short('m')
                .long("debug-marker")
                .action(ArgAction::SetTrue)
                .help("Trace mark operations"),
        )
        .arg(
            Arg::new("debug_autoinstall")
                .short('i')
                .long("debug-autoinstall")
                .action(ArgAction::SetTrue)
                .help("Trace dependency auto-installation"),
        )
        .arg(
            Arg::new("debug_problemresolver")
                .short('p')
                .long("debug-problemresolver")
                .action(ArgAction::SetTrue)
                .help("Trace the problem resolver"),
        )
        .arg(
            Arg::new("debug_autoremove")
                .short('r')
                .long("debug-autoremove")
                .action(ArgAction::SetTrue)
                .help("Trace the garbage sweep"),
        )
        .subcommand(
            Command::new("scan")
                .about("Compare the installed system with a simulated clean reinstall")
                .arg(
                    Arg::new("no")
                        .long("no")
                        .value_name("FILE")
                        .help("Packages that must not be installed (default: no.txt)"),
                )
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .value_name("FILE")
                        .help("Packages that must be installed (default: yes.txt)"),
                )
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_name("FILE")
                        .help("dpkg status file (default: /var/lib/dpkg/status)"),
                )
                .arg(
                    Arg::new("lists")
                        .long("lists")
                        .value_name("DIR")
                        .help("Directory with APT Packages lists (default: /var/lib/apt/lists)"),
                )
                .arg(
                    Arg::new("cache")
                        .long("cache")
                        .value_name("DB")
                        .help("Read package records from this cache instead of the lists"),
                ),
        )
        .subcommand(
            Command::new("build-cache")
                .about("Cache the package lists in SQLite")
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .value_name("PATH")
                        .help("Database path (default: /var/cache/disposal/packages.db)"),
                )
                .arg(
                    Arg::new("lists")
                        .long("lists")
                        .value_name("DIR")
                        .help("Directory with APT Packages lists (default: /var/lib/apt/lists)"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("disposal.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
