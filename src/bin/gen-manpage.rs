//! Man page generator for radc
//!
//! Writes `radc.1` plus one `radc-<subcommand>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(man: clap_mangen::Man, output_path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(output_path, buffer)?;
    println!("Man page generated at: {}", output_path.display());
    Ok(())
}

fn main() -> std::io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let source = format!("radc {}", env!("CARGO_PKG_VERSION"));
    let cmd = cli::Cli::command();

    for sub in cmd.get_subcommands() {
        let title = format!("radc-{}", sub.get_name());
        let man = clap_mangen::Man::new(sub.clone())
            .title(title.to_uppercase())
            .source(source.clone());
        render(man, &output_dir.join(format!("{}.1", title)))?;
    }

    let main_page = output_dir.join("radc.1");
    render(clap_mangen::Man::new(cmd).source(source), &main_page)?;

    println!("\nTo view the man page:");
    println!("  man -l {}", main_page.display());

    Ok(())
}
