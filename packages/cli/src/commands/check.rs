use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use scribe_editor::EditorBuilder;
use scribe_model::Node;

use super::read_json;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document JSON file to validate
    #[arg(long)]
    pub doc: PathBuf,

    /// Config file (defaults to scribe.config.json in the working directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_file(path)?,
        None => Config::load(cwd)?,
    };
    let editor = EditorBuilder::new()
        .config(config.editor.clone())
        .plugins(config.resolve_plugins()?)
        .build()?;

    let json = read_json(&args.doc)?;
    let doc = Node::from_json(editor.schema(), &json)?;
    doc.check()?;

    let mut nodes = 0;
    doc.descendants(&mut |_, _, _, _| {
        nodes += 1;
        true
    });
    println!(
        "{} {} ({} nodes, {} positions)",
        "✓".green(),
        args.doc.display(),
        nodes,
        doc.content_size()
    );
    Ok(())
}
