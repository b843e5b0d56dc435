use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use scribe_editor::{Editor, EditorBuilder, EditorResult, Selection};

use super::read_json;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Initial document JSON file
    #[arg(long)]
    pub doc: PathBuf,

    /// Script: a JSON array of steps
    #[arg(long)]
    pub script: PathBuf,

    /// Config file (defaults to scribe.config.json in the working directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Pretty-print the resulting document
    #[arg(long)]
    pub pretty: bool,
}

/// One script entry: run a command, or move the selection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Command {
        command: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    Select {
        select: Selection,
    },
}

/// Outcome of one script step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Applied,
    NotApplicable,
    Failed(String),
}

pub fn parse_script(value: Value) -> Result<Vec<ScriptStep>> {
    serde_json::from_value(value).context("Script must be an array of {command, args} or {select} entries")
}

/// Run one step against the editor
pub fn run_step(editor: &mut Editor, step: &ScriptStep) -> StepOutcome {
    let result = match step {
        ScriptStep::Command { command, args } => editor.try_execute(command, args),
        ScriptStep::Select { select } => select_range(editor, *select).map(|_| true),
    };
    match result {
        Ok(true) => StepOutcome::Applied,
        Ok(false) => StepOutcome::NotApplicable,
        Err(e) => StepOutcome::Failed(e.to_string()),
    }
}

fn select_range(editor: &mut Editor, selection: Selection) -> EditorResult<()> {
    let mut tr = editor.tr();
    tr.set_selection(selection)?;
    editor.dispatch(tr)
}

fn describe(step: &ScriptStep) -> String {
    match step {
        ScriptStep::Command { command, args } if args.is_empty() => command.clone(),
        ScriptStep::Command { command, args } => {
            let args: Vec<String> = args.iter().map(Value::to_string).collect();
            format!("{}({})", command, args.join(", "))
        }
        ScriptStep::Select { select } => format!("select {}..{}", select.anchor(), select.head()),
    }
}

pub fn run(args: RunArgs, cwd: &str) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_file(path)?,
        None => Config::load(cwd)?,
    };
    let mut editor = EditorBuilder::new()
        .config(config.editor.clone())
        .plugins(config.resolve_plugins()?)
        .doc_json(read_json(&args.doc)?)
        .build()?;
    let script = parse_script(read_json(&args.script)?)?;
    debug!(steps = script.len(), "Running script");

    let mut failures = 0;
    for step in &script {
        let label = describe(step);
        match run_step(&mut editor, step) {
            StepOutcome::Applied => eprintln!("   {} {}", "✓".green(), label),
            StepOutcome::NotApplicable => eprintln!("   {} {} (not applicable)", "-".yellow(), label),
            StepOutcome::Failed(message) => {
                failures += 1;
                eprintln!("   {} {}: {}", "✗".red(), label, message);
            }
        }
    }

    let doc = editor.doc().to_json();
    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{}", serde_json::to_string(&doc)?);
    }

    if failures > 0 {
        return Err(anyhow::anyhow!("{} of {} steps failed", failures, script.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn editor() -> Editor {
        EditorBuilder::new()
            .plugins(Config::default().resolve_plugins().unwrap())
            .doc_json(json!({
                "type": "doc",
                "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Hello"}]}]
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_script() {
        let script = parse_script(json!([
            {"command": "insertText", "args": ["x"]},
            {"select": {"type": "text", "anchor": 1, "head": 3}},
            {"command": "undo"}
        ]))
        .unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(
            script[1],
            ScriptStep::Select {
                select: Selection::text(1, 3)
            }
        );
        assert!(parse_script(json!({"command": "undo"})).is_err());
    }

    #[test]
    fn test_run_steps() {
        let mut editor = editor();
        let script = parse_script(json!([
            {"select": {"type": "text", "anchor": 1, "head": 6}},
            {"command": "toggleBold"},
            {"command": "undo"},
            {"command": "redo"},
            {"command": "redo"},
            {"command": "nope"}
        ]))
        .unwrap();
        let outcomes: Vec<_> = script.iter().map(|step| run_step(&mut editor, step)).collect();
        assert_eq!(outcomes[0], StepOutcome::Applied);
        assert_eq!(outcomes[1], StepOutcome::Applied);
        assert_eq!(outcomes[2], StepOutcome::Applied);
        assert_eq!(outcomes[3], StepOutcome::Applied);
        assert_eq!(outcomes[4], StepOutcome::NotApplicable);
        assert!(matches!(outcomes[5], StepOutcome::Failed(_)));

        let strong = editor.schema().mark_type("strong").unwrap();
        assert!(editor.doc().range_has_mark(1, 6, &strong));
    }

    #[test]
    fn test_bad_selection_fails() {
        let mut editor = editor();
        let step = ScriptStep::Select {
            select: Selection::cursor(99),
        };
        assert!(matches!(run_step(&mut editor, &step), StepOutcome::Failed(_)));
    }
}
