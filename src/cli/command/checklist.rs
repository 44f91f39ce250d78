use std::fmt::Write;

use anyhow::Result;

use crate::{
    checklist::{findings, read_document, ChecklistDocument, ChecklistStore},
    cli::{create_spinner, ChecklistAction},
    config::Config,
    pipeline::assess_path,
};

/// Runs one checklist action. Returns the text to print.
pub fn checklist(action: &ChecklistAction, config: &Config) -> Result<String> {
    let store = ChecklistStore::new(&config.checklist);

    match action {
        ChecklistAction::Show => Ok(render(&store.load()?)),
        ChecklistAction::Update { updates } => {
            let updates = read_document(updates)?;
            store.update(&updates)?;
            Ok(format!("Checklist saved to `{}`", store.path().display()))
        }
        ChecklistAction::Reset => {
            store.reset()?;
            Ok(format!("Checklist `{}` reset", store.path().display()))
        }
        ChecklistAction::Fill { file } => {
            config.validate()?;
            let bar = create_spinner(format!("Assessing {}...", file.display()));
            let report = assess_path(file, config)?;
            bar.finish_with_message(format!("{} assessed", file.display()));

            store.update(&findings(&report))?;
            Ok(format!("Checklist saved to `{}`", store.path().display()))
        }
    }
}

fn render(document: &ChecklistDocument) -> String {
    if document.is_empty() {
        return "Checklist is empty".to_string();
    }
    let mut text = String::new();
    for (name, fields) in document.sections() {
        let _ = writeln!(text, "[{}]", name);
        for (field, value) in fields {
            let _ = writeln!(text, "  {}: {}", field, value);
        }
    }
    text
}

// -- Tests -------------------------------------------------------------------
