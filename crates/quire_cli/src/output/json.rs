//! JSON output formatter

use miette::{IntoDiagnostic, Result};

use super::Outcome;

pub fn output_json(outcomes: &[Outcome]) -> Result<()> {
    let output: Vec<_> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(output) => serde_json::json!({
                "path": o.path,
                "output": output.display().to_string(),
            }),
            Err(failure) => serde_json::json!({
                "path": o.path,
                "error": failure.message,
                "causes": failure.causes,
                "location": failure.location,
            }),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&output).into_diagnostic()?
    );
    Ok(())
}
