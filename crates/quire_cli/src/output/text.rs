//! Text output formatter

use super::Outcome;

pub fn output_text(outcomes: &[Outcome]) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(output) => println!("{} -> {}", outcome.path, output.display()),
            Err(failure) => {
                println!("\n{}:", outcome.path);
                println!("  {}", failure.message.replace('\n', "\n  "));
                for cause in &failure.causes {
                    println!("  caused by: {}", cause.replace('\n', "\n  "));
                }
            }
        }
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    println!();
    println!(
        "Compiled {} templates, {} failed",
        outcomes.len() - failed,
        failed
    );
}
