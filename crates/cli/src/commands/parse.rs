//! `minebrain parse` — Run the command grammar over stdin without a game.

use minebrain_agent::{actionable_segment, parse};
use std::io::Read;
use std::path::PathBuf;

pub async fn run(explicit: Option<PathBuf>, raw: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    let text = if raw {
        let config = super::load_config(explicit)?;
        actionable_segment(&input, config.inference.delimiter()).to_string()
    } else {
        input
    };

    let (mut ok, mut rejected) = (0usize, 0usize);
    for result in parse(&text) {
        match result {
            Ok(command) => {
                ok += 1;
                if json {
                    println!("{}", serde_json::to_string(&command)?);
                } else {
                    println!("ok    {command}");
                }
            }
            Err(e) => {
                rejected += 1;
                if json {
                    let value = serde_json::json!({
                        "error": e.kind.to_string(),
                        "line_number": e.line_number,
                        "line": e.line,
                    });
                    println!("{value}");
                } else {
                    println!("error {e}");
                }
            }
        }
    }

    eprintln!("{ok} command(s), {rejected} rejected line(s)");
    Ok(())
}
