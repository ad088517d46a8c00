use anyhow::Result;
use chatwidget_core::{ChatError, ChatSession, Config, Pacing, ValidationError};
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{load_corpus, print_reply, print_warning};

/// Line-oriented chat loop. One message is resolved at a time; input is not
/// read again until the reply has been printed.
pub async fn run(config: &Config, corpus_path: Option<PathBuf>, pacing: Pacing) -> Result<()> {
    let mut corpus = load_corpus(corpus_path.as_deref()).await?;
    let mut session = ChatSession::new(config).with_pacing(pacing);

    println!("{}", "💬 Chat widget".bold().blue());
    println!(
        "{}",
        "Commands: /clear history, /reload corpus, /quit".dimmed()
    );
    if !session.has_completer() {
        println!("{}", "Completion service disabled; using corpus and canned replies".dimmed());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bold().cyan());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_history();
                println!("{}", "History cleared".dimmed());
                continue;
            }
            "/reload" => {
                match load_corpus(corpus_path.as_deref()).await {
                    Ok(fresh) => {
                        corpus = fresh;
                        println!(
                            "{}",
                            format!(
                                "Corpus reloaded: {} faqs, {} knowledge entries",
                                corpus.faqs.len(),
                                corpus.knowledge.len()
                            )
                            .dimmed()
                        );
                    }
                    Err(e) => println!("{}", format!("⚠️  {}", e).yellow()),
                }
                continue;
            }
            _ => {}
        }

        match session.resolve(&line, &corpus).await {
            Ok(outcome) => {
                if !outcome.delay.is_zero() {
                    print!("{}", "Thinking...".dimmed());
                    std::io::stdout().flush()?;
                    tokio::time::sleep(outcome.delay).await;
                    print!("\r{}\r", " ".repeat(11));
                }
                print_reply(&outcome);
            }
            // blank lines are ignored silently
            Err(ChatError::Validation(ValidationError::Empty)) => {}
            Err(warning) => print_warning(&warning),
        }
    }

    Ok(())
}
