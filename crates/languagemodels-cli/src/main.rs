use std::path::PathBuf;

use clap::{Parser, Subcommand};
use languagemodels::{Config, ExecutionMode, LanguageModels};

mod demo;

#[derive(Parser, Debug)]
#[command(name = "languagemodels", version, about = "Pretrained language models from the command line")]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the ONNX model exports.
    #[arg(long, global = true, env = "LANGUAGEMODELS_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// TextSynth API key. When set, instructions run on the hosted API.
    ///
    /// Read from `TEXTSYNTH_API_KEY`; the older `textsynth-api-key` variable
    /// name is not consulted.
    #[arg(long, global = true, env = "TEXTSYNTH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Complete an instruction prompt.
    Generate { prompt: String },
    /// Reply to one chat message.
    Chat { message: String },
    /// Pick the document most similar to a query.
    Search {
        #[arg(short, long)]
        query: String,
        #[arg(required = true)]
        docs: Vec<String>,
        /// Print every document with its score.
        #[arg(long)]
        ranked: bool,
    },
    /// Print the Wikipedia summary for a topic.
    Wiki { topic: String },
    /// Extract the answer to a question from a context passage.
    Answer {
        #[arg(short, long)]
        question: String,
        #[arg(short, long)]
        context: String,
    },
    /// Classify text as positive or not.
    Sentiment { text: String },
    /// Interactive chat session over stdin.
    Demo,
}

/// Build the runtime config: file (or defaults), then flag/env overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    if cli.api_key.is_some() {
        config.mode = ExecutionMode::from_api_key(cli.api_key.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    tracing::info!(mode = config.mode.as_str(), "languagemodels v{}", env!("CARGO_PKG_VERSION"));
    let lm = LanguageModels::new(config);

    match cli.command {
        Command::Generate { prompt } => println!("{}", lm.generate_instruct(&prompt).await?),
        Command::Chat { message } => println!("{}", lm.chat(&message).await?),
        Command::Search {
            query,
            docs,
            ranked,
        } => {
            if ranked {
                for (idx, score) in lm.rank_documents(&query, docs.as_slice()).await? {
                    println!("{score:>8.4}  {}", docs[idx]);
                }
            } else {
                println!("{}", lm.search(&query, docs.as_slice()).await?);
            }
        }
        Command::Wiki { topic } => match lm.get_wiki(&topic).await? {
            Some(summary) => println!("{summary}"),
            None => eprintln!("No article found for {topic:?}"),
        },
        Command::Answer { question, context } => {
            println!("{}", lm.extract_answer(&question, &context).await?)
        }
        Command::Sentiment { text } => {
            let label = if lm.is_positive(&text).await? {
                "positive"
            } else {
                "negative"
            };
            println!("{label}");
        }
        Command::Demo => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            demo::run(&lm, stdin, &mut std::io::stdout()).await?;
        }
    }

    Ok(())
}
