mod config;
mod generate_cmd;
mod key_cmds;
mod offline_cmds;
mod render;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use lessonplan_core::gateway::ModelTier;

use generate_cmd::GenerateOptions;

#[derive(Parser)]
#[command(
    name = "lessonplan",
    about = "Generate lesson plans with digital competency annotations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the stored Gemini API key
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Generate a lesson plan from a prompt and/or curriculum files
    Generate {
        /// Generation engine: fast (flash) or smart (pro)
        #[arg(long)]
        model: Option<ModelTier>,
        /// Free-text description (subject, grade, textbook series, ...)
        #[arg(long, short)]
        prompt: Option<String>,
        /// Curriculum file to attach (PDF, Word, images); repeatable
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,
        /// API key for this run (overrides LESSONPLAN_API_KEY and the config file)
        #[arg(long)]
        api_key: Option<String>,
        /// Write the plan as a .docx document to this path
        #[arg(long)]
        export: Option<PathBuf>,
        /// Save the raw model response to this path
        #[arg(long)]
        save_raw: Option<PathBuf>,
        /// Print the grouped plan as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Show math as LaTeX source instead of Unicode
        #[arg(long)]
        raw_math: bool,
    },
    /// Render a saved raw model response as a table
    Render {
        /// File written by `generate --save-raw`
        file: PathBuf,
        /// Print the grouped plan as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Show math as LaTeX source instead of Unicode
        #[arg(long)]
        raw_math: bool,
    },
    /// Export a saved raw model response as a .docx document
    Export {
        /// File written by `generate --save-raw`
        file: PathBuf,
        /// Output path (defaults to KHBD_NLS_HoaHiepAI.docx in the current directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Store the API key in the config file
    Set {
        /// Gemini API key
        key: String,
    },
    /// Show the stored key (masked) and where it comes from
    Show,
    /// Remove the stored key
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Key { command } => {
            key_cmds::run_key_command(command)?;
        }
        Commands::Generate {
            model,
            prompt,
            files,
            api_key,
            export,
            save_raw,
            json,
            raw_math,
        } => {
            let options = GenerateOptions {
                model,
                prompt: prompt.unwrap_or_default(),
                files,
                api_key,
                export,
                save_raw,
                json,
                raw_math,
            };
            generate_cmd::run_generate(options).await?;
        }
        Commands::Render {
            file,
            json,
            raw_math,
        } => {
            offline_cmds::run_render(&file, json, raw_math)?;
        }
        Commands::Export { file, output } => {
            offline_cmds::run_export(&file, output.as_deref())?;
        }
    }

    Ok(())
}
