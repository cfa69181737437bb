use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use config::{PrefixEdit, SettingsManager, SettingsStore};
use core_orchestrator::{
    AssistantPlugin, CommandId, CommandOutcome, EntryKind, ImageForm, KeyEvent,
};
use core_types::AudioClip;
use provider_openai::OpenAiClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod host;
mod settings_cmd;

use host::{ScratchDocument, TerminalHost};
use settings_cmd::{parse_role, parse_setting, prefix_change, render_settings};

const LOG_FILE_PREFIX: &str = "assistant.log";
const DEFAULT_LOG_FILTER: &str = "info,assistant_cli=debug,core_orchestrator=debug";

#[derive(Parser)]
#[command(name = "assistant")]
#[command(about = "LLM chat, prompts, images and transcription for a notes vault", long_about = None)]
struct Cli {
    /// Directory holding settings.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Vault root that generated files are written into
    #[arg(long, global = true, default_value = ".")]
    vault: PathBuf,

    /// Mirror log events to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Interactive chat; `/copy N` copies an entry, `/quit` leaves
    Chat,
    /// One-shot prompt whose answer is written into the scratch note
    Prompt {
        text: String,
        /// Text treated as the current editor selection
        #[arg(long, default_value = "")]
        selection: String,
    },
    /// Generate images from a prompt
    Image {
        prompt: String,
        #[arg(long, default_value = "1024x1024")]
        size: String,
        #[arg(long, default_value = "1")]
        count: String,
        /// Download every image into the image folder
        #[arg(long)]
        save: bool,
    },
    /// Transcribe an audio file
    Transcribe {
        file: PathBuf,
        #[arg(long, default_value = "audio/webm")]
        mime: String,
    },
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(clap::Subcommand)]
enum SettingsCommands {
    /// Print the current settings
    Show,
    /// Set one field, e.g. `set maxTokens 32`
    Set { field: String, value: String },
    /// Edit the chat or prompt prefix list
    Prefix {
        /// `chat` or `prompt`
        list: String,
        #[command(subcommand)]
        op: PrefixOp,
    },
}

#[derive(clap::Subcommand)]
enum PrefixOp {
    Add,
    Remove { index: usize },
    Toggle { index: usize },
    Role { index: usize, role: String },
    Content { index: usize, content: String },
}

impl PrefixOp {
    fn into_edit(self) -> Result<PrefixEdit> {
        Ok(match self {
            PrefixOp::Add => PrefixEdit::Add,
            PrefixOp::Remove { index } => PrefixEdit::Remove { index },
            PrefixOp::Toggle { index } => PrefixEdit::Toggle { index },
            PrefixOp::Role { index, role } => PrefixEdit::SetRole {
                index,
                role: parse_role(&role)?,
            },
            PrefixOp::Content { index, content } => PrefixEdit::SetContent { index, content },
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.push("ai-assistant");
    let _log_guard = init_logging(&data_dir.join("logs"), cli.verbose);

    if let Err(err) = run(cli).await {
        error!("command failed: {err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = match cli.config_dir {
        Some(dir) => SettingsStore::from_dir(dir),
        None => SettingsStore::from_default_location()?,
    };
    let settings = Arc::new(SettingsManager::open(store)?);

    let selection = match &cli.command {
        Commands::Prompt { selection, .. } => selection.clone(),
        _ => String::new(),
    };
    let document = Arc::new(ScratchDocument::with_selection(selection));
    let host = Arc::new(TerminalHost::new(cli.vault, document));
    let mut plugin = AssistantPlugin::new(
        settings.clone(),
        Arc::new(OpenAiClient::new()),
        host.clone(),
    );
    plugin.on_load();
    info!(commands = host.commands().len(), "terminal host ready");

    let result = match cli.command {
        Commands::Chat => chat(&mut plugin).await,
        Commands::Prompt { text, .. } => prompt(&mut plugin, &host, text).await,
        Commands::Image {
            prompt,
            size,
            count,
            save,
        } => image(&mut plugin, ImageForm { prompt, size, count }, save).await,
        Commands::Transcribe { file, mime } => transcribe(&mut plugin, &file, mime).await,
        Commands::Settings(command) => settings_command(&settings, command),
    };
    plugin.on_unload();
    result
}

async fn chat(plugin: &mut AssistantPlugin) -> Result<()> {
    let meta_key = plugin.context().settings.read(|settings| settings.meta_key);
    let panel = plugin.activate_chat_view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if let Some(rest) = line.strip_prefix("/copy") {
            let copied = rest
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .is_some_and(|index| panel.copy_entry(index));
            if !copied {
                eprintln!("no entry `{}`", rest.trim());
            }
            continue;
        }

        panel.set_input(line);
        if !panel.handle_key(&KeyEvent::enter().with_modifier(meta_key)).await {
            continue;
        }
        if let Some(entry) = panel.history().last().filter(|e| e.kind == EntryKind::Response) {
            println!("[{}] {}", entry.timestamp_label(), entry.content);
        }
    }
    Ok(())
}

async fn prompt(plugin: &mut AssistantPlugin, host: &TerminalHost, text: String) -> Result<()> {
    if !matches!(plugin.run_command(CommandId::PromptMode), CommandOutcome::PromptOpened) {
        bail!("prompt popup could not be opened");
    }
    let Some(popup) = plugin.prompt_popup_mut() else {
        bail!("prompt popup could not be opened");
    };
    popup.set_input(text);
    if !popup.submit().await {
        bail!("no answer was inserted");
    }
    println!("{}", host.document().text());
    Ok(())
}

async fn image(plugin: &mut AssistantPlugin, form: ImageForm, save: bool) -> Result<()> {
    let CommandOutcome::ImageGenerator(mut generator) =
        plugin.run_command(CommandId::ImageGenerator)
    else {
        bail!("no active note");
    };
    let count = {
        let images = generator.generate(&form).await?;
        for image in images {
            println!("{}", image.url);
        }
        images.len()
    };
    if save {
        for index in 0..count {
            let path = generator.save(index).await?;
            println!("saved {path}");
        }
    }
    Ok(())
}

async fn transcribe(plugin: &mut AssistantPlugin, file: &Path, mime: String) -> Result<()> {
    let CommandOutcome::SpeechToText(speech) = plugin.run_command(CommandId::SpeechToText) else {
        bail!("no active note");
    };
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording.webm".to_string());
    let text = speech
        .transcribe(AudioClip {
            bytes,
            file_name,
            mime_type: mime,
        })
        .await?;
    println!("{text}");
    Ok(())
}

fn settings_command(settings: &SettingsManager, command: SettingsCommands) -> Result<()> {
    let change = match command {
        SettingsCommands::Show => {
            println!("{}", render_settings(&settings.snapshot())?);
            return Ok(());
        }
        SettingsCommands::Set { field, value } => parse_setting(&field, &value)?,
        SettingsCommands::Prefix { list, op } => prefix_change(&list, op.into_edit()?)?,
    };
    settings.apply(change)?;
    println!("saved");
    Ok(())
}

/// JSON lines into a daily file under `log_dir`. With `verbose`, the same
/// events are mirrored to stderr in the compact format.
fn init_logging(log_dir: &Path, verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console = verbose.then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let (writer, guard) = file_writer(log_dir).unzip();

    tracing_subscriber::registry()
        .with(filter)
        .with(writer.map(|writer| fmt::layer().json().with_writer(writer)))
        .with(console)
        .init();
    guard
}

fn file_writer(log_dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("logging to file disabled, `{}`: {err}", log_dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
