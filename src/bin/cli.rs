use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use model_manager::client::{Backend, HttpBackend, NoticeLevel, PollOutcome, Session, TerminalView};
use model_manager::client::terminal::{render_model_info, render_status, render_tree};
use model_manager::config;
use model_manager::models::ActionRequest;
use model_manager::operation::OperationKind;
use model_manager::utils::mask_token;

#[derive(Parser, Debug)]
#[command(name = "model-manager-cli")]
#[command(author, version, about = "Download and manage model packages", long_about = None)]
struct Args {
    /// Backend URL (default: client.base_url from config.json)
    #[arg(short, long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reload and list available model packages
    List,
    /// Show the files of a model package
    Info { model: String },
    /// Check which files of a package are present
    Status {
        model: String,
        #[arg(short, long)]
        base_path: Option<String>,
    },
    /// Show the directory tree under a path
    Browse { path: Option<String> },
    /// Download a model package
    Download {
        model: String,
        #[arg(short, long)]
        base_path: Option<String>,
        /// Hugging Face token for gated models
        #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
        hf_token: Option<String>,
    },
    /// Delete the files of a model package
    Delete {
        model: String,
        #[arg(short, long)]
        base_path: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_manager=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let app_config = config::read_config().map_err(anyhow::Error::msg)?;
    let mut client_config = app_config.client.clone();
    if let Some(server) = args.server {
        client_config.base_url = server;
    }
    let default_base = app_config.storage.default_base_path.clone();

    let backend = Arc::new(HttpBackend::new(&client_config)?);
    tracing::debug!("Using backend {}", backend.base_url());

    match args.command {
        Command::List => {
            let configs = backend.load_configs().await?;
            println!("{} model packages:", configs.count);
            for model in &configs.models {
                println!("  {}", model);
            }
        }
        Command::Info { model } => {
            let info = backend.model_info(&model).await?;
            print_lines(&render_model_info(&info));
        }
        Command::Status { model, base_path } => {
            let base_path = base_path.unwrap_or(default_base);
            let status = backend.check_status(&model, &base_path).await?;
            print_lines(&render_status(&status));
        }
        Command::Browse { path } => {
            let path = path.unwrap_or(default_base);
            let tree = backend.browse(&path).await?;
            print_lines(&render_tree(&tree));
        }
        Command::Download { model, base_path, hf_token } => {
            if let Some(token) = hf_token.as_deref().filter(|t| !t.trim().is_empty()) {
                println!("Using Hugging Face token {}", mask_token(token.trim()));
            }
            let request = ActionRequest {
                model,
                base_path: base_path.unwrap_or(default_base),
                hf_token,
            };
            run_action(backend, &client_config, OperationKind::Download, request).await?;
        }
        Command::Delete { model, base_path, yes } => {
            if !yes && !confirm_delete(&model)? {
                println!("Deletion cancelled");
                return Ok(());
            }
            let request = ActionRequest {
                model,
                base_path: base_path.unwrap_or(default_base),
                hf_token: None,
            };
            run_action(backend, &client_config, OperationKind::Delete, request).await?;
        }
    }

    Ok(())
}

async fn run_action(
    backend: Arc<HttpBackend>,
    client_config: &config::ClientConfig,
    kind: OperationKind,
    request: ActionRequest,
) -> Result<()> {
    let session = Session::new(backend.clone(), client_config.poll_interval());
    let cancel = CancellationToken::new();

    // Ctrl-C stops following the operation; the backend keeps running it
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut view = TerminalView::new();
    let report = session.run_action(kind, &request, &mut view, cancel).await;
    view.finish();
    let report = report?;

    if view.take_refresh() {
        match backend.browse(&request.base_path).await {
            Ok(tree) => print_lines(&render_tree(&tree)),
            Err(e) => tracing::warn!("Failed to refresh directory view: {}", e),
        }
    }

    match report.outcome {
        PollOutcome::Completed(notice) if notice.level == NoticeLevel::Error => {
            Err(anyhow!(notice.message))
        }
        PollOutcome::Completed(_) => Ok(()),
        PollOutcome::Cancelled => {
            println!("Stopped following the {}; it continues on the server", kind.as_str());
            Ok(())
        }
    }
    .with_context(|| format!("{} of {} finished with errors", kind.as_str(), request.model))
}

/// Ask on stdin before deleting / 删除前在标准输入确认
fn confirm_delete(model: &str) -> Result<bool> {
    print!(
        "Are you sure you want to delete all files for {}? This action cannot be undone. [y/N] ",
        model
    );
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete_yes(argv: &[&str]) -> bool {
        match Args::try_parse_from(argv).unwrap().command {
            Command::Delete { yes, .. } => yes,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_delete_confirmation_flag() {
        assert!(delete_yes(&["model-manager-cli", "delete", "sdxl-base", "-y"]));
        assert!(delete_yes(&["model-manager-cli", "delete", "sdxl-base", "--yes"]));
        assert!(!delete_yes(&["model-manager-cli", "delete", "sdxl-base", "-b", "/m"]));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES \n"));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n\n"));
        assert!(!is_yes("yep"));
    }
}
