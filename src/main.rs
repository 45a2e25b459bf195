use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use agentline::config::Settings;
use agentline::controllers::KnowledgeMode;
use agentline::credentials::StaticCredentials;
use agentline::guard::Route;
use agentline::storage::TomlSessionFile;
use agentline::{App, CallRequestPage, ClientError, CompanyDashboard, Navigation, Role};

#[derive(Parser)]
#[command(name = "agentline", version, about = "Configure the AI agent or request a call from it")]
struct Cli {
    /// Backend origin, e.g. http://localhost:8000
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Settings file (defaults to <config dir>/agentline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Session file (defaults to <data dir>/session.toml)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Portal {
    Company,
    User,
}

impl From<Portal> for Role {
    fn from(p: Portal) -> Self {
        match p {
            Portal::Company => Role::Company,
            Portal::User => Role::User,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the company or user portal
    Login { portal: Portal, username: String, password: String },
    Logout { portal: Portal },
    /// Show who is signed in
    Whoami,
    /// Visit a page by path, as a browser would
    Open { path: String },
    /// Print the effective settings
    Config {
        /// Write them back to the settings file
        #[arg(long)]
        save: bool,
    },
    /// Company administration (requires a company session)
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },
    /// Ask the agent to call you (requires a user session)
    Call {
        name: String,
        phone: String,
        /// Fetch the conversation log right after the call starts
        #[arg(long)]
        log: bool,
    },
}

#[derive(Subcommand)]
enum CompanyAction {
    Show,
    SetName { name: String },
    /// Replace the agent's knowledge base
    Knowledge {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let fallback = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();

    let runtime = match &*agentline::utils::RUNTIME {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    match runtime.block_on(run(cli)) {
        Ok(()) => {}
        Err(Failure::Shown) => std::process::exit(1),
        Err(Failure::Client(e)) => {
            eprintln!("Error: {}", e.detail());
            std::process::exit(1);
        }
    }
}

enum Failure {
    /// Already printed as the page's status line.
    Shown,
    Client(ClientError),
}

impl From<ClientError> for Failure {
    fn from(e: ClientError) -> Self {
        Failure::Client(e)
    }
}

type Outcome = std::result::Result<(), Failure>;

/// Prints the status line a page set for `outcome`. A failure that produced
/// a status line is not reported a second time.
fn report<T>(outcome: agentline::Result<T>, status: Option<String>) -> std::result::Result<T, Failure> {
    match (outcome, status) {
        (Ok(value), status) => {
            if let Some(status) = status {
                println!("{}", status);
            }
            Ok(value)
        }
        (Err(e), Some(status)) => {
            log::debug!("{:?}", e);
            eprintln!("{}", status);
            Err(Failure::Shown)
        }
        (Err(e), None) => Err(e.into()),
    }
}

async fn run(cli: Cli) -> Outcome {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if let Some(url) = &cli.base_url {
        settings = settings.with_base_url(url);
    }
    let session_path = cli
        .session_file
        .clone()
        .or_else(TomlSessionFile::default_path)
        .ok_or_else(|| ClientError::Storage("no data directory available".into()))?;
    let config_path = cli.config.clone().or_else(Settings::default_path);
    let app = App::new(
        settings,
        Box::new(TomlSessionFile::new(session_path)),
        Arc::new(StaticCredentials::demo()),
    )?;

    match cli.command {
        Commands::Login { portal, username, password } => {
            let route = app.sign_in(portal.into(), &username, &password)?;
            println!("Signed in. Continue at {}", route);
        }
        Commands::Logout { portal } => {
            let route = app.sign_out(portal.into())?;
            println!("Signed out. Continue at {}", route);
        }
        Commands::Whoami => match app.current_session() {
            Some(session) => println!("{} (session expires at {})", session.role, session.expires_at()),
            None => println!("Not signed in."),
        },
        Commands::Open { path } => open(&app, &path).await,
        Commands::Config { save } => {
            let text = toml::to_string_pretty(app.settings()).map_err(ClientError::from)?;
            print!("{}", text);
            if save {
                let path = config_path.ok_or_else(|| ClientError::Storage("no config directory available".into()))?;
                app.settings().save_to(&path)?;
                println!("Saved to {}", path.display());
            }
        }
        Commands::Company { action } => company(&app, action).await?,
        Commands::Call { name, phone, log } => call(&app, &name, &phone, log).await?,
    }
    Ok(())
}

async fn open(app: &App, path: &str) {
    let route = Route::from_path(path);
    match route.required_role() {
        None => println!("{} needs no sign-in.", route),
        Some(Role::Company) => match app.open_company_dashboard().await {
            Navigation::Show(dashboard) => show_dashboard(&dashboard),
            Navigation::Redirect(to) => println!("Redirected to {}", to),
        },
        Some(Role::User) => match app.open_call_page().await {
            Navigation::Show(page) => show_call_page(&page),
            Navigation::Redirect(to) => println!("Redirected to {}", to),
        },
    }
}

fn show_dashboard(dashboard: &CompanyDashboard) {
    println!("Company: {}", dashboard.company_name());
    if let Some(status) = dashboard.name_status() {
        println!("{}", status);
    }
    let view = dashboard.knowledge().snapshot();
    match view.mode {
        KnowledgeMode::Viewing => println!("Knowledge:\n{}", view.saved),
        KnowledgeMode::Editing => println!("Knowledge: (none saved)"),
    }
    if let Some(status) = view.status {
        println!("{}", status);
    }
}

fn show_call_page(page: &CallRequestPage) {
    println!("{}", page.company_name());
    if let Some(status) = page.calls().snapshot().status_line {
        println!("{}", status);
    }
}

async fn company(app: &App, action: CompanyAction) -> Outcome {
    let dashboard = match app.open_company_dashboard().await {
        Navigation::Show(dashboard) => dashboard,
        Navigation::Redirect(route) => {
            println!("Please sign in first: {}", route);
            return Ok(());
        }
    };

    match action {
        CompanyAction::Show => show_dashboard(&dashboard),
        CompanyAction::SetName { name } => {
            dashboard.set_name_draft(&name);
            let outcome = dashboard.submit_name().await;
            report(outcome, dashboard.name_status())?;
        }
        CompanyAction::Knowledge { text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(path).map_err(ClientError::from)?,
                (None, None) => String::new(),
            };
            let editor = dashboard.knowledge();
            if editor.mode() == KnowledgeMode::Viewing {
                editor.begin_edit();
            }
            editor.set_buffer(&text);
            let outcome = editor.upload().await;
            let view = editor.snapshot();
            report(outcome, view.status)?;
            println!("{}", view.saved);
        }
    }
    Ok(())
}

async fn call(app: &App, name: &str, phone: &str, fetch_log: bool) -> Outcome {
    let page = match app.open_call_page().await {
        Navigation::Show(page) => page,
        Navigation::Redirect(route) => {
            println!("Please sign in first: {}", route);
            return Ok(());
        }
    };
    println!("{}", page.company_name());

    let calls = page.calls();
    let outcome = calls.submit(name, phone).await;
    report(outcome, calls.snapshot().status_line)?;
    if fetch_log {
        let outcome = calls.fetch_transcript().await;
        report(outcome, calls.snapshot().log_line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_with_status_line_is_not_reported_twice() {
        let outcome: agentline::Result<()> = Err(ClientError::service(200, None));
        let status = Some("Error: Failed to initiate call.".to_string());
        assert!(matches!(report(outcome, status), Err(Failure::Shown)));
    }

    #[test]
    fn failure_without_status_line_keeps_error() {
        let outcome: agentline::Result<()> = Err(ClientError::Network("refused".into()));
        match report(outcome, None) {
            Err(Failure::Client(e)) => assert_eq!(e.detail(), "refused"),
            _ => panic!("expected the client error"),
        }
    }

    #[test]
    fn success_passes_value_through() {
        assert!(matches!(report(Ok(7), Some("Company name updated!".into())), Ok(7)));
    }

    #[test]
    fn verbose_flag_and_paths_parse() {
        let cli = Cli::try_parse_from(["agentline", "-v", "open", "/request-call"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Open { path } => assert_eq!(Route::from_path(&path), Route::RequestCall),
            _ => panic!("expected open"),
        }
    }
}
