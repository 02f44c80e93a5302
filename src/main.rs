use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use payflow::approval::{ActionKind, AmountEdit, ApprovalSession, Notice};
use payflow::config::{
    clear_session, config_dir, load_config, load_session, save_session, Config, Role,
    SessionContext, CONFIG_FILE, CONFIG_TEMPLATE,
};
use payflow::error::{PayflowError, Result};
use payflow::format::{format_currency, node_amount, status_text};
use payflow::model::{NodeRef, TreeNode};
use payflow::service::{Backend, FileBackend, HttpBackend};

#[derive(Parser)]
#[command(name = "payflow")]
#[command(version, about = "Multi-level payment approval client", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.payflow)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Read payment data from a saved service response instead of the gateway
    #[arg(long, global = true, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Where offline submissions are recorded (default: <config-dir>/outbox.json)
    #[arg(long, global = true, value_name = "FILE")]
    outbox: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a config.toml template
    Init,

    /// Verify who is approving and remember it
    Login {
        /// User name (skips verification against the service)
        #[arg(long, requires = "level")]
        user: Option<String>,

        /// Approval level: PM, HOD, CFO, AUD or DIR
        #[arg(long, requires = "user")]
        level: Option<String>,
    },

    /// Forget the stored identity
    Logout,

    /// Show configuration and login state
    Status,

    /// Show the approval tree
    Tree {
        /// Display amounts in lakhs and thousands
        #[arg(long)]
        lakhs: bool,
    },

    /// Approve payment items
    Approve(DecisionArgs),

    /// Reject payment items
    Reject(DecisionArgs),
}

#[derive(Args)]
struct DecisionArgs {
    /// Approvals or items to act on: APPROVAL_NO or APPROVAL_NO/ITEM_NUM
    #[arg(value_name = "REF")]
    refs: Vec<String>,

    /// Set the approved amount of an item (can be repeated)
    #[arg(long, value_name = "REF=AMOUNT")]
    amount: Vec<String>,

    /// Set the TDS amount of an item (can be repeated)
    #[arg(long, value_name = "REF=AMOUNT")]
    tds: Vec<String>,

    /// Set your remarks on an item (can be repeated)
    #[arg(long, value_name = "REF=TEXT")]
    remark: Vec<String>,

    /// Print the payload instead of submitting it
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let source = DataSource {
        input: cli.input,
        outbox: cli.outbox.unwrap_or_else(|| cfg_dir.join("outbox.json")),
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Login { user, level } => cmd_login(&cfg_dir, &source, user, level),
        Commands::Logout => cmd_logout(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir, &source),
        Commands::Tree { lakhs } => cmd_tree(&cfg_dir, &source, lakhs),
        Commands::Approve(args) => cmd_decide(&cfg_dir, &source, ActionKind::Approve, &args),
        Commands::Reject(args) => cmd_decide(&cfg_dir, &source, ActionKind::Reject, &args),
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "payflow=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("PAYFLOW_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Gateway, or a saved response when `--input` is given.
struct DataSource {
    input: Option<PathBuf>,
    outbox: PathBuf,
}

impl DataSource {
    fn backend(&self, config: &Config) -> Box<dyn Backend> {
        match &self.input {
            Some(input) => Box::new(FileBackend::new(input, &self.outbox)),
            None => Box::new(HttpBackend::new(config)),
        }
    }
}

fn require_config(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(PayflowError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    load_config(cfg_dir)
}

fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(PayflowError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join(CONFIG_FILE), CONFIG_TEMPLATE)?;

    println!("Initialized payflow config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your gateway:  $EDITOR {}/{CONFIG_FILE}",
        cfg_dir.display()
    );
    println!("  2. Sign in:                   payflow login");
    println!();
    println!("Then review pending payments:");
    println!("  payflow tree");

    Ok(())
}

fn cmd_login(
    cfg_dir: &Path,
    source: &DataSource,
    user: Option<String>,
    level: Option<String>,
) -> Result<()> {
    let config = require_config(cfg_dir)?;

    let context = match (user, level) {
        (Some(user), Some(level)) => SessionContext::new(user, level.parse::<Role>()?),
        _ => {
            let mut backend = source.backend(&config);
            SessionContext::verify(backend.as_mut())?
        }
    };
    save_session(cfg_dir, &context)?;

    println!(
        "Logged in as {} ({})",
        context.user_name,
        context.role.label()
    );
    Ok(())
}

fn cmd_logout(cfg_dir: &Path) -> Result<()> {
    if clear_session(cfg_dir)? {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

fn cmd_status(cfg_dir: &Path, source: &DataSource) -> Result<()> {
    let config = require_config(cfg_dir)?;

    println!("Payflow Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    match &source.input {
        Some(input) => {
            println!("Data source:      {} (offline)", input.display());
            println!("Outbox:           {}", source.outbox.display());
        }
        None => println!("Service:          {}", config.service.url),
    }
    println!("Date encoding:    {}", config.payload.date_encoding);
    match load_session(cfg_dir) {
        Ok(ctx) => println!("Logged in as:     {} ({})", ctx.user_name, ctx.role.label()),
        Err(PayflowError::NotLoggedIn) => println!("Logged in as:     (not logged in)"),
        Err(e) => return Err(e),
    }
    Ok(())
}

#[derive(Tabled)]
struct TreeRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Items")]
    items: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Currency")]
    currency: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn cmd_tree(cfg_dir: &Path, source: &DataSource, lakhs: bool) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let context = load_session(cfg_dir)?;
    let role = context.role;

    let mut backend = source.backend(&config);
    let (mut session, notice) =
        ApprovalSession::load(context, config.payload.date_encoding, backend.as_mut());
    if let Some(notice) = notice {
        print_notice(&notice);
    }
    if session.tree().is_empty() {
        return Ok(());
    }
    if lakhs || config.display.show_in_lakhs {
        print_notice(&session.set_show_in_lakhs(true));
    }

    let tree = session.tree();
    let rows: Vec<TreeRow> = tree
        .rows()
        .map(|(node, view)| {
            let (description, items, currency) = match view {
                TreeNode::Header(h) => (
                    h.display_text.clone(),
                    h.item_count.to_string(),
                    h.currency.clone(),
                ),
                TreeNode::Item(i) => (
                    format!("  {}", i.display_text),
                    String::new(),
                    i.item.currency.clone(),
                ),
            };
            TreeRow {
                reference: tree.label(node),
                description,
                items,
                amount: format_currency(node_amount(view), session.show_in_lakhs()),
                currency,
                status: status_text(view, role),
            }
        })
        .collect();

    let item_total: usize = tree.headers.iter().map(|h| h.item_count).sum();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} approval(s), {} item(s)", tree.len(), item_total);
    println!("Acting as {}", role.label());
    Ok(())
}

fn cmd_decide(
    cfg_dir: &Path,
    source: &DataSource,
    action: ActionKind,
    args: &DecisionArgs,
) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let context = load_session(cfg_dir)?;

    let mut backend = source.backend(&config);
    let (mut session, notice) =
        ApprovalSession::load(context, config.payload.date_encoding, backend.as_mut());
    if let Some(notice) = notice {
        print_notice(&notice);
    }

    for edit in &args.tds {
        let (node, value) = parse_edit(&session, edit)?;
        if session.set_tds_amount(node, value)? == AmountEdit::ClampedToZero {
            println!("TDS Amount cannot be negative");
        }
    }
    for edit in &args.amount {
        let (node, value) = parse_edit(&session, edit)?;
        if session.set_approved_amount(node, value)? == AmountEdit::ClampedToZero {
            println!("Approved Amount cannot be negative");
        }
    }
    for edit in &args.remark {
        let (node, text) = parse_edit(&session, edit)?;
        session.set_remarks(node, text)?;
    }

    let nodes = args
        .refs
        .iter()
        .map(|r| session.tree().resolve(r))
        .collect::<Result<Vec<NodeRef>>>()?;
    if let Some(notice) = session.select(&nodes)? {
        print_notice(&notice);
    }

    let dialog = session.request_action(action)?;
    println!("{}: {} item(s)", dialog.title, dialog.targets.len());
    debug!(targets = ?dialog.targets, "dialog targets");

    if args.dry_run {
        let pending = session.begin_submission(Utc::now())?;
        println!("{}", serde_json::to_string_pretty(&pending.payload)?);
        return Ok(());
    }

    let receipt = session.confirm(backend.as_mut(), Utc::now())?;
    print_notice(&receipt.notice);
    println!("  Approval: {}", receipt.approval_no);
    println!("  Action:   {}", receipt.action);
    println!("  Items:    {}", receipt.item_count);
    println!("  Request:  {}", receipt.request_key);
    Ok(())
}

/// Split `REF=VALUE` and resolve the reference.
fn parse_edit<'a>(session: &ApprovalSession, edit: &'a str) -> Result<(NodeRef, &'a str)> {
    let (reference, value) = edit
        .split_once('=')
        .ok_or_else(|| PayflowError::InvalidEdit(edit.to_string()))?;
    if reference.trim().is_empty() {
        return Err(PayflowError::InvalidEdit(edit.to_string()));
    }
    let node = session.tree().resolve(reference)?;
    Ok((node, value))
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Transient(message) => println!("{message}"),
        Notice::Blocking(message) => eprintln!("{message}"),
    }
}
