use std::fmt;
use std::path::{Path, PathBuf};

use course_core::model::{
    ItemId, ModuleId, ModuleMetadata, PageOutline, ProgressSettings, parse_module_catalog,
};
use services::observers::{MemoryMount, MountPoint, Rendered, memory_mounts};
use services::{Clock, CourseServices, PageProgress};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://course.sqlite3";
const FILL_WIDTH: usize = 20;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { what: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidModuleId { raw: String },
    InvalidItemId { raw: String },
    UnsupportedPage { path: PathBuf },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidModuleId { raw } => write!(f, "invalid module id: {raw:?}"),
            ArgsError::InvalidItemId { raw } => write!(f, "invalid item id: {raw:?}"),
            ArgsError::UnsupportedPage { path } => {
                write!(f, "page must be a .json or .md file: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status   [--db <sqlite_url>] [--modules <file>]");
    eprintln!("  cargo run -p app -- show     <page> [--module-id <id>] [...]");
    eprintln!("  cargo run -p app -- toggle   <page> <item_id> [--uncheck] [...]");
    eprintln!("  cargo run -p app -- complete <module_id> [...]");
    eprintln!();
    eprintln!("Pages are .json outlines or .md sources (use --module-id for module pages).");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_MODULES, COURSE_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Show,
    Toggle,
    Complete,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "show" => Some(Self::Show),
            "toggle" => Some(Self::Toggle),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    modules: Option<PathBuf>,
    module_id: Option<ModuleId>,
    uncheck: bool,
    positional: Vec<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut modules = std::env::var_os("COURSE_MODULES").map(PathBuf::from);
        let mut module_id = None;
        let mut uncheck = false;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--modules" => {
                    modules = Some(PathBuf::from(require_value(args, "--modules")?));
                }
                "--module-id" => {
                    let value = require_value(args, "--module-id")?;
                    module_id = Some(parse_module_id(&value)?);
                }
                "--uncheck" => uncheck = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            db_url,
            modules,
            module_id,
            uncheck,
            positional,
        })
    }

    /// Take the positional arguments a command expects; extras are rejected.
    fn expect_positional<const N: usize>(
        &self,
        names: [&'static str; N],
    ) -> Result<[&str; N], ArgsError> {
        if let Some(extra) = self.positional.get(N) {
            return Err(ArgsError::UnknownArg(extra.clone()));
        }
        let mut values = [""; N];
        for (idx, what) in names.into_iter().enumerate() {
            values[idx] = self
                .positional
                .get(idx)
                .map(String::as_str)
                .ok_or(ArgsError::MissingArg { what })?;
        }
        Ok(values)
    }
}

fn parse_module_id(raw: &str) -> Result<ModuleId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidModuleId {
        raw: raw.to_string(),
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw.starts_with("sqlite::memory:") || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_modules(path: Option<&Path>) -> Result<Vec<ModuleMetadata>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        tracing::debug!("no module catalog given, badge counts against zero modules");
        return Ok(Vec::new());
    };
    let json = std::fs::read_to_string(path)?;
    Ok(parse_module_catalog(&json)?)
}

fn load_page(
    path: &Path,
    module_id: Option<ModuleId>,
) -> Result<PageOutline, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let mut page = PageOutline::from_json(&source)?;
            if module_id.is_some() {
                page.module_id = module_id;
            }
            Ok(page)
        }
        Some("md" | "markdown") => Ok(PageOutline::from_markdown(module_id, &source)),
        _ => Err(ArgsError::UnsupportedPage {
            path: path.to_path_buf(),
        }
        .into()),
    }
}

fn fill_bar(content: &Rendered) -> Option<String> {
    let Rendered::Fill(percentage) = content else {
        return None;
    };
    let filled = usize::from(percentage.value()) * FILL_WIDTH / 100;
    Some(format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(FILL_WIDTH - filled)
    ))
}

fn print_page(page: &PageProgress, memory: &MemoryMount) {
    if let Some(module_id) = page.module_id() {
        println!("module {module_id}");
    }
    for item in page.items() {
        let mark = if item.is_checked() { 'x' } else { ' ' };
        println!("  [{mark}] {:<16} {}", item.id(), item.label());
    }

    let module_fill = memory.last(MountPoint::ModuleFill);
    if let Some(bar) = module_fill.as_ref().and_then(fill_bar) {
        println!(
            "module     {bar} {} ({})",
            memory
                .last_text(MountPoint::ModulePercentage)
                .unwrap_or_default(),
            memory.last_text(MountPoint::ModuleItems).unwrap_or_default()
        );
    }
    let validation_fill = memory.last(MountPoint::ValidationFill);
    if let Some(bar) = validation_fill.as_ref().and_then(fill_bar) {
        println!(
            "validation {bar} {}",
            memory
                .last_text(MountPoint::ValidationLabel)
                .unwrap_or_default()
        );
    }
}

fn print_badge(memory: &MemoryMount) {
    if let Some(badge) = memory.last_text(MountPoint::NavigationBadge) {
        println!("completed modules: {badge}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::Status,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let modules = load_modules(parsed.modules.as_deref())?;

    // Open + migrate SQLite here so core/services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let (mounts, memory) = memory_mounts();
    let services = CourseServices::new_sqlite(
        &parsed.db_url,
        ProgressSettings::default(),
        Clock::default_clock(),
        modules,
        mounts,
    )
    .await?;

    match cmd {
        Command::Status => {
            parsed.expect_positional([])?;
            let count = services.render_badge().await;
            let ledger = services.ledger().read_all().await;
            for module in services.modules() {
                println!(
                    "{:<16} {:<32} {}",
                    module.id(),
                    module.title(),
                    ledger.percentage_or_zero(module.id())
                );
            }
            println!("completed modules: {count}");
        }
        Command::Show => {
            let [page_path] = parsed.expect_positional(["<page>"])?;
            let page = load_page(Path::new(page_path), parsed.module_id.clone())?;
            let progress = services.open_page(&page).await;
            print_page(&progress, &memory);
            print_badge(&memory);
        }
        Command::Toggle => {
            let [page_path, item_id] = parsed.expect_positional(["<page>", "<item_id>"])?;
            let item_id: ItemId = item_id.parse().map_err(|_| ArgsError::InvalidItemId {
                raw: item_id.to_string(),
            })?;
            let page = load_page(Path::new(page_path), parsed.module_id.clone())?;
            let mut progress = services.open_page(&page).await;
            progress.toggle(&item_id, !parsed.uncheck).await?;
            print_page(&progress, &memory);
            print_badge(&memory);
        }
        Command::Complete => {
            let [module_id] = parsed.expect_positional(["<module_id>"])?;
            let banner = services
                .complete_module(parse_module_id(module_id)?)
                .await;
            println!("{} {}", banner.title, banner.message);
            print_badge(&memory);
        }
    }

    services.shutdown();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("COURSE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
