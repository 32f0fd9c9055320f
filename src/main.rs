// drillbook: build basketball training sessions and print them

use std::path::PathBuf;

use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use drillbook::assets::AssetRoot;
use drillbook::catalog::text_color_for;
use drillbook::config::default_data_dir;
use drillbook::sessions::default_session_name;
use drillbook::share::{parse_share_id, share_link};
use drillbook::store::write_replacing;
use drillbook::{
    AppError, Cart, Catalog, ComposeRequest, Composer, DrillDraft, DrillFilter, DrillRecord,
    FileStore, SessionRecord, SessionStore, Settings, SortKey,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Build basketball training sessions and export them as PDF")]
struct Args {
    /// Directory holding saved sessions, the cart and drillbook.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to <data-dir>/drillbook.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Drill catalog JSON file
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Image directory or http(s) base URL
    #[arg(long, global = true)]
    images: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse the drill catalog
    #[command(subcommand)]
    Drills(DrillsCommand),
    /// Edit the training being assembled
    #[command(subcommand)]
    Cart(CartCommand),
    /// Manage saved trainings
    #[command(subcommand)]
    Session(SessionCommand),
    /// Export a training as PDF
    Pdf(PdfArgs),
}

#[derive(Subcommand, Debug)]
enum DrillsCommand {
    /// List drills, optionally filtered and sorted
    List(ListArgs),
    /// Show one drill in full
    Show { id: u32 },
    /// Print the JSON for a new catalog entry
    New(NewDrillArgs),
    /// Age groups, equipment and tags in use, with tag colours
    Facets,
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Match against name, description and tags
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long)]
    age_group: Option<String>,
    /// Required tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    equipment: Option<String>,
    #[arg(long)]
    intensity: Option<u8>,
    /// Maximum duration in minutes
    #[arg(long)]
    max_duration: Option<u32>,
    #[arg(long, value_enum, default_value = "id")]
    sort: SortArg,
    /// Sort descending
    #[arg(long)]
    desc: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Id,
    Name,
    Duration,
    Intensity,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => SortKey::Id,
            SortArg::Name => SortKey::Name,
            SortArg::Duration => SortKey::Duration,
            SortArg::Intensity => SortKey::Intensity,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct NewDrillArgs {
    #[arg(short, long)]
    name: String,
    /// Use \n for a new paragraph
    #[arg(short, long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    age_group: String,
    /// Duration in minutes
    #[arg(long, default_value = "0")]
    duration: u32,
    #[arg(long)]
    equipment: Vec<String>,
    /// Image filename (repeatable)
    #[arg(long = "image")]
    images: Vec<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// 1 (light) to 3 (heavy)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    intensity: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum CartCommand {
    /// Add drills to the end of the training
    Add { ids: Vec<u32> },
    Remove { id: u32 },
    /// Move the drill at position FROM to position TO (1-based)
    Move { from: usize, to: usize },
    Clear,
    Show,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Save the cart as a named training
    Save {
        /// Defaults to "Training - DD/MM/YY" for tomorrow
        #[arg(short, long)]
        name: Option<String>,
    },
    List,
    Show { id: String },
    Delete { id: String },
    /// Print a share link
    Share { id: String },
    /// Load a saved training into the cart
    Edit { id: String },
}

#[derive(ClapArgs, Debug)]
struct PdfArgs {
    /// Session id or share link
    #[arg(long, conflicts_with = "cart", required_unless_present = "cart")]
    session: Option<String>,
    /// Export the unsaved cart instead
    #[arg(long)]
    cart: bool,
    /// Add a cover page
    #[arg(long)]
    cover: bool,
    /// Output filename (defaults to the session name)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Context {
    data_dir: PathBuf,
    settings: Settings,
    images: String,
}

impl Context {
    fn catalog(&self) -> Result<Catalog, AppError> {
        Catalog::from_path(&self.settings.catalog)
    }

    fn store(&self) -> FileStore {
        FileStore::new(&self.data_dir)
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    let mut settings = Settings::load(args.config.as_deref(), &data_dir)?;
    if let Some(catalog) = args.catalog {
        settings.catalog = catalog;
    }
    let images = args.images.unwrap_or_else(|| settings.images.clone());
    let ctx = Context {
        data_dir,
        settings,
        images,
    };

    match args.command {
        Command::Drills(cmd) => run_drills(&ctx, cmd),
        Command::Cart(cmd) => run_cart(&ctx, cmd),
        Command::Session(cmd) => run_session(&ctx, cmd),
        Command::Pdf(pdf) => run_pdf(&ctx, pdf),
    }
}

// ============================================================================
// Drills
// ============================================================================

fn run_drills(ctx: &Context, cmd: DrillsCommand) -> Result<(), AppError> {
    let catalog = ctx.catalog()?;
    match cmd {
        DrillsCommand::List(list) => {
            let filter = DrillFilter {
                search: list.search,
                age_group: list.age_group,
                tags: list.tags,
                equipment: list.equipment,
                intensity: list.intensity,
                max_duration: list.max_duration,
            };
            let drills = catalog.query(&filter, list.sort.into(), list.desc);
            for drill in &drills {
                println!("{}", format_drill_row(drill));
            }
            println!("{} of {} drills", drills.len(), catalog.len());
        }
        DrillsCommand::Show { id } => {
            let drill = catalog.get(id).ok_or(AppError::UnknownDrill(id))?;
            let usage = SessionStore::new(ctx.store()).drill_usage()?;
            println!("{}", format_drill_row(drill));
            println!("  Age group: {}", drill.age_group);
            println!("  Equipment: {}", drill.equipment.join(", "));
            println!("  Tags: {}", drill.tags.join(", "));
            if let Some(intensity) = drill.intensity {
                println!("  Intensity: {}", intensity);
            }
            println!("  Images: {}", drill.images.join(", "));
            println!("  Used in saved trainings: {}", usage.get(&id).copied().unwrap_or(0));
            for paragraph in drill.paragraphs() {
                println!("  {}", paragraph);
            }
        }
        DrillsCommand::New(new) => {
            let drill = catalog.new_drill(DrillDraft {
                name: new.name,
                description: new.description,
                age_group: new.age_group,
                duration_minutes: new.duration,
                equipment: new.equipment,
                images: new.images,
                tags: new.tags,
                intensity: new.intensity,
            });
            let json = serde_json::to_string_pretty(&drill)
                .map_err(|e| AppError::CatalogError(e.to_string()))?;
            println!("{}", json);
        }
        DrillsCommand::Facets => {
            println!("Age groups: {}", catalog.age_groups().join(", "));
            println!("Equipment: {}", catalog.equipment().join(", "));
            println!("Tags:");
            for (tag, color) in catalog.tag_colors() {
                println!("  {:<24} {} on {}", tag, text_color_for(color), color);
            }
        }
    }
    Ok(())
}

fn format_drill_row(drill: &DrillRecord) -> String {
    format!(
        "{:>4}  {:<36} {:>3} min  {}",
        drill.id,
        drill.name,
        drill.duration_minutes,
        drill.tags.join(", ")
    )
}

// ============================================================================
// Cart
// ============================================================================

fn run_cart(ctx: &Context, cmd: CartCommand) -> Result<(), AppError> {
    let catalog = ctx.catalog()?;
    let cart = Cart::new(ctx.store());
    match cmd {
        CartCommand::Add { ids } => {
            for id in ids {
                let drill = catalog.get(id).ok_or(AppError::UnknownDrill(id))?;
                if cart.add(id)? {
                    println!("✓ Added: {}", drill.name);
                } else {
                    println!("  Already in training: {}", drill.name);
                }
            }
        }
        CartCommand::Remove { id } => {
            if cart.remove(id)? {
                println!("✓ Removed drill {}", id);
            } else {
                println!("  Drill {} is not in the training", id);
            }
        }
        CartCommand::Move { from, to } => {
            if from == 0 || to == 0 {
                return Err(AppError::SessionError("positions start at 1".to_string()));
            }
            cart.reorder(from - 1, to - 1)?;
            println!("✓ Moved drill from position {} to {}", from, to);
        }
        CartCommand::Clear => {
            cart.clear()?;
            println!("✓ Training cleared");
        }
        CartCommand::Show => {
            let drills = catalog.resolve(&cart.ids()?);
            if drills.is_empty() {
                println!("No drills selected");
                return Ok(());
            }
            print_running_order(&drills);
            println!("Total: {} minutes", cart.total_duration(&catalog)?);
        }
    }
    Ok(())
}

fn print_running_order(drills: &[DrillRecord]) {
    for (i, drill) in drills.iter().enumerate() {
        println!(
            "{:>3}. {:<36} {:>3} min  [{}]",
            i + 1,
            drill.name,
            drill.duration_minutes,
            drill.id
        );
    }
}

// ============================================================================
// Sessions
// ============================================================================

fn parse_session_id(text: &str) -> Result<u64, AppError> {
    parse_share_id(text).ok_or_else(|| AppError::SessionError(format!("not a session id: {}", text)))
}

fn find_session(sessions: &SessionStore<FileStore>, text: &str) -> Result<SessionRecord, AppError> {
    let id = parse_session_id(text)?;
    sessions
        .get(id)?
        .ok_or_else(|| AppError::SessionError(format!("no saved training with id {}", id)))
}

fn run_session(ctx: &Context, cmd: SessionCommand) -> Result<(), AppError> {
    let mut sessions = SessionStore::new(ctx.store());
    sessions.subscribe(|list| log::debug!("{} saved trainings", list.len()));

    match cmd {
        SessionCommand::Save { name } => {
            let cart = Cart::new(ctx.store());
            let ids = cart.ids()?;
            if ids.is_empty() {
                return Err(AppError::SessionError("no drills selected".to_string()));
            }
            let name = name.unwrap_or_else(|| default_session_name(Local::now().date_naive()));
            let record = sessions.save(&name, &ids)?;
            println!("✓ Saved: {}", record.name);
            println!("  ID: {}", record.id);
        }
        SessionCommand::List => {
            let list = sessions.list()?;
            if list.is_empty() {
                println!("No saved trainings");
            }
            for session in list {
                println!(
                    "{}  {:<32} {:>2} drills  {}",
                    session.id,
                    session.name,
                    session.drills.len(),
                    session.created_at
                );
            }
        }
        SessionCommand::Show { id } => {
            let session = find_session(&sessions, &id)?;
            let catalog = ctx.catalog()?;
            let drills = catalog.resolve(&session.drills);
            let total: u32 = drills.iter().map(|d| d.duration_minutes).sum();
            println!("{}", session.name);
            print_running_order(&drills);
            println!("Total: {} minutes", total);
        }
        SessionCommand::Delete { id } => {
            let id = parse_session_id(&id)?;
            if sessions.delete(id)? {
                println!("✓ Deleted training {}", id);
            } else {
                return Err(AppError::SessionError(format!("no saved training with id {}", id)));
            }
        }
        SessionCommand::Share { id } => {
            let id = parse_session_id(&id)?;
            let name = sessions.get(id)?.map(|s| s.name).unwrap_or_default();
            println!("{}", share_link(&ctx.settings.base_url, id, &name));
        }
        SessionCommand::Edit { id } => {
            let session = find_session(&sessions, &id)?;
            Cart::new(ctx.store()).load_session(&session)?;
            println!("✓ Loaded into cart: {}", session.name);
        }
    }
    Ok(())
}

// ============================================================================
// PDF Export
// ============================================================================

fn run_pdf(ctx: &Context, args: PdfArgs) -> Result<(), AppError> {
    let catalog = ctx.catalog()?;

    let (name, ids, link) = match &args.session {
        Some(text) => {
            let sessions = SessionStore::new(ctx.store());
            let session = find_session(&sessions, text)?;
            let link = share_link(&ctx.settings.base_url, session.id, &session.name);
            (Some(session.name), session.drills, Some(link))
        }
        None => (None, Cart::new(ctx.store()).ids()?, None),
    };
    let drills = catalog.resolve(&ids);
    if drills.is_empty() {
        println!("No drills to export");
        return Ok(());
    }

    let resolver = AssetRoot::parse(&ctx.images);
    let composer = Composer::new(&ctx.settings.layout, &resolver);
    let tag_colors = catalog.tag_colors();
    let request = ComposeRequest {
        drills: &drills,
        include_cover: args.cover,
        session_name: name.as_deref(),
        share_link: link.as_deref(),
        tag_colors: Some(&tag_colors),
        timestamp: Local::now().naive_local(),
    };

    let Some(pdf) = composer.compose(&request)? else {
        return Ok(());
    };
    let output_file = args.output.unwrap_or_else(|| PathBuf::from(&pdf.filename));
    write_replacing(&output_file, &pdf.bytes)?;

    println!("✓ Generated: {}", output_file.display());
    println!("  Drills: {}", drills.len());
    println!("  Pages: {}", pdf.page_count);

    Ok(())
}

