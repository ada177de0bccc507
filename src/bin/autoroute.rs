//! Autoroute CLI: inspect and maintain a route tree.
//!
//! Usage:
//!   autoroute init [--db path] [--config file]
//!   autoroute create <uri> --content <id> [--locale en]
//!   autoroute content add <id> --type <type> [--field key=value] [--translation de]

use autoroute::{
    AdapterConfig, AutoRouteAdapter, ContentId, ContentItem, Document, DocumentRepository,
    MemoryRepository, OpenRepository, PropertyValue, RepositoryAdapter, RouteNode, ShapeFilter,
    ShapeRegistry, SqliteRepository, UriContext,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "autoroute",
    version,
    about = "Automatic routes over a path-addressed document repository"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log adapter activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configured route base path
    Init,
    /// Create the route for a URI
    Create {
        /// URI relative to the base path
        uri: String,
        /// Id of the content the route points at
        #[arg(long)]
        content: String,
        /// Locale of the route
        #[arg(long)]
        locale: Option<String>,
    },
    /// Show the route at a URI
    Find {
        uri: String,
    },
    /// Turn the route at one URI into a redirect to another
    Redirect {
        /// URI of the route to redirect
        from: String,
        /// URI of the route to redirect to
        to: String,
    },
    /// Move the children of one route under another
    MigrateChildren {
        from: String,
        to: String,
    },
    /// Delete the route at a URI and everything below it
    Remove {
        uri: String,
    },
    /// List nodes pointing at a content item (routes only by default)
    Referrers {
        content: String,
        /// Include every referring node, whatever its shape
        #[arg(long)]
        all: bool,
        /// Only nodes stored with this shape
        #[arg(long, conflicts_with = "all")]
        shape: Option<String>,
    },
    /// List the locales a content item is translated into
    Locales {
        content: String,
    },
    /// Manage content items
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
}

#[derive(Subcommand)]
enum ContentAction {
    /// Add or replace a content item
    Add {
        /// Content id
        id: String,
        /// Content type name
        #[arg(long = "type")]
        type_name: String,
        /// Field value as key=value (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Locale to add a translation for, copying the fields (repeatable)
        #[arg(long = "translation")]
        translations: Vec<String>,
    },
}

/// Get the default database path (~/.local/share/autoroute/autoroute.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let autoroute_dir = data_dir.join("autoroute");
    std::fs::create_dir_all(&autoroute_dir).ok();
    autoroute_dir.join("autoroute.db")
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AdapterConfig, String> {
    match path {
        Some(path) => AdapterConfig::load(&path)
            .map_err(|e| format!("Failed to load config '{}': {}", path.display(), e)),
        None => Ok(AdapterConfig::default()),
    }
}

fn open_repository(
    db: Option<PathBuf>,
    config: &AdapterConfig,
) -> Result<Arc<dyn DocumentRepository>, String> {
    let shapes = ShapeRegistry::new().with_route_shape(config.route_shape.clone());
    match config.adapter.as_deref() {
        None | Some("sqlite") => {
            let db_path = db.unwrap_or_else(default_db_path);
            let repo = SqliteRepository::open(&db_path)
                .map_err(|e| format!("Failed to open database: {}", e))?;
            Ok(Arc::new(repo.with_shapes(shapes)))
        }
        Some("memory") => Ok(Arc::new(MemoryRepository::with_shapes(shapes))),
        Some(other) => Err(format!("unknown adapter '{}'", other)),
    }
}

fn print_route(route: &RouteNode) {
    println!("{:<10} {}", "path", route.path());
    println!("{:<10} {}", "id", route.id());
    println!("{:<10} {}", "type", route.route_type());
    println!(
        "{:<10} {}",
        "content",
        route.content().map(ContentId::as_str).unwrap_or("-")
    );
    println!("{:<10} {}", "locale", route.locale().unwrap_or("-"));
    if let Some(target) = route.redirect_target() {
        println!("{:<10} {}", "redirect", target);
    }
}

fn with_adapter(
    repo: Arc<dyn DocumentRepository>,
    config: &AdapterConfig,
    run: impl FnOnce(&RepositoryAdapter) -> i32,
) -> i32 {
    match RepositoryAdapter::new(repo, config) {
        Ok(adapter) => run(&adapter),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn find_route(adapter: &RepositoryAdapter, uri: &str) -> Result<RouteNode, String> {
    match adapter.find_route_for_uri(uri) {
        Ok(Some(route)) => Ok(route),
        Ok(None) => Err(format!("no route at '{}'", uri)),
        Err(e) => Err(e.to_string()),
    }
}

fn load_content(repo: &dyn DocumentRepository, id: &str) -> Result<ContentItem, String> {
    match repo.find_content(&ContentId::new(id)) {
        Ok(Some(item)) => Ok(item),
        Ok(None) => Err(format!("content '{}' not found", id)),
        Err(e) => Err(e.to_string()),
    }
}

fn cmd_init(repo: &dyn DocumentRepository, config: &AdapterConfig) -> i32 {
    match repo.provision_path(&config.base_path()) {
        Ok(base) => {
            println!("Initialized route base path '{}'", base.path());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_create(adapter: &RepositoryAdapter, uri: &str, content: &str, locale: Option<String>) -> i32 {
    let repo = adapter.repository();
    let mut item = match load_content(repo.as_ref(), content) {
        Ok(item) => item,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let result = {
        let mut ctx = UriContext::new(&mut item, uri);
        if let Some(locale) = &locale {
            ctx = ctx.with_locale(locale.clone());
        }
        let tag = adapter.generate_auto_route_tag(&ctx);
        adapter.create_auto_route(&mut ctx, Some(tag.as_str()))
    };

    let route = match result {
        Ok(route) => route,
        Err(e) => {
            eprintln!("Error: {}", e);
            let _ = repo.rollback();
            return 1;
        }
    };
    if let Err(e) = repo.save_content(&item).and_then(|_| repo.commit()) {
        eprintln!("Error: {}", e);
        return 1;
    }
    println!("Created route '{}' ({})", route.path(), route.id());
    0
}

fn cmd_find(adapter: &RepositoryAdapter, uri: &str) -> i32 {
    match find_route(adapter, uri) {
        Ok(route) => {
            print_route(&route);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_redirect(adapter: &RepositoryAdapter, from: &str, to: &str) -> i32 {
    let (mut referring, target) = match (find_route(adapter, from), find_route(adapter, to)) {
        (Ok(referring), Ok(target)) => (referring, target),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    adapter.create_redirect_route(&mut referring, &target);
    let saved = adapter
        .save_route(&referring)
        .map_err(|e| e.to_string())
        .and_then(|_| adapter.repository().commit().map_err(|e| e.to_string()));
    match saved {
        Ok(()) => {
            println!("Redirected '{}' to '{}'", referring.path(), target.path());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_migrate_children(adapter: &RepositoryAdapter, from: &str, to: &str) -> i32 {
    let (source, dest) = match (find_route(adapter, from), find_route(adapter, to)) {
        (Ok(source), Ok(dest)) => (source, dest),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let repo = adapter.repository();
    if let Err(e) = adapter.migrate_auto_route_children(&source, &dest) {
        eprintln!("Error: {}", e);
        let _ = repo.rollback();
        return 1;
    }
    match repo.commit() {
        Ok(()) => {
            println!("Moved children of '{}' under '{}'", source.path(), dest.path());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_remove(adapter: &RepositoryAdapter, uri: &str) -> i32 {
    let route = match find_route(adapter, uri) {
        Ok(route) => route,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match adapter.remove_auto_route(&route) {
        Ok(()) => {
            println!("Removed route '{}'", route.path());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Filter for the `referrers` command flags
fn referrer_filter(all: bool, shape: Option<String>) -> ShapeFilter {
    match (all, shape) {
        (_, Some(shape)) => ShapeFilter::Shape(shape),
        (true, None) => ShapeFilter::Any,
        (false, None) => ShapeFilter::Routes,
    }
}

fn cmd_referrers(adapter: &RepositoryAdapter, content: &str, filter: ShapeFilter) -> i32 {
    let item = ContentItem::new(content, "");
    let found = match &filter {
        ShapeFilter::Routes => adapter
            .get_referring_auto_routes(&item)
            .map(|routes| routes.into_iter().map(Document::Route).collect::<Vec<_>>())
            .map_err(|e| e.to_string()),
        other => adapter
            .repository()
            .find_referrers(&item.id, other)
            .map_err(|e| e.to_string()),
    };
    let documents = match found {
        Ok(documents) => documents,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if documents.is_empty() {
        println!("No nodes point at '{}'.", content);
        return 0;
    }
    println!("{:<36}  {:<12}  {:<12}  {}", "ID", "SHAPE", "LOCALE", "PATH");
    println!("{}", "-".repeat(80));
    for document in documents {
        let locale = document.route_fields().and_then(|f| f.locale.as_deref());
        println!(
            "{:<36}  {:<12}  {:<12}  {}",
            document.id(),
            document.shape(),
            locale.unwrap_or("-"),
            document.path()
        );
    }
    0
}

fn cmd_locales(adapter: &RepositoryAdapter, content: &str) -> i32 {
    let item = match load_content(adapter.repository().as_ref(), content) {
        Ok(item) => item,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match adapter.get_locales(&item) {
        Ok(locales) if locales.is_empty() => {
            println!("'{}' is not translated.", content);
            0
        }
        Ok(locales) => {
            for locale in locales {
                println!("{}", locale);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn parse_field(field: &str) -> Result<(String, PropertyValue), String> {
    match field.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.into())),
        _ => Err(format!("invalid field '{}', expected key=value", field)),
    }
}

fn cmd_content_add(
    repo: &dyn DocumentRepository,
    id: &str,
    type_name: &str,
    fields: &[String],
    translations: &[String],
) -> i32 {
    let mut item = ContentItem::new(id, type_name);
    for field in fields {
        match parse_field(field) {
            Ok((key, value)) => item = item.with_field(key, value),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    for locale in translations {
        let copied = item.fields.clone();
        item = item.with_translation(locale.clone(), copied);
    }
    // keep the routes of an item being replaced
    if let Ok(Some(existing)) = repo.find_content(&item.id) {
        item.routes = existing.routes;
    }
    match repo.save_content(&item).and_then(|_| repo.commit()) {
        Ok(()) => {
            println!("Saved content '{}' ({})", id, type_name);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let repo = match open_repository(cli.db, &config) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Init => cmd_init(repo.as_ref(), &config),
        Commands::Content { action } => match action {
            ContentAction::Add { id, type_name, fields, translations } => {
                cmd_content_add(repo.as_ref(), &id, &type_name, &fields, &translations)
            }
        },
        Commands::Create { uri, content, locale } => {
            with_adapter(repo, &config, |adapter| cmd_create(adapter, &uri, &content, locale))
        }
        Commands::Find { uri } => with_adapter(repo, &config, |adapter| cmd_find(adapter, &uri)),
        Commands::Redirect { from, to } => {
            with_adapter(repo, &config, |adapter| cmd_redirect(adapter, &from, &to))
        }
        Commands::MigrateChildren { from, to } => {
            with_adapter(repo, &config, |adapter| cmd_migrate_children(adapter, &from, &to))
        }
        Commands::Remove { uri } => with_adapter(repo, &config, |adapter| cmd_remove(adapter, &uri)),
        Commands::Referrers { content, all, shape } => with_adapter(repo, &config, |adapter| {
            cmd_referrers(adapter, &content, referrer_filter(all, shape))
        }),
        Commands::Locales { content } => {
            with_adapter(repo, &config, |adapter| cmd_locales(adapter, &content))
        }
    };
    std::process::exit(code);
}
