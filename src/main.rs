mod commands;
mod database;
mod handlers;
mod model;

use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpServer};
use actix_web_flash_messages::{storage::CookieMessageStore, FlashMessagesFramework};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "watchlist", about = "A single-user movie watchlist server")]
struct Cli {
    /// Directory of the on-disk database
    #[arg(long, env = "WATCHLIST_DB", default_value = "watchlist.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, env = "WATCHLIST_BIND", default_value = "127.0.0.1:8080")]
        bind: String,
        /// Secret for signing session and flash cookies, at least 32 bytes.
        /// A fresh random key is generated when omitted, which invalidates
        /// sessions across restarts.
        #[arg(long, env = "WATCHLIST_SECRET_KEY")]
        secret_key: Option<String>,
    },
    /// Initialize the database
    Initdb {
        /// Create after dropping existing data
        #[arg(long)]
        drop: bool,
    },
    /// Generate sample data
    Forge,
    /// Create or update the admin account
    Admin {
        /// The username used to login
        #[arg(long)]
        username: String,
        /// The password used to login
        #[arg(long)]
        password: String,
    },
}

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().default_filter_or("watchlist=debug,actix_web=info"),
    );

    let cli = Cli::parse();
    let db = sled::open(&cli.database)?;

    match cli.command {
        Commands::Initdb { drop } => commands::init_db(&db, drop),
        Commands::Forge => commands::forge(&db),
        Commands::Admin { username, password } => commands::admin(&db, &username, &password),
        Commands::Serve { bind, secret_key } => serve(db, &bind, secret_key.as_deref()).await,
    }
}

async fn serve(db: sled::Db, bind: &str, secret: Option<&str>) -> anyhow::Result<()> {
    let secret_key = match secret {
        Some(secret) => {
            if secret.len() < 32 {
                anyhow::bail!("secret key must be at least 32 bytes");
            }
            Key::derive_from(secret.as_bytes())
        }
        None => Key::generate(),
    };
    let tera = tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))?;
    let message_store = CookieMessageStore::builder(secret_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();

    log::info!("listening on http://{}", bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(IdentityMiddleware::default())
            .wrap(message_framework.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_name("auth-cookie".to_owned())
                    .cookie_secure(false)
                    .build(),
            )
            .app_data(web::Data::new(tera.clone()))
            .app_data(web::Data::new(db.clone()))
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}
