//! Soko CLI - browse the catalog, edit a cart and place orders from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally filtered
//! soko products --search potato --category tubers
//!
//! # Edit the cart for a session (omit --session for the local cart)
//! soko cart add 1 --quantity 2 --session abc123
//! soko cart set 1 5 --session abc123
//! soko cart remove 1 --session abc123
//! soko cart show --session abc123
//! soko cart clear --session abc123
//!
//! # Place the order
//! soko checkout --session abc123
//! ```
//!
//! # Commands
//!
//! - `products` - List the (filtered) catalog
//! - `cart` - Show or edit a persisted cart
//! - `checkout` - Submit the cart as an order
//!
//! Configuration comes from the same `SOKO_*` environment variables as the
//! storefront server. Carts are stored under `SOKO_STORAGE_DIR` (default
//! `.soko`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "soko")]
#[command(author, version, about = "Soko storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products in the catalog
    Products {
        /// Case-insensitive search over names and descriptions
        #[arg(short, long, default_value = "")]
        search: String,

        /// Category to restrict to (`all` for every category)
        #[arg(short, long, default_value = "all")]
        category: String,
    },
    /// Show or edit a cart
    Cart {
        #[command(subcommand)]
        action: CartAction,

        /// Session token from the shop link; omit for the local cart
        #[arg(short, long, global = true)]
        session: Option<String>,
    },
    /// Place an order for the session's cart
    Checkout {
        /// Session token from the shop link
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add a product
    Add {
        /// Product id
        product_id: String,

        /// Quantity to add (clamped to 1..=99)
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        /// Product id
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove {
        /// Product id
        product_id: String,
    },
    /// Remove every line
    Clear,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::load()?;
    let currency = context.config.checkout.currency;

    match cli.command {
        Commands::Products { search, category } => {
            let catalog = context.catalog()?;
            commands::products::list(&catalog, &search, &category, currency).await?;
        }
        Commands::Cart { action, session } => {
            let mut store = context.cart(session.as_deref())?;
            match action {
                CartAction::Show => {}
                CartAction::Add {
                    product_id,
                    quantity,
                } => {
                    let catalog = context.catalog()?;
                    commands::cart::add(&catalog, &mut store, &product_id, quantity).await?;
                }
                CartAction::Set {
                    product_id,
                    quantity,
                } => commands::cart::set(&mut store, &product_id, quantity)?,
                CartAction::Remove { product_id } => {
                    commands::cart::remove(&mut store, &product_id)?;
                }
                CartAction::Clear => commands::cart::clear(&mut store),
            }
            commands::cart::show(&store, currency);
        }
        Commands::Checkout { session } => {
            let session_context = context.session(session.as_deref()).await?;
            let store = context.cart(session.as_deref())?;
            let submitter = context.submitter()?;
            commands::checkout::run(&submitter, session_context, store).await?;
        }
    }
    Ok(())
}
