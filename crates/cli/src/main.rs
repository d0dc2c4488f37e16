//! Storekeep CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sk-cli migrate storefront
//!
//! # Run admin database migrations
//! sk-cli migrate admin
//!
//! # Run all database migrations
//! sk-cli migrate all
//!
//! # Manage a customer's address book
//! sk-cli user create -f Ada -l Lovelace
//! sk-cli user address add 1 --type billing --street "12 Main St" --city London --country GB
//!
//! # Manage discounts
//! sk-cli voucher create --percentage --value 10
//! sk-cli sale scope add 1 --category 4
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user` - Customers and their address books
//! - `voucher` - Vouchers and their catalogue scope
//! - `sale` - Sales and their catalogue scope
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storekeep_core::{AddressId, AddressType, SaleId, ScopeOp, UserId, VoucherId};

use commands::discounts::{
    CatalogueArgs, SaleArgs, SaleUpdateArgs, VoucherArgs, VoucherUpdateArgs,
};
use commands::users::AddressArgs;

mod commands;

#[derive(Parser)]
#[command(name = "sk-cli")]
#[command(author, version, about = "Storekeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage customers and their address books
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage vouchers
    Voucher {
        #[command(subcommand)]
        action: VoucherAction,
    },
    /// Manage sales
    Sale {
        #[command(subcommand)]
        action: SaleAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
    /// Run admin database migrations
    Admin,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a customer
    Create {
        #[arg(short, long, default_value = "")]
        first_name: String,
        #[arg(short, long, default_value = "")]
        last_name: String,
    },
    /// Show a customer's address book
    Show { user_id: i32 },
    /// Manage addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
}

#[derive(Subcommand)]
enum AddressAction {
    /// Store an address
    Add {
        user_id: i32,
        #[arg(long = "type", value_enum)]
        address_type: AddressKind,
        /// Replace the current default instead of only filling an empty one
        #[arg(long)]
        default: bool,
        #[command(flatten)]
        address: AddressArgs,
    },
    /// Make a stored address the default
    SetDefault {
        user_id: i32,
        address_id: AddressId,
        #[arg(long = "type", value_enum)]
        address_type: AddressKind,
    },
    /// Delete an address
    Delete { user_id: i32, address_id: AddressId },
}

#[derive(Clone, Copy, ValueEnum)]
enum AddressKind {
    Billing,
    Shipping,
}

impl From<AddressKind> for AddressType {
    fn from(kind: AddressKind) -> Self {
        match kind {
            AddressKind::Billing => Self::Billing,
            AddressKind::Shipping => Self::Shipping,
        }
    }
}

#[derive(Subcommand)]
enum VoucherAction {
    /// Create a voucher
    Create(VoucherArgs),
    /// Show a voucher
    Show { id: i32 },
    /// Update a voucher
    Update {
        id: i32,
        #[command(flatten)]
        changes: VoucherUpdateArgs,
    },
    /// Delete a voucher
    Delete { id: i32 },
    /// Change the catalogue entities a voucher applies to
    Scope {
        #[command(subcommand)]
        action: ScopeAction,
    },
}

#[derive(Subcommand)]
enum SaleAction {
    /// Create a sale
    Create(SaleArgs),
    /// Show a sale
    Show { id: i32 },
    /// Update a sale
    Update {
        id: i32,
        #[command(flatten)]
        changes: SaleUpdateArgs,
    },
    /// Delete a sale
    Delete { id: i32 },
    /// Change the catalogue entities a sale applies to
    Scope {
        #[command(subcommand)]
        action: ScopeAction,
    },
}

#[derive(Subcommand)]
enum ScopeAction {
    /// Add catalogue entities
    Add {
        id: i32,
        #[command(flatten)]
        catalogue: CatalogueArgs,
    },
    /// Remove catalogue entities
    Remove {
        id: i32,
        #[command(flatten)]
        catalogue: CatalogueArgs,
    },
}

impl ScopeAction {
    fn into_parts(self) -> (i32, ScopeOp, CatalogueArgs) {
        match self {
            Self::Add { id, catalogue } => (id, ScopeOp::Add, catalogue),
            Self::Remove { id, catalogue } => (id, ScopeOp::Remove, catalogue),
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "storekeep_cli=info,storekeep_storefront=info,storekeep_admin=info".into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::User { action } => run_user(action).await?,
        Commands::Voucher { action } => run_voucher(action).await?,
        Commands::Sale { action } => run_sale(action).await?,
    }
    Ok(())
}

async fn run_user(action: UserAction) -> Result<(), commands::users::UserCommandError> {
    use commands::users;

    match action {
        UserAction::Create {
            first_name,
            last_name,
        } => {
            users::create(&first_name, &last_name).await?;
        }
        UserAction::Show { user_id } => users::show(UserId::new(user_id)).await?,
        UserAction::Address { action } => match action {
            AddressAction::Add {
                user_id,
                address_type,
                default,
                address,
            } => {
                users::add_address(UserId::new(user_id), address, address_type.into(), default)
                    .await?;
            }
            AddressAction::SetDefault {
                user_id,
                address_id,
                address_type,
            } => {
                users::set_default(UserId::new(user_id), address_id, address_type.into()).await?;
            }
            AddressAction::Delete {
                user_id,
                address_id,
            } => users::delete_address(UserId::new(user_id), address_id).await?,
        },
    }
    Ok(())
}

async fn run_voucher(
    action: VoucherAction,
) -> Result<(), commands::discounts::DiscountCommandError> {
    use commands::discounts;

    match action {
        VoucherAction::Create(args) => {
            discounts::create_voucher(args).await?;
        }
        VoucherAction::Show { id } => discounts::show_voucher(VoucherId::new(id)).await?,
        VoucherAction::Update { id, changes } => {
            discounts::update_voucher(VoucherId::new(id), changes).await?;
        }
        VoucherAction::Delete { id } => discounts::delete_voucher(VoucherId::new(id)).await?,
        VoucherAction::Scope { action } => {
            let (id, op, catalogue) = action.into_parts();
            discounts::voucher_scope(VoucherId::new(id), op, catalogue).await?;
        }
    }
    Ok(())
}

async fn run_sale(action: SaleAction) -> Result<(), commands::discounts::DiscountCommandError> {
    use commands::discounts;

    match action {
        SaleAction::Create(args) => {
            discounts::create_sale(args).await?;
        }
        SaleAction::Show { id } => discounts::show_sale(SaleId::new(id)).await?,
        SaleAction::Update { id, changes } => {
            discounts::update_sale(SaleId::new(id), changes).await?;
        }
        SaleAction::Delete { id } => discounts::delete_sale(SaleId::new(id)).await?,
        SaleAction::Scope { action } => {
            let (id, op, catalogue) = action.into_parts();
            discounts::sale_scope(SaleId::new(id), op, catalogue).await?;
        }
    }
    Ok(())
}
