// Proclima desk - back-office client for the Proclima HVAC management API
// Entry point and command dispatch

use anyhow::Context;
use clap::{Parser, Subcommand};
use proclima_desk::api::{ClientKind, ProjectStatus};
use proclima_desk::app::{resolve_data_dir, AppState};
use proclima_desk::commands::{self, ListArgs};
use proclima_desk::config::DEFAULT_LOCATION_CODE;
use proclima_desk::services::clients::{ClientForm, ProjectForm};
use proclima_desk::services::materials::MaterialForm;
use proclima_desk::services::projects::ConsumeRequest;
use proclima_desk::services::stock::LocationFilter;
use proclima_desk::services::transfer::ExportFormat;
use proclima_desk::services::users::StatusFilter;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "proclima-desk", version, about = "Proclima back-office client")]
struct Cli {
    /// Directory holding settings.json and session.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// API base URL, overriding settings and PROCLIMA_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with phone and password
    Login {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Search projects, clients, materials and stock
    Search {
        query: String,
        /// All matches instead of the first few per group
        #[arg(long)]
        all: bool,
    },
    #[command(subcommand)]
    Clients(ClientsCommand),
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Materials(MaterialsCommand),
    #[command(subcommand)]
    Stock(StockCommand),
    #[command(subcommand)]
    Workers(WorkersCommand),
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Subcommand)]
enum ClientsCommand {
    List {
        /// Server-side search
        #[arg(long)]
        q: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Client details with projects and material costs
    Show {
        id: i64,
        #[command(flatten)]
        list: ListArgs,
    },
    Create {
        #[arg(long)]
        name: String,
        /// PF (individual) or PJ (company)
        #[arg(long = "type", default_value = "PF")]
        kind: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long, default_value = "")]
        cui: String,
        #[arg(long, default_value = "")]
        cnp: String,
    },
    Deactivate { id: i64 },
    /// Create a project for a client
    AddProject {
        client_id: i64,
        #[arg(long)]
        title: String,
        /// Defaults to the client's address
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long)]
        status: Option<ProjectStatus>,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    Show { client_id: i64, project_id: i64 },
    Status {
        project_id: i64,
        status: ProjectStatus,
    },
    /// Consume material from stock into a project
    Consume {
        client_id: i64,
        project_id: i64,
        #[arg(long)]
        material: i64,
        #[arg(long)]
        qty: f64,
        #[arg(long, default_value = DEFAULT_LOCATION_CODE)]
        location: String,
        /// Unit price overriding the list price
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Assign workers (admins only)
    Assign {
        project_id: i64,
        #[arg(required = true)]
        worker_ids: Vec<i64>,
        #[arg(long)]
        note: Option<String>,
    },
    Unassign { project_id: i64, worker_id: i64 },
}

#[derive(Subcommand)]
enum MaterialsCommand {
    List {
        #[arg(long)]
        q: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long, default_value = "")]
        sku: String,
        /// Accepts `,` or `.` decimals
        #[arg(long, default_value = "")]
        price: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    Deactivate { id: i64 },
    /// Import a CSV sheet into stock
    Import {
        file: PathBuf,
        #[arg(long)]
        location: Option<String>,
        /// Show the parsed rows without sending them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum StockCommand {
    List {
        /// Location code or ALL
        #[arg(long)]
        location: Option<LocationFilter>,
        #[command(flatten)]
        list: ListArgs,
    },
    In {
        #[arg(long)]
        material: i64,
        #[arg(long)]
        qty: f64,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Set the absolute quantity at a location
    Adjust {
        #[arg(long)]
        material: i64,
        #[arg(long)]
        qty: f64,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    Remove {
        #[arg(long)]
        material: i64,
        #[arg(long)]
        location: Option<String>,
    },
    /// Write the stock view to a TSV or CSV file
    Export {
        /// Location code or ALL
        #[arg(long, default_value = "ALL")]
        location: LocationFilter,
        #[arg(long, default_value = "tsv")]
        format: ExportFormat,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[command(flatten)]
        list: ListArgs,
    },
}

#[derive(Subcommand)]
enum WorkersCommand {
    List {
        #[arg(long)]
        q: Option<String>,
        /// Include inactive workers
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        list: ListArgs,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    List {
        /// all, active or inactive
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long)]
        role: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proclima_desk=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = resolve_data_dir(cli.data_dir)?;
    let state = AppState::init(&data_dir, cli.api_url.as_deref())
        .await
        .context("failed to initialize")?;

    let output = run(&state, cli.command).await?;
    println!("{}", output);
    Ok(())
}

async fn run(state: &AppState, command: Command) -> proclima_desk::error::Result<String> {
    let default_location = state.settings.default_location.clone();
    let location_or_default = |location: Option<String>| location.unwrap_or_else(|| default_location.clone());

    match command {
        Command::Login { phone, password } => commands::session::login(state, &phone, &password).await,
        Command::Logout => commands::session::logout(state).await,
        Command::Whoami => commands::session::whoami(state).await,
        Command::Search { query, all } => commands::search::search(state, &query, all).await,

        Command::Clients(cmd) => match cmd {
            ClientsCommand::List { q, list } => commands::clients::list(state, q.as_deref(), &list).await,
            ClientsCommand::Show { id, list } => commands::clients::show(state, id, &list).await,
            ClientsCommand::Create {
                name,
                kind,
                phone,
                email,
                address,
                note,
                cui,
                cnp,
            } => {
                let kind = kind
                    .parse::<ClientKind>()
                    .map_err(proclima_desk::error::AppError::Validation)?;
                let form = ClientForm {
                    name,
                    kind: Some(kind),
                    phone,
                    email,
                    address,
                    note,
                    cui,
                    cnp,
                };
                commands::clients::create(state, form).await
            }
            ClientsCommand::Deactivate { id } => commands::clients::deactivate(state, id).await,
            ClientsCommand::AddProject {
                client_id,
                title,
                address,
                status,
            } => {
                let form = ProjectForm {
                    title,
                    address,
                    status,
                };
                commands::clients::add_project(state, client_id, form).await
            }
        },

        Command::Project(cmd) => match cmd {
            ProjectCommand::Show { client_id, project_id } => {
                commands::projects::show(state, client_id, project_id).await
            }
            ProjectCommand::Status { project_id, status } => {
                commands::projects::set_status(state, project_id, status).await
            }
            ProjectCommand::Consume {
                client_id,
                project_id,
                material,
                qty,
                location,
                price,
                note,
            } => {
                let req = ConsumeRequest {
                    material_id: material,
                    location_code: location.trim().to_uppercase(),
                    qty,
                    unit_price: price,
                    note,
                };
                commands::projects::consume(state, client_id, project_id, req).await
            }
            ProjectCommand::Assign {
                project_id,
                worker_ids,
                note,
            } => commands::projects::assign(state, project_id, &worker_ids, note.as_deref()).await,
            ProjectCommand::Unassign { project_id, worker_id } => {
                commands::projects::unassign(state, project_id, worker_id).await
            }
        },

        Command::Materials(cmd) => match cmd {
            MaterialsCommand::List { q, list } => commands::materials::list(state, q.as_deref(), &list).await,
            MaterialsCommand::Create {
                name,
                unit,
                sku,
                price,
                category,
            } => {
                let form = MaterialForm {
                    name,
                    unit,
                    sku,
                    price,
                    category,
                    active: None,
                };
                commands::materials::create(state, form).await
            }
            MaterialsCommand::Deactivate { id } => commands::materials::deactivate(state, id).await,
            MaterialsCommand::Import {
                file,
                location,
                dry_run,
            } => {
                let location = location_or_default(location);
                commands::materials::import(state, &location, &file, dry_run).await
            }
        },

        Command::Stock(cmd) => match cmd {
            StockCommand::List { location, list } => {
                let location = match location {
                    Some(location) => location,
                    None => LocationFilter::Code(default_location.to_uppercase()),
                };
                commands::stock::list(state, &location, &list).await
            }
            StockCommand::In {
                material,
                qty,
                location,
                price,
                note,
            } => {
                let location = location_or_default(location);
                commands::stock::stock_in(state, material, &location, qty, price, note.as_deref()).await
            }
            StockCommand::Adjust {
                material,
                qty,
                location,
                note,
            } => {
                let location = location_or_default(location);
                commands::stock::adjust(state, material, &location, qty, note.as_deref()).await
            }
            StockCommand::Remove { material, location } => {
                let location = location_or_default(location);
                commands::stock::remove(state, material, &location).await
            }
            StockCommand::Export {
                location,
                format,
                out_dir,
                list,
            } => commands::stock::export(state, &location, &list, format, &out_dir).await,
        },

        Command::Workers(cmd) => match cmd {
            WorkersCommand::List { q, all, list } => {
                commands::workers::list(state, q.as_deref(), all, &list).await
            }
            WorkersCommand::Create { name, phone } => {
                commands::workers::create(state, &name, phone.as_deref()).await
            }
        },

        Command::Users(cmd) => match cmd {
            UsersCommand::List { status, role, list } => {
                commands::users::list(state, status, role.as_deref(), &list).await
            }
        },
    }
}
