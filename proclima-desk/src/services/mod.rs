//! Services module
//!
//! Business logic that sits between the CLI commands and the API repository.

pub mod autocomplete;
pub mod clients;
pub mod costs;
pub mod listing;
pub mod materials;
pub mod projects;
pub mod search;
pub mod session;
pub mod settings;
pub mod stock;
pub mod transfer;
pub mod users;
pub mod workers;

pub use autocomplete::LatestLookup;
pub use clients::ClientsService;
pub use listing::{ListState, PageView, SortDirection};
pub use materials::MaterialsService;
pub use projects::ProjectsService;
pub use search::SearchService;
pub use session::{Gate, SessionService, SessionStore};
pub use settings::{ClientSettings, SettingsService};
pub use stock::{LocationFilter, StockService};
pub use users::UsersService;
pub use workers::WorkersService;
