//! Client for the paginated organizations/people business-information API.
//!
//! Every page of a search is fetched concurrently and merged into a single
//! [`DataTable`].
//!
//! ```no_run
//! use cbapi::config::config::ApiConfig;
//! use cbapi::{get_organizations, ApiClient, Query};
//!
//! # fn main() -> Result<(), cbapi::FetchError> {
//! let config = ApiConfig {
//!     api_key: Some("my-key".to_string()),
//!     ..ApiConfig::default()
//! };
//! let client = ApiClient::new(&config)?;
//!
//! let query = Query::new().with_name("MadlyRad Labs, Inc.");
//! match get_organizations(&client, &query)? {
//!     Some(table) => println!("{}", table.debug_dump()),
//!     None => println!("no matches"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod api_client;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod query;
pub mod record;
pub mod utils;

pub use api_client::{ApiClient, PageSource};
pub use coordinator::{fetch_all, FetchCoordinator};
pub use data::datatable::DataTable;
pub use error::FetchError;
pub use query::{EntityKind, Query};

/// Fetch every organization matching `query`, using all available cores.
pub fn get_organizations<S: PageSource>(
    source: &S,
    query: &Query,
) -> error::Result<Option<DataTable>> {
    FetchCoordinator::new(source).fetch(EntityKind::Organization, query)
}

/// Fetch every person matching `query`, using all available cores.
pub fn get_people<S: PageSource>(source: &S, query: &Query) -> error::Result<Option<DataTable>> {
    FetchCoordinator::new(source).fetch(EntityKind::Person, query)
}
