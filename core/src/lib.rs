//! Typed client for the public REST API of an ELMA365-style low-code
//! platform.
//!
//! # Overview
//! Adapters for app items ([`App`]), business processes ([`Proc`]) and disk
//! files ([`FileAdapter`]) sit on top of a single [`Transport`] seam. App
//! items are searched through the fluent [`Search`] builder, which can also
//! fetch a whole result set page by page on a bounded pool of threads.
//!
//! # Design
//! - Every operation is split into a `build_*` step that produces a plain
//!   [`HttpRequest`] and a network step that sends it and decodes the
//!   platform's `{success, error, ...}` envelope.
//! - All network calls take a [`CancellationToken`] as their context.
//! - [`UreqTransport`] is the default blocking HTTP transport; tests plug in
//!   their own `Transport`.
//!
//! ```no_run
//! use e365_gateway::{App, AppCommon, CancellationToken, Field, SearchFilter, Settings, Stand};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Product {
//!     #[serde(flatten)]
//!     common: AppCommon,
//!     #[serde(default)]
//!     price: f64,
//! }
//!
//! # fn main() -> Result<(), e365_gateway::ApiError> {
//! let stand = Stand::new("https://company.elma365.ru", None, "token");
//! let goods: App<Product> = App::new(&Settings::new(stand, "goods", "goods"));
//! let ctx = CancellationToken::new();
//!
//! let cheap = SearchFilter::new().field("price", Field::number().to(100.0));
//! let products = goods.search().filter(&cheap).all_at_once(&ctx, 10)?;
//! println!("{} cheap products", products.len());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod error;
pub mod file;
pub mod filter;
pub mod http;
pub mod model;
pub mod process;
pub mod search;
pub mod stand;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use app::App;
pub use error::ApiError;
pub use file::{Directory, FileAdapter};
pub use filter::{AppRef, Category, DateFilter, Field, Fields, NumberFilter, SearchFilter, SortExpression};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{
    AppCommon, DirectoryInfo, EmptyProcCtx, File, GroupItem, ItemStatus, ProcCommon, ProcTemplate, StatusInfo,
    StatusItem, STATE_DONE, STATE_EXEC,
};
pub use process::Proc;
pub use search::{PageRequest, PageResult, QuerySpec, Search, PAGE_UNIT};
pub use stand::{Settings, Stand};
pub use tokio_util::sync::CancellationToken;
pub use transport::{Transport, UreqTransport};
