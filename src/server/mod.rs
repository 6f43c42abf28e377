//! HTTP server layer for the tiler.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET {prefix}/tiles/{z}/{x}/{y}?url={locator}             │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    urls     │  │        routes           │  │
//! │  │ (requests)  │  │ (linking)   │  │  (route table, router)  │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;
pub mod urls;
pub mod viewer;

pub use handlers::{
    health_handler, map_handler, metadata_handler, stylejson_handler, tile_handler,
    tilejson_handler, AppState, ArchiveQuery, ErrorResponse, HealthResponse, TilePathParams,
};
pub use routes::{create_router, endpoint, route_table, RouterConfig, HEALTH_PATH};
pub use urls::{PathTemplate, RequestContext, Route, RouteTable, RouteTableBuilder, UrlComposer};
pub use viewer::generate_viewer_html;
