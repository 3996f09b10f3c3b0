//! Dashboard API: resolve handoffs and list leads.

pub mod reader;
pub mod routes;

pub use reader::LeadReader;
pub use routes::{DashboardState, dashboard_routes};
