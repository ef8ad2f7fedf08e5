mod flush_service;
mod stats_service;
mod url_service;

pub use flush_service::{FlushReport, FlushService};
pub use stats_service::{StatsService, UrlPage, UrlStats};
pub use url_service::UrlService;
