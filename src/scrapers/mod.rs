mod auto_ria;

pub use auto_ria::{AutoRiaScraper, ScrapeSummary};
