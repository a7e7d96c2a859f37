pub mod carbon;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ledger;
pub mod types;

pub use carbon::{CarbonEntry, CarbonTable};
pub use config::LunchboxConfig;
pub use enrich::enrich;
pub use error::{AnalysisError, CarbonTableError, ConfigError};
pub use types::{
    Analysis, CarbonFootprint, Detection, Product, ProductCarbon, Recipe, ScanId, ScanRecord,
    SustainableAlternative, UserId, UserLedger,
};
