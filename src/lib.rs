pub mod backup_manager;
pub mod collector;
pub mod config;
pub mod delay_manager;
pub mod enricher;
pub mod extractor;
pub mod input_loader;
pub mod logger;
pub mod records;
pub mod session;

// Exporting types for convenience
pub use config::{CollectorConfig, EnricherConfig};
pub use extractor::DetailFields;
pub use input_loader::InputRow;
pub use records::{EnrichedColumns, EnrichedRecord, ListingRecord};
pub use session::{Session, SessionError};
