pub mod context;
pub mod eligibility;
pub mod extractor;
pub mod reporter;
pub mod sanitize;
pub mod settings;

pub use context::RequestContext;
pub use eligibility::{EligibilityFilter, Ineligible};
pub use extractor::{RequestMetadataExtractor, ResolvedHeaders};
pub use reporter::{Evaluation, VisitReport, VisitReporter};
