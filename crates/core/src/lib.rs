pub mod error;
pub mod intent;
pub mod models;
pub mod normalize;
pub mod payload;
pub mod prompt;

pub use error::{NormalizeError, PayloadError, QueryError};
pub use intent::{classify_intent_rules, detect_category, RuleClassification};
pub use models::*;
pub use normalize::extract_json_object;
pub use payload::{interpret_provider_object, ProviderVerdict};
pub use prompt::build_intent_prompt;
