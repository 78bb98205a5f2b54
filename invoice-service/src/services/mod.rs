pub mod crm;
pub mod encode;
pub mod pipeline;

pub use crm::{CreateResult, CrmClient, CrmError, MockCrmClient, SalesforceClient};
pub use encode::Base64StreamEncoder;
pub use pipeline::{process_event, run_pipeline, PipelineError};
