// Library interface for financebot modules
// This allows tests and the binary to import modules

pub mod ingestion;
pub mod llm;
pub mod pipeline;
pub mod push;
pub mod report;
pub mod schedule;
pub mod scraping;
pub mod worker;
