//! End-to-end scenarios driven through the orchestrator with fake
//! collaborators in place of Telegram, OpenAI and the track CDN.

pub mod flow_tests;
pub mod pipeline_tests;
pub mod support;
