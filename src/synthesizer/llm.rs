// ./src/synthesizer/llm.rs
//! Tier 4: LLM generation (spec §4.5), the last resort. Prompts the
//! Language Model with the function schema and the query, requires a JSON
//! object reply.
use crate::capabilities::{LanguageModel, ResponseFormat};
use crate::error::FnAgentResult;
use crate::model::function::FunctionRecord;
use serde_json::Value;

pub async fn synthesise_via_llm(model: &dyn LanguageModel, function: &FunctionRecord, query: &str) -> FnAgentResult<Value> {
    let prompt = vec![
        "You produce a single JSON object of arguments for the described \
         function, matching its parameter schema exactly. Reply with the \
         JSON object only, no commentary."
            .to_string(),
        format!("function: {}", function.name),
        format!("description: {}", function.description),
        format!("parameter_schema: {}", function.to_json_schema()),
        format!("query: {query}"),
    ];
    let raw = model.complete(&prompt, None, ResponseFormat::Json).await?;
    serde_json::from_str(raw.trim()).map_err(|e| {
        crate::error::FnAgentError::DeserializationError(format!(
            "Language Model did not return a JSON object for function '{}': {e}",
            function.name
        ))
    })
}
