//! Clarify: advisory check of whether a brief carries enough context.

use tracing::{info, instrument};

use super::{Stage, StageError};
use crate::core::policy::STRUCTURED_RETRIES;
use crate::core::prompt::brief_summary;
use crate::core::types::{Brief, ClarificationResult};
use crate::io::provider::{Provider, generate_structured};
use crate::io::resources::ResourceChain;

/// Ask the model whether `brief` needs clarification.
///
/// The result is advisory; callers must not block core synthesis on it.
#[instrument(skip_all, fields(topic = %brief.topic))]
pub fn clarify<P: Provider + ?Sized>(
    brief: &Brief,
    provider: &P,
    resources: &ResourceChain,
) -> Result<ClarificationResult, StageError> {
    let system = resources
        .template("clarify")
        .map_err(|err| StageError::from_anyhow(Stage::Clarify, &err))?;
    let user = brief_summary(brief).map_err(|err| StageError::from_anyhow(Stage::Clarify, &err))?;

    let result: ClarificationResult =
        generate_structured(provider, &system, &user, STRUCTURED_RETRIES)
            .map_err(|err| StageError::from_anyhow(Stage::Clarify, &err).with_prompt(&system))?;
    info!(
        needs_clarification = result.needs_clarification,
        questions = result.questions.len(),
        "clarify finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProvider, sample_brief};

    #[test]
    fn sends_template_and_brief_summary() {
        let provider = ScriptedProvider::texts([
            r#"{"needs_clarification": true, "questions": ["Which team?", "What changed?"]}"#,
        ]);
        let brief = sample_brief();
        let result = clarify(&brief, &provider, &ResourceChain::bundled()).expect("clarify");
        assert!(result.needs_clarification);
        assert_eq!(result.questions.len(), 2);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].system,
            ResourceChain::bundled().template("clarify").expect("template")
        );
        assert!(calls[0].user.starts_with(&format!("Topic: {}", brief.topic)));
    }

    #[test]
    fn exhausted_retries_become_stage_error() {
        let provider = ScriptedProvider::texts(["no", "still no", "nope"]);
        let err = clarify(&sample_brief(), &provider, &ResourceChain::bundled()).unwrap_err();
        assert_eq!(err.stage, Stage::Clarify);
        assert!(err.message.contains("after 3 attempts"), "{}", err.message);
        assert!(err.system_prompt.is_some());
        assert_eq!(provider.calls().len(), 3);
    }
}
