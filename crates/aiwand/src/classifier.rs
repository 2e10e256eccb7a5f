//! Classification engine: prompt-based grading on top of structured dispatch.
//!
//! The model is asked for a `grade` (and optionally its `reasoning`) from a
//! fixed choice set; the grade is reconciled against the set and mapped to
//! its score.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use aiwand_core::{AiError, Message, Provider, ResponseSchema, Result};

use crate::dispatch::{decode_completion, DispatchRequest};
use crate::wand::AiWand;

/// Template used when an expected answer is supplied.
pub const COMPARISON_TEMPLATE: &str = "Evaluate the given response by comparing it to the expected answer.

Question/Input: {input}
Given Response: {output}
Expected Response: {expected}

Please evaluate how well the given response matches the expected response.
Grade the response as: {choices}";

/// Template used when no expected answer is supplied.
pub const QUALITY_TEMPLATE: &str = "Evaluate the quality of the given response to the input.

Input: {input}
Response: {output}

Please evaluate the quality and appropriateness of the response.
Grade the response as: {choices}";

const QUALITY_GRADER_TEMPLATE: &str = "Evaluate the overall quality of the response.

Input: {input}
Response: {output}
Expected: {expected}

Consider factors like accuracy, completeness, clarity, and appropriateness.
Grade as: A (excellent), B (good), C (average), D (below average), F (poor)";

// ─────────────────────────────────────────────
// Choice set
// ─────────────────────────────────────────────

/// Case-normalized form used to compare labels (full Unicode lowercase).
fn fold(label: &str) -> String {
    label.to_lowercase()
}

/// Ordered label → score mapping. Non-empty; labels unique ignoring case.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceScores(Vec<(String, f64)>);

impl ChoiceScores {
    pub fn new<I, S>(choices: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, f64)> = Vec::new();
        for (label, score) in choices {
            let label = label.into();
            if label.trim().is_empty() {
                return Err(AiError::Validation("choice labels cannot be empty".into()));
            }
            let folded = fold(&label);
            if entries.iter().any(|(l, _)| fold(l) == folded) {
                return Err(AiError::Validation(format!(
                    "duplicate choice label '{label}'"
                )));
            }
            entries.push((label, score));
        }
        if entries.is_empty() {
            return Err(AiError::Validation("choice_scores cannot be empty".into()));
        }
        Ok(Self(entries))
    }

    /// `CORRECT` = 1.0, `INCORRECT` = 0.0.
    pub fn binary() -> Self {
        Self(vec![("CORRECT".into(), 1.0), ("INCORRECT".into(), 0.0)])
    }

    /// Letter grades `A` through `F`.
    pub fn letter_grades() -> Self {
        Self(vec![
            ("A".into(), 1.0),
            ("B".into(), 0.8),
            ("C".into(), 0.6),
            ("D".into(), 0.4),
            ("F".into(), 0.0),
        ])
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, score)| (label.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Match a model-supplied grade: exact first, then ignoring case.
    pub fn reconcile(&self, grade: &str) -> Option<(&str, f64)> {
        let grade = grade.trim();
        let folded = fold(grade);
        self.iter()
            .find(|(label, _)| *label == grade)
            .or_else(|| self.iter().find(|(label, _)| fold(label) == folded))
    }

    /// `A (1), B (0.8)` style listing for prompts.
    fn prompt_listing(&self) -> String {
        self.iter()
            .map(|(label, score)| format!("{label} ({score})"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn joined_labels(&self) -> String {
        self.labels().join(", ")
    }
}

impl Default for ChoiceScores {
    fn default() -> Self {
        Self::binary()
    }
}

impl Serialize for ChoiceScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in &self.0 {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}

// ─────────────────────────────────────────────
// Request / response
// ─────────────────────────────────────────────

/// Inputs of a single grading call.
#[derive(Clone, Debug)]
pub struct ClassifyRequest {
    pub input: String,
    pub output: String,
    /// Reference answer; blank means "grade on quality alone".
    pub expected: String,
    /// Custom template with `{input}`, `{output}`, `{expected}`, `{choices}`.
    pub prompt_template: Option<String>,
    pub choice_scores: ChoiceScores,
    pub use_reasoning: bool,
    pub model: Option<String>,
    pub provider: Option<Provider>,
}

impl ClassifyRequest {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            expected: String::new(),
            prompt_template: None,
            choice_scores: ChoiceScores::default(),
            use_reasoning: true,
            model: None,
            provider: None,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn choice_scores(mut self, choices: ChoiceScores) -> Self {
        self.choice_scores = choices;
        self
    }

    pub fn use_reasoning(mut self, use_reasoning: bool) -> Self {
        self.use_reasoning = use_reasoning;
        self
    }

    pub fn model(mut self, model: Option<impl Into<String>>) -> Self {
        self.model = model.map(Into::into);
        self
    }

    pub fn provider(mut self, provider: Option<Provider>) -> Self {
        self.provider = provider;
        self
    }
}

/// Outcome of a grading call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifierResponse {
    pub score: f64,
    pub choice: String,
    /// Empty unless reasoning was requested.
    pub reasoning: String,
    pub metadata: ClassifierMetadata,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifierMetadata {
    /// Model that produced the grade.
    pub model: String,
    pub provider: Provider,
    pub choices_available: Vec<String>,
    pub choice_scores: ChoiceScores,
    /// Copy of non-empty reasoning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Deserialize)]
struct GradeAnswer {
    grade: String,
    #[serde(default)]
    reasoning: String,
}

// ─────────────────────────────────────────────
// Prompt construction
// ─────────────────────────────────────────────

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(input|output|expected|choices)\}").unwrap())
}

/// Fill template placeholders in one pass, so substituted text is never rescanned.
fn render_template(template: &str, request: &ClassifyRequest) -> String {
    let choices = request.choice_scores.prompt_listing();
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "input" => request.input.clone(),
            "output" => request.output.clone(),
            "expected" => request.expected.clone(),
            _ => choices.clone(),
        })
        .into_owned()
}

fn grading_system_prompt(choices: &ChoiceScores, use_reasoning: bool) -> String {
    let instruction = if use_reasoning {
        "Provide your step-by-step reasoning in the 'reasoning' field, then your final grade in the 'grade' field."
    } else {
        "Provide your final grade in the 'grade' field."
    };
    format!(
        "You are an AI classifier and grader. Evaluate responses according to the given criteria.\n\n\
         Available grades: {}\n\n\
         {instruction}\n\n\
         Your grade must be exactly one of the specified options.",
        choices.joined_labels()
    )
}

fn grade_schema(choices: &ChoiceScores, use_reasoning: bool) -> ResponseSchema {
    let grade_description = format!("Final grade, must be one of: {}", choices.joined_labels());
    if use_reasoning {
        ResponseSchema::string_object(
            "classification",
            &[
                ("reasoning", "Step-by-step analysis and reasoning"),
                ("grade", grade_description.as_str()),
            ],
        )
    } else {
        ResponseSchema::string_object("classification", &[("grade", grade_description.as_str())])
    }
}

fn select_template(request: &ClassifyRequest) -> &str {
    match request.prompt_template.as_deref() {
        Some(custom) if !custom.trim().is_empty() => custom,
        _ if !request.expected.trim().is_empty() => COMPARISON_TEMPLATE,
        _ => QUALITY_TEMPLATE,
    }
}

// ─────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────

impl AiWand {
    /// Grade `output` against `input` (and `expected`, if given).
    pub async fn classify_text(&self, request: ClassifyRequest) -> Result<ClassifierResponse> {
        if request.input.trim().is_empty() {
            return Err(AiError::Validation("input_text cannot be empty".into()));
        }
        if request.output.trim().is_empty() {
            return Err(AiError::Validation("output_text cannot be empty".into()));
        }
        if request.choice_scores.is_empty() {
            return Err(AiError::Validation("choice_scores cannot be empty".into()));
        }

        let choices = &request.choice_scores;
        let prompt = render_template(select_template(&request), &request);

        let dispatch = DispatchRequest::new()
            .messages(vec![Message::user(prompt)])
            .system_prompt(grading_system_prompt(choices, request.use_reasoning))
            .response_schema(grade_schema(choices, request.use_reasoning))
            .temperature(0.0)
            .model(request.model.clone())
            .provider(request.provider);

        let completion = self.dispatch_with_target(dispatch).await?;
        let provider = completion.provider;
        let model = completion.model.clone();
        let answer: GradeAnswer = decode_completion(completion)?;

        let (choice, score) = choices.reconcile(&answer.grade).ok_or_else(|| {
            AiError::Request(format!(
                "Invalid grade '{}' received. Expected one of: {}",
                answer.grade,
                choices.joined_labels()
            ))
        })?;
        debug!(grade = %answer.grade, choice, score, "Classified response");

        let reasoning = if request.use_reasoning {
            answer.reasoning
        } else {
            String::new()
        };
        let rationale = (!reasoning.is_empty()).then(|| reasoning.clone());

        Ok(ClassifierResponse {
            score,
            choice: choice.to_string(),
            reasoning,
            metadata: ClassifierMetadata {
                model,
                provider,
                choices_available: choices.labels(),
                choice_scores: choices.clone(),
                rationale,
            },
        })
    }

    /// A reusable grader bound to this wand.
    pub fn create_classifier(
        self: &Arc<Self>,
        prompt_template: impl Into<String>,
        choice_scores: ChoiceScores,
    ) -> Classifier {
        Classifier::new(Arc::clone(self), prompt_template, choice_scores)
    }
}

/// A grader with a bound template, choice set, and model selection.
#[derive(Clone)]
pub struct Classifier {
    wand: Arc<AiWand>,
    prompt_template: String,
    choice_scores: ChoiceScores,
    use_reasoning: bool,
    model: Option<String>,
    provider: Option<Provider>,
}

impl Classifier {
    pub fn new(
        wand: Arc<AiWand>,
        prompt_template: impl Into<String>,
        choice_scores: ChoiceScores,
    ) -> Self {
        Self {
            wand,
            prompt_template: prompt_template.into(),
            choice_scores,
            use_reasoning: true,
            model: None,
            provider: None,
        }
    }

    /// Pass/fail grader on the given criterion (e.g. "correctness").
    pub fn binary(wand: Arc<AiWand>, criteria: &str) -> Self {
        let template = format!(
            "Evaluate the {criteria} of the response.\n\n\
             Input: {{input}}\n\
             Response: {{output}}\n\
             Expected: {{expected}}\n\n\
             Is the response correct and appropriate? Grade as CORRECT or INCORRECT."
        );
        Self::new(wand, template, ChoiceScores::binary())
    }

    /// Letter-grade quality grader.
    pub fn quality(wand: Arc<AiWand>) -> Self {
        Self::new(wand, QUALITY_GRADER_TEMPLATE, ChoiceScores::letter_grades())
    }

    pub fn use_reasoning(mut self, use_reasoning: bool) -> Self {
        self.use_reasoning = use_reasoning;
        self
    }

    pub fn model(mut self, model: Option<impl Into<String>>) -> Self {
        self.model = model.map(Into::into);
        self
    }

    pub fn provider(mut self, provider: Option<Provider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn choice_scores(&self) -> &ChoiceScores {
        &self.choice_scores
    }

    pub async fn classify(
        &self,
        input: &str,
        output: &str,
        expected: &str,
    ) -> Result<ClassifierResponse> {
        self.classify_with(input, output, expected, None, None).await
    }

    /// Classify, overriding the bound model and/or provider for this call.
    pub async fn classify_with(
        &self,
        input: &str,
        output: &str,
        expected: &str,
        model: Option<&str>,
        provider: Option<Provider>,
    ) -> Result<ClassifierResponse> {
        let request = ClassifyRequest::new(input, output)
            .expected(expected)
            .prompt_template(self.prompt_template.clone())
            .choice_scores(self.choice_scores.clone())
            .use_reasoning(self.use_reasoning)
            .model(model.map(str::to_string).or_else(|| self.model.clone()))
            .provider(provider.or(self.provider));
        self.wand.classify_text(request).await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestWand;
    use aiwand_core::Role;

    fn grade_reply(grade: &str, reasoning: &str) -> std::result::Result<String, aiwand_providers::ClientError> {
        Ok(serde_json::json!({ "reasoning": reasoning, "grade": grade }).to_string())
    }

    #[test]
    fn test_choice_scores_validation() {
        assert!(matches!(
            ChoiceScores::new(Vec::<(String, f64)>::new()),
            Err(AiError::Validation(_))
        ));
        assert!(matches!(
            ChoiceScores::new([("Yes", 1.0), ("YES", 0.5)]),
            Err(AiError::Validation(_))
        ));
        assert!(matches!(
            ChoiceScores::new([(" ", 1.0)]),
            Err(AiError::Validation(_))
        ));
        let choices = ChoiceScores::new([("Yes", 1.0), ("No", 0.0)]).unwrap();
        assert_eq!(choices.labels(), vec!["Yes", "No"]);
    }

    #[test]
    fn test_reconcile_exact_then_case_insensitive() {
        let choices = ChoiceScores::new([("Good", 1.0), ("bad", 0.0)]).unwrap();
        assert_eq!(choices.reconcile("Good"), Some(("Good", 1.0)));
        assert_eq!(choices.reconcile(" BAD "), Some(("bad", 0.0)));
        assert_eq!(choices.reconcile("meh"), None);
    }

    #[test]
    fn test_labels_fold_beyond_ascii() {
        let choices = ChoiceScores::new([("ÜBER", 1.0), ("UNTER", 0.0)]).unwrap();
        assert_eq!(choices.reconcile("über"), Some(("ÜBER", 1.0)));
        assert_eq!(choices.reconcile("Unter"), Some(("UNTER", 0.0)));

        assert!(matches!(
            ChoiceScores::new([("Éclair", 1.0), ("éclair", 0.0)]),
            Err(AiError::Validation(_))
        ));
    }

    #[test]
    fn test_choice_scores_serialize_in_order() {
        let json = serde_json::to_string(&ChoiceScores::letter_grades()).unwrap();
        assert_eq!(json, r#"{"A":1.0,"B":0.8,"C":0.6,"D":0.4,"F":0.0}"#);
    }

    #[test]
    fn test_template_selection() {
        let base = ClassifyRequest::new("q", "a");
        assert_eq!(select_template(&base), QUALITY_TEMPLATE);
        assert_eq!(select_template(&base.clone().expected("x")), COMPARISON_TEMPLATE);
        assert_eq!(select_template(&base.clone().expected("   ")), QUALITY_TEMPLATE);
        assert_eq!(
            select_template(&base.clone().expected("x").prompt_template("Rate {output}")),
            "Rate {output}"
        );
        assert_eq!(select_template(&base.prompt_template("  ")), QUALITY_TEMPLATE);
    }

    #[test]
    fn test_render_template_single_pass() {
        let request = ClassifyRequest::new("say {output}", "4").expected("4");
        let rendered = render_template("{input} -> {output} [{expected}] {choices}", &request);
        assert_eq!(rendered, "say {output} -> 4 [4] CORRECT (1), INCORRECT (0)");
    }

    #[test]
    fn test_grade_schema_fields() {
        let choices = ChoiceScores::binary();
        assert_eq!(grade_schema(&choices, true).required_fields(), vec!["reasoning", "grade"]);
        assert_eq!(grade_schema(&choices, false).required_fields(), vec!["grade"]);
    }

    #[tokio::test]
    async fn test_case_insensitive_grade_maps_to_label() {
        let t = TestWand::openai_only();
        t.openai.reply(grade_reply("correct", "2+2 is 4"));

        let response = t
            .wand
            .classify_text(ClassifyRequest::new("What is 2+2?", "4").expected("4"))
            .await
            .unwrap();

        assert_eq!(response.score, 1.0);
        assert_eq!(response.choice, "CORRECT");
        assert_eq!(response.reasoning, "2+2 is 4");
        assert_eq!(response.metadata.provider, Provider::OpenAi);
        assert_eq!(response.metadata.model, "gpt-4o");
        assert_eq!(response.metadata.choices_available, vec!["CORRECT", "INCORRECT"]);
        assert_eq!(response.metadata.rationale.as_deref(), Some("2+2 is 4"));

        let json = serde_json::to_value(&response.metadata).unwrap();
        assert_eq!(json["rationale"], "2+2 is 4");
    }

    #[tokio::test]
    async fn test_request_shape() {
        let t = TestWand::openai_only();
        t.openai.reply(grade_reply("CORRECT", ""));

        t.wand
            .classify_text(ClassifyRequest::new("What is 2+2?", "4").expected("4"))
            .await
            .unwrap();

        let call = &t.openai.calls()[0];
        assert_eq!(call.request.temperature, 0.0);
        let messages = &call.request.messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), Role::System);
        assert!(messages[0].content().contains("Available grades: CORRECT, INCORRECT"));
        assert!(messages[1].content().contains("Expected Response: 4"));
        assert!(messages[1].content().contains("CORRECT (1), INCORRECT (0)"));
        assert!(call.request.response_format.is_some());
    }

    #[tokio::test]
    async fn test_unknown_grade_is_request_error() {
        let t = TestWand::openai_only();
        t.openai.reply(grade_reply("MAYBE", ""));

        let err = t
            .wand
            .classify_text(ClassifyRequest::new("q", "a"))
            .await
            .unwrap_err();
        let AiError::Request(message) = err else {
            panic!("expected request error");
        };
        assert!(message.contains("Invalid grade 'MAYBE'"));
        assert!(message.contains("CORRECT, INCORRECT"));
    }

    #[tokio::test]
    async fn test_blank_inputs_rejected_before_dispatch() {
        let t = TestWand::openai_only();
        for request in [ClassifyRequest::new(" ", "a"), ClassifyRequest::new("q", "\n")] {
            let err = t.wand.classify_text(request).await.unwrap_err();
            assert!(matches!(err, AiError::Validation(_)));
        }
        assert!(t.openai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reasoning_dropped_when_not_requested() {
        let t = TestWand::openai_only();
        t.openai.reply(grade_reply("CORRECT", "ignored"));

        let response = t
            .wand
            .classify_text(ClassifyRequest::new("q", "a").use_reasoning(false))
            .await
            .unwrap();
        assert_eq!(response.reasoning, "");
        assert_eq!(response.metadata.rationale, None);
        let json = serde_json::to_value(&response.metadata).unwrap();
        assert!(json.get("rationale").is_none());
        assert!(t.openai.calls()[0].request.messages[0]
            .content()
            .contains("Provide your final grade in the 'grade' field."));
    }

    #[tokio::test]
    async fn test_classifier_reuse_is_independent() {
        let t = TestWand::both();
        let wand = Arc::new(t.wand);
        t.openai.reply(grade_reply("A", "great"));
        t.openai.reply(grade_reply("d", "weak"));

        let grader = Classifier::quality(wand.clone());
        let first = grader.classify("q1", "a1", "").await.unwrap();
        let second = grader.classify("q2", "a2", "").await.unwrap();

        assert_eq!((first.choice.as_str(), first.score), ("A", 1.0));
        assert_eq!((second.choice.as_str(), second.score), ("D", 0.4));
        assert_eq!(first.metadata.choice_scores, ChoiceScores::letter_grades());
        assert_eq!(second.metadata.choice_scores, ChoiceScores::letter_grades());
        assert!(t.openai.calls()[1].request.messages[1].content().contains("q2"));
    }

    #[tokio::test]
    async fn test_classifier_overrides_provider_per_call() {
        let t = TestWand::both();
        let wand = Arc::new(t.wand);
        t.gemini.reply(grade_reply("INCORRECT", "no"));

        let grader = Classifier::binary(wand.clone(), "relevance").model(Some("gpt-4o-mini"));
        let response = grader
            .classify_with("q", "a", "b", Some("gemini-2.5-flash"), Some(Provider::Gemini))
            .await
            .unwrap();

        assert_eq!(response.metadata.provider, Provider::Gemini);
        assert_eq!(response.metadata.model, "gemini-2.5-flash");
        let call = &t.gemini.calls()[0];
        assert!(call.schema.is_some());
        assert!(call.request.messages[1].content().contains("Evaluate the relevance"));
    }

    #[tokio::test]
    async fn test_create_classifier_binds_template() {
        let t = TestWand::openai_only();
        let wand = Arc::new(t.wand);
        t.openai.reply(grade_reply("PARTIAL", "half right"));

        let choices =
            ChoiceScores::new([("CORRECT", 1.0), ("PARTIAL", 0.5), ("INCORRECT", 0.0)]).unwrap();
        let grader = wand.create_classifier("Grade: {input} -> {output} ({expected})", choices);
        let response = grader.classify("2+2", "5", "4").await.unwrap();

        assert_eq!(response.score, 0.5);
        assert_eq!(
            t.openai.calls()[0].request.messages[1].content(),
            "Grade: 2+2 -> 5 (4)"
        );
    }
}
