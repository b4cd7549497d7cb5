use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use services::{
    AppServices, Clock, FailureCategory, GenerateStudySetRequest, GenerationError,
    GenerationRequest, StudyConfig, TextGenerator,
};
use storage::repository::Storage;
use study_core::AggregationPolicy;
use study_core::model::StudyMode;
use study_core::time::fixed_now;

const QUIZ: &str = "\
1. **Which organelle produces ATP?**
a) Nucleus
b) [CORRECT] Mitochondria
c) Ribosome
d) Golgi apparatus
---
2. What carries genetic information?
(a) Lipids
(b) Glucose
(c) [CORRECT] DNA
(d) Water
---
3. Which process makes proteins?
a) Translation ✓
b) Osmosis
c) Diffusion
d) Glycolysis
---
Thanks for using the quiz generator!";

struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if request.document.is_some() {
            Ok(QUIZ.to_owned())
        } else {
            Ok(r#"{"isCorrect": true, "explanation": "Same meaning."}"#.to_owned())
        }
    }
}

fn upload() -> GenerateStudySetRequest {
    GenerateStudySetRequest::from_json(
        r#"[{"name": "cells.pdf", "data": "data:application/pdf;base64,JVBERi0xLjQ="}]"#,
    )
    .expect("upload json")
}

async fn services(db: &str, clock: Clock, policy: AggregationPolicy) -> AppServices {
    let storage = Storage::sqlite(&format!("sqlite:file:{db}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite");
    let config = StudyConfig {
        policy,
        ..StudyConfig::default()
    };
    AppServices::from_storage(&storage, clock, config, Arc::new(CannedGenerator))
}

#[tokio::test]
async fn generate_then_practice_then_overview() {
    let mut clock = Clock::fixed(fixed_now());
    let app = services("memdb_study_flow", clock, AggregationPolicy::LatestPerMode).await;

    let generated = app.study_sets().generate(&upload()).await.expect("generate");
    assert_eq!(generated.total_blocks, 4);
    assert_eq!(generated.questions.len(), 3);

    let set = app
        .study_sets()
        .get_study_set(generated.study_set_id)
        .await
        .expect("get");
    assert_eq!(set.title(), "cells.pdf");
    let definitions: Vec<&str> = set.terms().iter().map(|t| t.definition()).collect();
    // The third question has no tag, so its answer falls back to B.
    assert_eq!(definitions, vec!["Mitochondria", "DNA", "Osmosis"]);

    for (mode, score) in [(StudyMode::Quiz, 2), (StudyMode::Test, 1), (StudyMode::Quiz, 3)] {
        clock.advance(Duration::minutes(5));
        let app = services("memdb_study_flow", clock, AggregationPolicy::LatestPerMode).await;
        app.progress()
            .record(set.id(), mode, score)
            .await
            .expect("record");
    }

    let latest = app.progress().overview(set.id()).await.expect("overview");
    // (3 + 1) / (3 * 2) = 66.7%
    assert_eq!(latest.overall, 67);
    assert_eq!(latest.mastered, 3);
    assert_eq!(latest.total_terms, 3);

    let all = services("memdb_study_flow", clock, AggregationPolicy::SumAllRecords)
        .await
        .progress()
        .overview(set.id())
        .await
        .expect("overview");
    // (2 + 1 + 3) / (3 * 3) = 66.7%; the 3/3 quiz masters every term.
    assert_eq!(all.overall, 67);
    assert_eq!(all.mastered, 3);

    let history = app
        .progress()
        .history(set.id(), Some(StudyMode::Quiz))
        .await
        .expect("history");
    let scores: Vec<u32> = history.iter().map(|r| r.score()).collect();
    assert_eq!(scores, vec![3, 2]);
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_generation() {
    let app = services(
        "memdb_study_flow_oversized",
        Clock::fixed(fixed_now()),
        AggregationPolicy::default(),
    )
    .await;
    let big = "A".repeat(6 * 1024 * 1024);
    let request = GenerateStudySetRequest::from_json(&format!(
        r#"[{{"name": "huge.pdf", "data": "{big}"}}]"#
    ))
    .expect("upload json");

    let err = app.study_sets().generate(&request).await.unwrap_err();
    assert_eq!(err.category(), FailureCategory::RequestShape);
    assert!(app.study_sets().list_study_sets(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn answer_checker_uses_generator_verdict() {
    let app = services(
        "memdb_study_flow_answers",
        Clock::fixed(fixed_now()),
        AggregationPolicy::default(),
    )
    .await;
    let verdict = app.answers().check("powerhouse of the cell", "mitochondria").await;
    assert!(verdict.is_correct);
    assert_eq!(verdict.explanation, "Same meaning.");
}
