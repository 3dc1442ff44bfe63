//! Randomized checks of the pipeline invariants.

mod common;

use common::snapshot;
use spider_select::{
    parse::extract_first_code_block, prepare_candidates, validate_decision, AttemptParams,
    ControllerState, DecisionExtractor, EscalationPolicy, FailureReason, FilterStats,
    ParsedDecision, RawElement, Relaxation, RetryController, Role, SelectorConfig, TaskSpec,
    TaskType,
};
use std::collections::HashSet;

const SEEDS: u64 = 64;

/// Roles whose names contain each other.
fn tricky_roles() -> Vec<Role> {
    vec![
        Role::List,
        Role::ListItem,
        Role::ListOption,
        Role::Link,
        Role::Button,
        Role::Textbox,
        Role::Searchbox,
        Role::Combobox,
        Role::Checkbox,
        Role::parse("li").unwrap(),
        Role::parse("lis").unwrap(),
        Role::parse("listitembox").unwrap(),
        Role::parse("linkbutton").unwrap(),
        Role::parse("button-like").unwrap(),
        Role::parse("text").unwrap(),
        Role::parse("box").unwrap(),
    ]
}

fn random_text(rng: &mut fastrand::Rng, max: usize) -> String {
    const ALPHABET: &[char] = &['a', 'Z', ' ', 'é', '日', '本', '·', '\n', '😀', 'x'];
    let len = rng.usize(0..=max);
    (0..len).map(|_| ALPHABET[rng.usize(..ALPHABET.len())]).collect()
}

fn random_page(rng: &mut fastrand::Rng, roles: &[Role]) -> Vec<RawElement> {
    let count = rng.usize(0..120);
    (0..count as u64)
        .map(|id| {
            let mut el = RawElement::new(id, roles[rng.usize(..roles.len())].clone(), random_text(rng, 160))
                .with_bbox(
                    rng.f64() * 1400.0 - 100.0,
                    rng.f64() * 3000.0 - 200.0,
                    rng.f64() * 400.0,
                    rng.f64() * 60.0,
                )
                .with_importance(rng.f64() * 10.0)
                .with_in_viewport(rng.bool())
                .with_occluded(rng.u8(..10) == 0);
            if rng.u8(..10) == 0 {
                el = el.without_role();
            }
            el
        })
        .collect()
}

fn relaxation(rng: &mut fastrand::Rng) -> Relaxation {
    match rng.u8(..3) {
        0 => Relaxation::Strict,
        1 => Relaxation::AllowOffscreen,
        _ => Relaxation::DropTextExclusions,
    }
}

#[test]
fn test_filter_output_roles_are_declared_roles() {
    let roles = tricky_roles();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let page = snapshot(random_page(&mut rng, &roles));
        let config = SelectorConfig::default();

        for task_type in TaskType::ALL {
            let task = TaskSpec::new(task_type, "anything").with_exclusions(["zz", "日本"]);
            let params = AttemptParams {
                k: rng.usize(1..80),
                relaxation: relaxation(&mut rng),
            };
            let set = prepare_candidates(&page, &task, &config, params);

            let eligible: Vec<u64> = page
                .elements
                .iter()
                .filter(|el| {
                    let role_ok = el.role.as_ref().is_some_and(|r| task_type.roles().contains(r));
                    let visible = !el.is_occluded
                        && el.bbox.has_area()
                        && (el.in_viewport
                            || (params.relaxation.allows_offscreen()
                                && el.bbox.x >= 0.0
                                && el.bbox.y >= 0.0));
                    let text = el.text.to_lowercase();
                    let allowed = !params.relaxation.applies_text_exclusions()
                        || !(text.contains("zz") || text.contains("日本"));
                    role_ok && visible && allowed
                })
                .map(|el| el.id)
                .collect();
            let shown: HashSet<u64> = set.elements.iter().map(|c| c.id).collect();

            // nothing eligible is lost before truncation to K
            assert_eq!(set.stats.after_text, eligible.len(), "seed {}", seed);
            assert_eq!(set.len(), eligible.len().min(params.k), "seed {}", seed);
            if eligible.len() <= params.k {
                for id in &eligible {
                    assert!(shown.contains(id), "seed {}: {} dropped from {}", seed, id, task_type);
                }
            }

            for c in &set.elements {
                assert!(
                    task_type.roles().contains(&c.role),
                    "seed {}: {} leaked into {}",
                    seed,
                    c.role,
                    task_type
                );
                assert!(page.contains(c.id));
            }
        }
    }
}

#[test]
fn test_compression_is_bounded() {
    let roles = tricky_roles();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let page = snapshot(random_page(&mut rng, &roles));
        let budget = rng.usize(1..120);
        let config = SelectorConfig::default().with_text_budget(budget);
        let task = TaskSpec::select_from_list("x");
        let params = AttemptParams {
            k: 100,
            relaxation: Relaxation::DropTextExclusions,
        };

        for c in prepare_candidates(&page, &task, &config, params).elements {
            assert!(c.text.chars().count() <= budget, "seed {}", seed);
            let raw = page.get(c.id).unwrap();
            assert!(raw.text.starts_with(&c.text));
            assert_eq!(c.bbox.x, raw.bbox.x.round() as i64);
            assert_eq!(c.bbox.h, raw.bbox.height.round() as i64);
        }
    }
}

#[test]
fn test_ranking_is_sorted_and_stable() {
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        // coarse scores force ties
        let elements: Vec<RawElement> = (0..rng.u64(1..60))
            .map(|id| RawElement::new(id, Role::Link, "r").with_importance(rng.u8(..4) as f64))
            .collect();
        let page = snapshot(elements);
        let set = prepare_candidates(
            &page,
            &TaskSpec::find_link("x"),
            &SelectorConfig::default(),
            AttemptParams::new(100),
        );

        for pair in set.elements.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.score_hundredths >= b.score_hundredths);
            if a.score_hundredths == b.score_hundredths {
                assert!(a.id < b.id, "seed {}: tie order broken", seed);
            }
        }
    }
}

#[test]
fn test_validator_only_accepts_shown_candidates() {
    let roles = tricky_roles();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let page = snapshot(random_page(&mut rng, &roles));
        let set = prepare_candidates(
            &page,
            &TaskSpec::find_link("x"),
            &SelectorConfig::default(),
            AttemptParams::new(rng.usize(1..30)),
        );
        let shown: HashSet<u64> = set.elements.iter().map(|c| c.id).collect();

        for _ in 0..50 {
            let id = rng.u64(0..150);
            match validate_decision(&ParsedDecision::new(id, ""), &set, &page) {
                Ok(el) => {
                    assert!(shown.contains(&id));
                    assert_eq!(el.id, id);
                    assert!(page.contains(id));
                }
                Err(reason) => {
                    assert_eq!(reason, FailureReason::InvalidIdentifier(id));
                    assert!(!shown.contains(&id));
                }
            }
        }
    }
}

#[test]
fn test_parser_recovers_same_decision_from_any_wrapping() {
    let extractor = DecisionExtractor::default();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let id = rng.u64(0..100_000);
        let reasoning: String = random_text(&mut rng, 40).replace('\n', " ");
        let body = serde_json::json!({ "id": id, "reasoning": reasoning }).to_string();

        let direct = body.clone();
        let fenced = format!("Here you go:\n```json\n{}\n```\nHope that helps.", body);
        let prose = format!("Looking at the elements, the answer is {} since it matches.", body);
        let stringly = body.replacen(&format!("\"id\":{}", id), &format!("\"id\":\"{}\"", id), 1);

        assert!(extract_first_code_block(&fenced).is_some());
        for text in [direct, fenced, prose, stringly] {
            let d = extractor.extract(&text).unwrap_or_else(|| panic!("seed {}: {}", seed, text));
            assert_eq!(d.id, id);
            assert_eq!(d.reasoning, reasoning);
        }
    }
}

#[test]
fn test_retry_is_monotonic_and_bounded() {
    let reasons = [
        FailureReason::EmptyCandidateSet,
        FailureReason::ParseFailure,
        FailureReason::InvalidIdentifier(1),
        FailureReason::Timeout,
        FailureReason::ModelError("boom".into()),
    ];
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let max_retries = rng.usize(0..8);
        let policy = EscalationPolicy::new(max_retries)
            .with_k_step(rng.usize(0..10))
            .with_k_cap(rng.usize(1..80));
        let mut controller = RetryController::new(AttemptParams::new(rng.usize(1..40)), policy);

        let mut last_k = controller.params().k;
        let mut last_relaxation = controller.params().relaxation;
        let mut last_attempt = 0;
        let mut failures = 0;
        let mut seen = HashSet::new();

        while let ControllerState::Attempt(n) = controller.state() {
            assert!(n == 0 || n > last_attempt);
            assert!(seen.insert((controller.params().k, controller.params().relaxation)) || n == 0);
            last_attempt = n;

            let reason = reasons[rng.usize(..reasons.len())].clone();
            let stats = FilterStats {
                after_text: rng.usize(0..200),
                ..Default::default()
            };
            controller.on_failure(&reason, &stats);
            failures += 1;

            let params = controller.params();
            assert!(params.k >= last_k);
            assert!(params.relaxation >= last_relaxation);
            last_k = params.k;
            last_relaxation = params.relaxation;
        }

        assert_eq!(controller.state(), ControllerState::Exhausted);
        assert!(failures <= max_retries + 1, "seed {}", seed);
    }
}
