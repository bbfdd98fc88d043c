// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::{append_node, generate_node_id, set_last_active, set_node_state, ApplyError, NodeSpec};
use crate::format::parser::parse_document;
use crate::format::writer::seed_document;
use crate::model::{NodeId, NodeState, NodeType};

fn node_id(raw: &str) -> NodeId {
    NodeId::new(raw).expect("valid node id")
}

fn login_spec() -> NodeSpec {
    let mut spec = NodeSpec::new(
        node_id("node_1700000000000"),
        NodeType::AiTask,
        "Implemented login",
    );
    spec.set_description(Some("Added form and validation"));
    spec
}

#[test]
fn append_to_seed_document_produces_the_expected_patch() {
    let start = node_id("start");
    let result = append_node(&seed_document(), &login_spec(), Some(&start)).expect("append");

    assert!(result.contains("%% @node_1700000000000 [ai-task]: Added form and validation"));
    assert!(result.contains("node_1700000000000[\"Implemented login\"]"));
    assert!(result.contains("start --> node_1700000000000"));
    assert!(result.contains("style node_1700000000000 "));
    // The seed node's declaration and style line are untouched.
    assert!(result.contains("start([\"Project Start\"])"));
    assert!(result.contains("style start fill:#dcfce7"));
}

#[test]
fn append_patch_lands_before_the_style_block() {
    let result = append_node(&seed_document(), &login_spec(), Some(&node_id("start")))
        .expect("append");
    let lines = result.lines().collect::<Vec<_>>();

    let shape_idx = lines
        .iter()
        .position(|l| l.starts_with("node_1700000000000["))
        .expect("shape line present");
    let first_style_idx = lines
        .iter()
        .position(|l| l.starts_with("style "))
        .expect("style line present");
    assert!(shape_idx < first_style_idx);

    // The whole patch (its style line included) sits above the pre-existing
    // style block.
    let style_lines = lines
        .iter()
        .filter(|l| l.starts_with("style "))
        .collect::<Vec<_>>();
    assert_eq!(style_lines.len(), 2);
    assert!(style_lines[0].starts_with("style node_1700000000000"));
    assert!(style_lines[1].starts_with("style start"));
}

#[test]
fn append_preserves_every_existing_node_and_edge() {
    let base = append_node(&seed_document(), &login_spec(), Some(&node_id("start")))
        .expect("first append");
    let before = parse_document(&base);

    let mut second = NodeSpec::new(node_id("node_2"), NodeType::HumanTask, "Review the rollout");
    second.set_state(Some(NodeState::Opened));
    let result =
        append_node(&base, &second, Some(&node_id("node_1700000000000"))).expect("second append");
    let after = parse_document(&result);

    for (id, node) in before.document().nodes() {
        assert_eq!(after.document().node(id), Some(node), "node {id} changed");
    }
    for edge in before.document().edges() {
        assert!(
            after.document().edges().contains(edge),
            "edge {} --> {} lost",
            edge.from_node_id(),
            edge.to_node_id()
        );
    }
}

#[test]
fn append_without_description_or_provenance_emits_no_marker() {
    let spec = NodeSpec::new(node_id("n1"), NodeType::AiTask, "Quick fix");
    let result = append_node(&seed_document(), &spec, None).expect("append");
    assert!(!result.contains("%% @n1"));
    assert!(result.contains("n1[\"Quick fix\"]"));
    assert!(!result.contains(" --> n1"));
}

#[test]
fn append_to_empty_text_works_without_a_style_block() {
    let spec = NodeSpec::new(node_id("n1"), NodeType::Blocker, "Stuck on CI");
    let result = append_node("", &spec, None).expect("append");
    assert!(result.contains("n1{{\"Stuck on CI\"}}"));
    assert!(result.contains("style n1 "));
    assert!(result.ends_with('\n'));
}

#[test]
fn append_rejects_an_existing_id() {
    let spec = NodeSpec::new(node_id("start"), NodeType::AiTask, "Again");
    let err = append_node(&seed_document(), &spec, None).unwrap_err();
    assert_eq!(
        err,
        ApplyError::NodeExists {
            node_id: node_id("start")
        }
    );
}

#[test]
fn append_sanitizes_label_and_flattens_description() {
    let mut spec = NodeSpec::new(node_id("n1"), NodeType::AiTask, "say \"hi\"");
    spec.set_description(Some("line one\nline two"));
    let result = append_node(&seed_document(), &spec, None).expect("append");
    assert!(result.contains("n1[\"say 'hi'\"]"));
    assert!(result.contains(": line one; line two"));
}

#[test]
fn generated_ids_never_collide_within_one_millisecond() {
    let seed = seed_document();
    let parsed = parse_document(&seed);

    let first = generate_node_id(1_700_000_000_000, parsed.document());
    let spec = NodeSpec::new(first.clone(), NodeType::AiTask, "One");
    let text = append_node(&seed, &spec, None).expect("append");

    let parsed = parse_document(&text);
    let second = generate_node_id(1_700_000_000_000, parsed.document());
    assert_ne!(first, second);
    assert_eq!(first.as_str(), "node_1700000000000");
    assert_eq!(second.as_str(), "node_1700000000000_1");
}

#[test]
fn set_last_active_rewrites_the_existing_marker_in_place() {
    let text = append_node(&seed_document(), &login_spec(), Some(&node_id("start")))
        .expect("append");
    let updated = set_last_active(&text, &node_id("node_1700000000000"));

    assert_eq!(
        updated.matches("%% @lastActive:").count(),
        1,
        "exactly one lastActive marker"
    );
    let parsed = parse_document(&updated);
    assert_eq!(
        parsed.document().last_active_node_id(),
        Some(&node_id("node_1700000000000"))
    );
    // Everything else is untouched.
    assert_eq!(
        updated.replace(
            "%% @lastActive: node_1700000000000",
            "%% @lastActive: start"
        ),
        text
    );
}

#[test]
fn set_last_active_inserts_after_the_header_when_missing() {
    let text = "flowchart TD\na[One]\n";
    let updated = set_last_active(text, &node_id("a"));
    let lines = updated.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "flowchart TD");
    assert_eq!(lines[1], "%% @lastActive: a");
    assert_eq!(lines[2], "a[One]");
}

#[test]
fn set_node_state_rewrites_exactly_one_line() {
    let text = append_node(&seed_document(), &login_spec(), Some(&node_id("start")))
        .expect("append");
    let updated =
        set_node_state(&text, &node_id("node_1700000000000"), NodeState::Closed).expect("close");

    let before = text.lines().collect::<Vec<_>>();
    let after = updated.lines().collect::<Vec<_>>();
    assert_eq!(before.len(), after.len());
    let changed = before
        .iter()
        .zip(&after)
        .filter(|(a, b)| a != b)
        .collect::<Vec<_>>();
    assert_eq!(changed.len(), 1);
    assert!(changed[0].1.contains("[ai-task, closed]"));

    let parsed = parse_document(&updated);
    assert_eq!(
        parsed
            .document()
            .node(&node_id("node_1700000000000"))
            .map(|n| n.state()),
        Some(NodeState::Closed)
    );
}

#[test]
fn set_node_state_keeps_marker_provenance_fields() {
    let text = "flowchart TD\n\
        %% @n1 [ai-task, opened, 2023-11-14, claude]: did things\n\
        n1[\"Task\"]\n";
    let updated = set_node_state(text, &node_id("n1"), NodeState::Closed).expect("close");
    assert!(updated.contains("%% @n1 [ai-task, closed, 2023-11-14, claude]: did things"));
}

#[test]
fn set_node_state_inserts_a_minimal_marker_when_none_exists() {
    let text = "flowchart TD\nstart([\"Project Start\"])\n";
    let updated = set_node_state(text, &node_id("start"), NodeState::Closed).expect("close");
    let lines = updated.lines().collect::<Vec<_>>();
    assert_eq!(lines[1], "%% @start [start, closed]");
    assert_eq!(lines[2], "start([\"Project Start\"])");
}

#[test]
fn set_node_state_rejects_unknown_nodes() {
    let err = set_node_state(&seed_document(), &node_id("ghost"), NodeState::Closed).unwrap_err();
    assert_eq!(
        err,
        ApplyError::NodeNotFound {
            node_id: node_id("ghost")
        }
    );
}
