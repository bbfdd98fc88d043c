// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use trailmap::format::parser::parse_document;
use trailmap::model::{NodeId, NodeType};
use trailmap::ops::{append_node, NodeSpec};

// Benchmark identity (keep stable):
// - Group names in this file: `format.parse`, `ops.append_node`
// - Case IDs (the string after the `/`) must remain stable across refactors
//   so results stay comparable over time (e.g. `small`, `large`).
fn fixture(nodes: usize) -> String {
    let mut out = String::from("flowchart TD\n%% @lastActive: n0\nn0([\"Project Start\"])\n");
    for i in 1..nodes {
        out.push_str(&format!(
            "%% @n{i} [ai-task, closed, 2024-01-02, bench]: step {i} of the scripted session\n"
        ));
        out.push_str(&format!("n{i}[\"Step {i}\"]\n"));
        out.push_str(&format!("n{} --> n{i}\n", i - 1));
    }
    for i in 0..nodes {
        out.push_str(&format!("style n{i} fill:#dbeafe,stroke:#2563eb\n"));
    }
    out
}

fn benches_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("format.parse");

    for (case_id, nodes) in [("small", 8usize), ("large", 256usize)] {
        let text = fixture(nodes);
        group.throughput(Throughput::Elements(nodes as u64));
        group.bench_function(case_id, |b| {
            b.iter(|| {
                let parsed = parse_document(black_box(&text));
                black_box(parsed.document().nodes().len())
            })
        });
    }

    group.finish();
}

fn benches_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("ops.append_node");

    for (case_id, nodes) in [("small", 8usize), ("large", 256usize)] {
        let text = fixture(nodes);
        let connect_from = NodeId::new(format!("n{}", nodes - 1)).expect("valid node id");
        group.throughput(Throughput::Elements(1));
        group.bench_function(case_id, |b| {
            b.iter(|| {
                let fresh = NodeId::new("bench_appended").expect("valid node id");
                let mut spec = NodeSpec::new(fresh, NodeType::AiTask, "appended step");
                spec.set_description(Some("benchmark append"));
                let appended =
                    append_node(black_box(&text), &spec, Some(&connect_from)).expect("append");
                black_box(appended.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benches_parse, benches_append);
criterion_main!(benches);
