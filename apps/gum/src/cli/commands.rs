//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::genome_io::{load_genome, read_state, require_state, write_state};
use gum_core::{
    GraphMetrics, GraphUnfoldingMachine, GumError, Graph, NodeState, graph_fingerprint,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Output switches shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub verbose: bool,
}

/// Overrides and files for `run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub steps: Option<i64>,
    pub state: Option<PathBuf>,
    pub max_vertices: Option<usize>,
}

/// What a finished `run` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps executed by this invocation.
    pub steps_run: u64,
    /// Step counter after the run.
    pub step: u64,
    /// Whether a run-state file was resumed.
    pub resumed: bool,
    pub metrics: GraphMetrics,
}

fn histogram_json(histogram: &BTreeMap<NodeState, usize>) -> serde_json::Value {
    histogram
        .iter()
        .map(|(state, count)| (state.name(), serde_json::Value::from(*count)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_metrics(metrics: &GraphMetrics) {
    println!("Nodes:             {}", metrics.node_count);
    println!("Edges:             {}", metrics.edge_count);
    println!("Components:        {}", metrics.component_count);
    println!("Largest Component: {}", metrics.largest_component);
    println!("Max Degree:        {}", metrics.max_degree);
    println!("Fading Nodes:      {}", metrics.fading_nodes);
    println!(
        "Density:           {} per million",
        metrics.density_millionths
    );
    println!();
    println!("States:");
    for (state, count) in &metrics.state_histogram {
        println!("  {:<8} {}", state.name(), count);
    }
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Step a genome until its step budget is used up.
///
/// With a run-state file the graph and step counter are resumed from it and
/// written back afterwards. Rules and configuration always come from the
/// genome document.
pub fn cmd_run(
    genome: &Path,
    options: &RunOptions,
    output: Output,
) -> Result<RunSummary, GumError> {
    let mut document = load_genome(genome)?;
    if let Some(steps) = options.steps {
        document.machine.max_steps = steps;
    }
    if let Some(max_vertices) = options.max_vertices {
        document.machine.max_vertices = max_vertices;
    }

    let resumed_state = match &options.state {
        Some(path) => read_state(path)?,
        None => None,
    };
    let resumed = resumed_state.is_some();
    let mut machine = match resumed_state {
        Some(state) => GraphUnfoldingMachine::from_run_state(
            state,
            document.machine.clone(),
            document.rule_table()?,
        )?,
        None => document.build_machine()?,
    };
    machine.seed_if_empty();
    machine.begin_run();

    let start_step = machine.step();
    tracing::info!(
        genome = %genome.display(),
        resumed,
        start_step,
        max_steps = document.machine.max_steps,
        "run started"
    );

    while !machine.is_exhausted() {
        if machine.graph().node_count() == 0 {
            tracing::info!(step = machine.step(), "graph is empty, stopping");
            break;
        }
        let report = machine.run_one_step()?;
        if output.verbose {
            tracing::info!(
                step = report.step,
                nodes = machine.graph().node_count(),
                edges = machine.graph().edge_count(),
                births = report.births.len(),
                deaths = report.deaths.len(),
                pruned = report.lifecycle_removed.len(),
                "step"
            );
        }
    }

    if let Some(path) = &options.state {
        write_state(path, &machine.run_state())?;
    }

    let summary = RunSummary {
        steps_run: machine.step().saturating_sub(start_step),
        step: machine.step(),
        resumed,
        metrics: GraphMetrics::from_graph(machine.graph()),
    };

    if output.json {
        print_json(&serde_json::json!({
            "genome": genome.to_string_lossy(),
            "resumed": summary.resumed,
            "steps_run": summary.steps_run,
            "step": summary.step,
            "node_count": summary.metrics.node_count,
            "edge_count": summary.metrics.edge_count,
            "component_count": summary.metrics.component_count,
            "states": histogram_json(&summary.metrics.state_histogram),
            "nodes": machine.nodes(),
            "edges": machine.edges(),
        }));
        return Ok(summary);
    }

    println!("GUM Run");
    println!("=======");
    println!("Genome:    {:?}", genome);
    if let Some(path) = &options.state {
        println!("Run State: {:?}{}", path, if resumed { " (resumed)" } else { "" });
    }
    println!("Steps Run: {}", summary.steps_run);
    println!("Step:      {}", summary.step);
    println!();
    print_metrics(&summary.metrics);

    Ok(summary)
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Load a genome and report its contents.
pub fn cmd_validate(genome: &Path, output: Output) -> Result<(), GumError> {
    let document = load_genome(genome)?;
    let rules = document.rule_table()?;
    let graph = document.initial_graph()?;
    let enabled = rules.items().iter().filter(|r| r.is_enabled).count();

    if output.json {
        print_json(&serde_json::json!({
            "genome": genome.to_string_lossy(),
            "valid": true,
            "rule_count": rules.len(),
            "enabled_rules": enabled,
            "seed_nodes": graph.node_count(),
            "seed_edges": graph.edge_count(),
            "config": document.machine,
        }));
        return Ok(());
    }

    println!("Genome {:?} is valid", genome);
    println!("  Rules:      {} ({} enabled)", rules.len(), enabled);
    println!("  Seed Nodes: {}", graph.node_count());
    println!("  Seed Edges: {}", graph.edge_count());
    if output.verbose {
        for (index, item) in rules.items().iter().enumerate() {
            println!(
                "  [{index}] {} -> {} {}",
                item.condition.current, item.operation.kind, item.operation.operand
            );
        }
    }

    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Show metrics of a checkpointed graph.
pub fn cmd_inspect(state: &Path, output: Output) -> Result<(), GumError> {
    let run_state = require_state(state)?;
    let step = run_state.step;
    let graph = Graph::try_from(run_state.graph)?;
    let metrics = GraphMetrics::from_graph(&graph);

    if output.json {
        print_json(&serde_json::json!({
            "state": state.to_string_lossy(),
            "step": step,
            "metrics": metrics,
            "states": histogram_json(&metrics.state_histogram),
        }));
        return Ok(());
    }

    println!("GUM Run State");
    println!("=============");
    println!("File: {:?}", state);
    println!("Step: {}", step);
    println!();
    print_metrics(&metrics);

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the BLAKE3 fingerprint of a checkpointed graph.
pub fn cmd_hash(state: &Path, output: Output) -> Result<(), GumError> {
    let run_state = require_state(state)?;
    let hash = graph_fingerprint(&run_state.graph)?;

    if output.json {
        print_json(&serde_json::json!({
            "algorithm": "blake3",
            "hash": hash,
            "step": run_state.step,
            "node_count": run_state.graph.nodes.len(),
            "edge_count": run_state.graph.edges.len(),
        }));
        return Ok(());
    }

    println!("BLAKE3: {}", hash);
    Ok(())
}
