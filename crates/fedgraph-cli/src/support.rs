use crate::config::GatewayConfig;
use crate::gateway::{LoadedSubgraph, load_fragments};
use fedgraph_kernel::{CompositionReport, SubgraphId};
use serde::Serialize;
use std::fmt::Display;

pub fn exit_with_error(error: impl Display) -> ! {
    eprintln!("error: {error}");
    std::process::exit(1);
}

pub fn load_config_or_exit(path: &str) -> GatewayConfig {
    GatewayConfig::load(path).unwrap_or_else(|e| exit_with_error(e))
}

pub fn load_fragments_or_exit(config: &GatewayConfig) -> Vec<LoadedSubgraph> {
    load_fragments(config).unwrap_or_else(|e| exit_with_error(e))
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization")
    );
}

fn join_ids(ids: &[SubgraphId]) -> String {
    ids.iter()
        .map(SubgraphId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable report. Diagnostics go to stderr.
pub fn print_report_text(report: &CompositionReport) {
    if report.is_accepted() {
        println!("fedgraph composition: accepted");
        println!("  Subgraphs: {}", join_ids(&report.subgraphs));
        println!(
            "  Types: {} ({} entities)",
            report.type_count, report.entity_count
        );
        if let Some(fingerprint) = &report.fingerprint {
            println!("  Fingerprint: {fingerprint}");
        }
        return;
    }

    eprintln!("fedgraph composition: rejected");
    eprintln!("  Subgraphs: {}", join_ids(&report.subgraphs));
    eprintln!("  Diagnostics ({}):", report.diagnostics.len());
    for diagnostic in &report.diagnostics {
        eprintln!(
            "    - [{}] {} ({})",
            diagnostic.code, diagnostic.message, diagnostic.diagnostic_id
        );
    }
}
