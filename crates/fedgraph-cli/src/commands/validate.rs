use crate::gateway::{fragments, subgraph_ids};
use crate::support::{load_config_or_exit, load_fragments_or_exit, print_json, print_report_text};
use fedgraph_kernel::{CompositionReport, merge};

pub fn run(config: String, json_output: bool) {
    let gateway = load_config_or_exit(&config);
    let loaded = load_fragments_or_exit(&gateway);

    let outcome = merge(&fragments(&loaded));
    let report = CompositionReport::from_outcome(subgraph_ids(&loaded), &outcome);
    tracing::info!(
        accepted = report.is_accepted(),
        diagnostics = report.diagnostics.len(),
        "validation finished"
    );

    if json_output {
        print_json(&report);
    } else {
        print_report_text(&report);
    }
    if !report.is_accepted() {
        std::process::exit(1);
    }
}
