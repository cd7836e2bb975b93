use crate::gateway::{fragments, subgraph_ids};
use crate::support::{
    exit_with_error, load_config_or_exit, load_fragments_or_exit, print_json, print_report_text,
};
use fedgraph_kernel::{CompositionReport, merge};
use fedgraph_sdl::print_supergraph;
use serde_json::json;
use std::fs;

pub fn run(config: String, out: Option<String>, json_output: bool) {
    let gateway = load_config_or_exit(&config);
    let loaded = load_fragments_or_exit(&gateway);

    let outcome = merge(&fragments(&loaded));
    let report = CompositionReport::from_outcome(subgraph_ids(&loaded), &outcome);
    let supergraph = outcome.as_ref().ok().map(print_supergraph);

    if let (Some(path), Some(sdl)) = (&out, &supergraph) {
        fs::write(path, sdl)
            .unwrap_or_else(|e| exit_with_error(format!("failed to write {path}: {e}")));
        tracing::info!(path = %path, "supergraph written");
    }

    if json_output {
        let payload = json!({
            "report": report,
            "supergraph": if out.is_none() { supergraph.clone() } else { None },
            "out": out,
        });
        print_json(&payload);
    } else {
        match (&supergraph, &out) {
            (Some(sdl), None) => print!("{sdl}"),
            (Some(_), Some(path)) => {
                print_report_text(&report);
                println!("  Supergraph: {path}");
            }
            (None, _) => print_report_text(&report),
        }
    }

    if let Err(error) = &outcome {
        exit_with_error(error);
    }
}
