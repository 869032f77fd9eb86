use log::{error, info};

use crate::cli;
use crate::contig::AssemblyContig;
use crate::contig_output::write_contig_table;
use crate::driver::AssemblyDriver;
use crate::globals::PROGRAM_VERSION;
use crate::graph_io::read_kmer_graph;
use crate::run_stats::{
    delete_run_stats, write_assemble_run_stats, AssembleRunStats, AssemblyRunStats, RunStep,
};

pub const CONTIG_TABLE_FILENAME: &str = "assembly.contigs.tsv";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";
pub const SETTINGS_FILENAME: &str = "assemble.settings.json";

pub fn run_assemble(settings: &cli::AssembleSettings) {
    // Now that we're committed to a run, remove any possible older run stats file that could be
    // present in case this is a clobber run.
    //
    // The run stats file is used as a marker of a successfully finished run, so removing it here
    // allows run completion to be determined from whether the new file is written at the end of
    // this assemble step.
    //
    delete_run_stats(&settings.output_dir);

    cli::write_assemble_settings(&settings.output_dir, settings);

    let start = std::time::Instant::now();

    let graph = match read_kmer_graph(&settings.graph_filename) {
        Ok(x) => x,
        Err(err) => {
            error!("Invalid evidence graph: {err}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    if let Err(err) = graph.validate() {
        error!("Invalid evidence graph: {err}");
        std::process::exit(exitcode::DATAERR);
    }

    let config = settings.to_assembly_config();
    let subgraphs = graph.partition_subgraphs(
        config.subgraph_margin_positions(),
        config.max_subgraph_width_positions(),
    );

    info!(
        "Assembling {} subgraphs over {} graph nodes",
        subgraphs.len(),
        graph.node_count()
    );

    let mut stats = AssemblyRunStats {
        graph_node_count: graph.node_count(),
        subgraph_count: subgraphs.len(),
        ..Default::default()
    };
    let mut contigs: Vec<AssemblyContig> = Vec::new();
    for subgraph_nodes in subgraphs.iter() {
        let mut driver = AssemblyDriver::new(&graph, &config, subgraph_nodes);
        driver.run(&mut |contig| contigs.push(contig.clone()));
        stats.add_driver_stats(&driver.stats);
    }

    info!(
        "Assembly produced {} contigs ({} additional candidates filtered)",
        stats.emitted_contig_count, stats.filtered_contig_count
    );

    write_contig_table(&settings.output_dir, contigs);

    stats.total_assembly_time_secs = start.elapsed().as_secs_f64();

    // In addition to useful statistics this file acts as a marker for a successfully completed
    // run, so it must be written last.
    write_assemble_run_stats(
        &settings.output_dir,
        &AssembleRunStats {
            run_step: RunStep {
                name: "assemble".to_string(),
                version: PROGRAM_VERSION.to_string(),
            },
            assembly_stats: stats,
        },
    );
}
