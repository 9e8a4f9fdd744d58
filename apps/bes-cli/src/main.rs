use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use bes_app::{
    AppError, AppResult, CompiledProject, RunOptions, Simulation, StepProgress, compile_project,
    load_project, read_checkpoint, summarize, write_checkpoint,
};

#[derive(Parser)]
#[command(name = "bes-cli")]
#[command(about = "Building energy simulation - model evaluation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project file
    Validate {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// Print the evaluation schedule of a project
    Schedule {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// Run a simulation
    Run {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
        /// End time in hours (defaults to the project's end time)
        #[arg(long)]
        until_h: Option<f64>,
        /// Continue from a checkpoint file
        #[arg(long)]
        checkpoint_in: Option<PathBuf>,
        /// Write a checkpoint file at the end of the run
        #[arg(long)]
        checkpoint_out: Option<PathBuf>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Schedule { project_path } => cmd_schedule(&project_path),
        Commands::Run {
            project_path,
            until_h,
            checkpoint_in,
            checkpoint_out,
            csv,
        } => cmd_run(
            &project_path,
            until_h,
            checkpoint_in.as_deref(),
            checkpoint_out.as_deref(),
            csv.as_deref(),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = load_project(project_path)?;
    compile_project(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_schedule(project_path: &Path) -> AppResult<()> {
    let project = load_project(project_path)?;
    let summary = summarize(&project)?;
    println!("Project: {}", summary.name);
    println!(
        "  {} models, {} zones, {} groups ({} implicit)",
        summary.models, summary.zones, summary.groups, summary.implicit_groups
    );
    println!("\nEvaluation order:");
    for line in summary.schedule.lines() {
        println!("  {}", line);
    }
    Ok(())
}

fn cmd_run(
    project_path: &Path,
    until_h: Option<f64>,
    checkpoint_in: Option<&Path>,
    checkpoint_out: Option<&Path>,
    csv: Option<&Path>,
) -> AppResult<()> {
    let project = load_project(project_path)?;
    let _span = tracing::info_span!("run", project = %project.name).entered();
    let compiled: CompiledProject = compile_project(&project)?;
    let t_end = until_h.map_or(compiled.end_s, |h| h * 3600.0);
    let mut sim = Simulation::new(compiled);

    if let Some(path) = checkpoint_in {
        sim.restore(&read_checkpoint(path)?)?;
        tracing::info!(path = %path.display(), t = sim.time(), "checkpoint restored");
        println!("Restored checkpoint at t = {:.1} s", sim.time());
    }
    if t_end < sim.time() {
        return Err(AppError::InvalidInput(format!(
            "end time {} s lies before the current time {} s",
            t_end,
            sim.time()
        )));
    }

    println!("Running '{}' to t = {:.1} s", project.name, t_end);
    let opts = RunOptions::from_project(&project, t_end);
    let started = Instant::now();
    let mut last_emit = Instant::now();
    let mut render = |p: &StepProgress| {
        if last_emit.elapsed().as_millis() >= 100 || p.t >= p.t_end {
            render_progress(p);
            last_emit = Instant::now();
        }
    };
    let summary = sim.run(&opts, Some(&mut render))?;
    clear_progress_line();
    tracing::info!(
        steps = summary.steps,
        cutbacks = summary.cutbacks,
        elapsed_s = started.elapsed().as_secs_f64(),
        "run finished"
    );

    println!("✓ Simulation completed in {:.3}s", started.elapsed().as_secs_f64());
    println!("  Steps:            {}", summary.steps);
    println!("  Cutback retries:  {}", summary.cutbacks);
    println!("  Group iterations: {}", summary.fixed_point_iterations);

    if let Some(path) = checkpoint_out {
        write_checkpoint(path, &sim.checkpoint())?;
        tracing::info!(path = %path.display(), t = sim.time(), "checkpoint written");
        println!("✓ Checkpoint written to {}", path.display());
    }

    if let Some(outputs) = sim.outputs() {
        let table = outputs
            .lock()
            .map_err(|_| AppError::InvalidInput("output table is poisoned".to_string()))?
            .clone();
        let mut text = String::from("time_s");
        for column in &table.columns {
            text.push_str(&format!(",{}", column));
        }
        text.push('\n');
        for (t, values) in &table.rows {
            text.push_str(&t.to_string());
            for v in values {
                text.push_str(&format!(",{}", v));
            }
            text.push('\n');
        }
        if let Some(path) = csv {
            std::fs::write(path, text)?;
            tracing::info!(path = %path.display(), rows = table.rows.len(), "outputs exported");
            println!("✓ Exported {} rows to {}", table.rows.len(), path.display());
        } else {
            print!("{}", text);
        }
    }

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_progress(p: &StepProgress) {
    let fraction = if p.t_end > 0.0 { (p.t / p.t_end).clamp(0.0, 1.0) } else { 1.0 };
    let width = 28usize;
    let filled = ((fraction * width as f64).round() as usize).min(width);
    print!(
        "\r[{}{}] {:>6.2}%  t={:.1}/{:.1}s  dt={:.1}s  step={}  cutbacks={}",
        "#".repeat(filled),
        "-".repeat(width - filled),
        fraction * 100.0,
        p.t,
        p.t_end,
        p.dt,
        p.step,
        p.cutbacks
    );
    let _ = io::stdout().flush();
}
