//! CLI front-end (C8): installs the logging backend and drives the JSON I/O
//! layer around the ITAGS/DITAGS allocation search.
//!
//! `solve` resolves a problem document against its environment and runs the
//! search once. `repair` reloads a previously persisted search and a new
//! problem document, classifies the difference into the §4.7 change table,
//! and resumes the search via `continue_search` instead of solving fresh.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;

use ditags::allocation::{ItagsSearch, ProblemChange};
use ditags::error::Result;
use ditags::io::{build_problem_from_document, build_success_output, model::ProblemDocument, persist::PersistedSearch, SolverOutput};
use ditags::search::SearchOutcome;

#[derive(Parser)]
#[command(name = "ditags", about = "Simultaneous task allocation and scheduling for heterogeneous multi-robot teams")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Per motion-plan-query timeout, in seconds.
    #[arg(long, global = true)]
    query_timeout: Option<u64>,

    /// Overall search timeout, in seconds.
    #[arg(long, global = true)]
    search_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Solve a problem document from scratch.
    Solve {
        input: PathBuf,
        output: PathBuf,
        /// Also write the search state here for a later `repair`.
        #[arg(long)]
        save_state: Option<PathBuf>,
    },
    /// Resume a prior search against a changed problem document.
    Repair {
        prior_state: PathBuf,
        new_input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        save_state: Option<PathBuf>,
    },
}

fn load_document(path: &PathBuf) -> Result<ProblemDocument> {
    let contents = std::fs::read_to_string(path).map_err(|e| ditags::error::GrstapseError::interface("file", e))?;
    serde_json::from_str(&contents).map_err(|e| ditags::error::GrstapseError::interface("json", e))
}

fn write_output(path: &PathBuf, output: &SolverOutput) -> Result<()> {
    let json = output.to_json()?;
    std::fs::write(path, json).map_err(|e| ditags::error::GrstapseError::interface("file", e))
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let query_timeout = cli.query_timeout.map(Duration::from_secs);
    let search_timeout = cli.search_timeout.map(Duration::from_secs);

    match cli.command {
        Command::Solve { input, output, save_state } => {
            let doc = load_document(&input)?;
            let (inputs, environment) = build_problem_from_document(&doc, query_timeout)?;
            info!("solving: {} tasks, {} robots", inputs.num_tasks, inputs.num_robots);

            let mut search = ItagsSearch::new(inputs);
            let result = search.search(search_timeout);

            let solver_output = match result.outcome {
                SearchOutcome::Goal => {
                    let goal = result.goal.expect("Goal outcome carries a goal node");
                    build_success_output(&doc, &environment, &goal, query_timeout)?
                }
                SearchOutcome::NoGoalTimeout => SolverOutput::from_error(&ditags::error::GrstapseError::no_goal("itags", ditags::error::NoGoalReason::Timeout)),
                SearchOutcome::NoGoalExhausted => {
                    SolverOutput::from_error(&ditags::error::GrstapseError::no_goal("itags", ditags::error::NoGoalReason::OpenSetExhausted))
                }
            };

            write_output(&output, &solver_output)?;

            if let Some(state_path) = save_state {
                PersistedSearch::new(doc).save(&state_path)?;
            }
        }
        Command::Repair { prior_state, new_input, output, save_state } => {
            let prior = PersistedSearch::load(&prior_state)?;
            let new_doc = load_document(&new_input)?;

            let (old_inputs, _) = build_problem_from_document(&prior.problem, query_timeout)?;
            let (new_inputs, environment) = build_problem_from_document(&new_doc, query_timeout)?;
            let changes = classify_changes(&old_inputs, &new_inputs);
            info!("repairing: {} problem change(s) detected", changes.len());

            let mut search = ItagsSearch::new(old_inputs);
            search.search(search_timeout);
            let result = search.repair(new_inputs, &changes, search_timeout);

            let solver_output = match result.outcome {
                SearchOutcome::Goal => {
                    let goal = result.goal.expect("Goal outcome carries a goal node");
                    build_success_output(&new_doc, &environment, &goal, query_timeout)?
                }
                SearchOutcome::NoGoalTimeout => SolverOutput::from_error(&ditags::error::GrstapseError::no_goal("itags", ditags::error::NoGoalReason::Timeout)),
                SearchOutcome::NoGoalExhausted => {
                    SolverOutput::from_error(&ditags::error::GrstapseError::no_goal("itags", ditags::error::NoGoalReason::OpenSetExhausted))
                }
            };

            write_output(&output, &solver_output)?;

            if let Some(state_path) = save_state {
                PersistedSearch::new(new_doc).save(&state_path)?;
            }
        }
    }

    Ok(())
}

/// Diffs two resolved problems into the §4.7 change table. This is a
/// best-effort classification for the CLI path; embedders that already know
/// what changed should call [`ItagsSearch::repair`] directly with their own
/// `ProblemChange` list instead of round-tripping through documents.
fn classify_changes(old: &ditags::allocation::ItagsProblemInputs, new: &ditags::allocation::ItagsProblemInputs) -> Vec<ProblemChange> {
    let mut changes = Vec::new();

    if new.num_robots > old.num_robots {
        for robot in old.num_robots..new.num_robots {
            changes.push(ProblemChange::RobotAdded(robot));
        }
    } else if new.num_robots < old.num_robots {
        for robot in new.num_robots..old.num_robots {
            changes.push(ProblemChange::RobotLost(robot));
        }
    }

    let shared_robots = old.num_robots.min(new.num_robots);
    let mut trait_increased = false;
    let mut trait_decreased = false;
    for robot in 0..shared_robots {
        for t in 0..old.num_traits.min(new.num_traits) {
            let before = old.robot_traits[robot][t];
            let after = new.robot_traits[robot][t];
            if after > before {
                trait_increased = true;
            } else if after < before {
                trait_decreased = true;
            }
        }
    }
    if trait_increased {
        changes.push(ProblemChange::RobotTraitIncreased);
    }
    if trait_decreased {
        changes.push(ProblemChange::RobotTraitDecreased);
    }

    let mut requirement_increased = false;
    let mut requirement_decreased = false;
    let shared_tasks = old.num_tasks.min(new.num_tasks);
    for task in 0..shared_tasks {
        for t in 0..old.num_traits.min(new.num_traits) {
            let before = old.trait_requirements[task][t];
            let after = new.trait_requirements[task][t];
            if after > before {
                requirement_increased = true;
            } else if after < before {
                requirement_decreased = true;
            }
        }
    }
    if requirement_increased {
        changes.push(ProblemChange::TraitRequirementIncreased);
    }
    if requirement_decreased {
        changes.push(ProblemChange::TraitRequirementDecreased);
    }

    if old.task_durations != new.task_durations || old.precedence != new.precedence {
        changes.push(ProblemChange::DurationOrPrecedenceChanged);
    }

    changes
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
