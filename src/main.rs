use anyhow::{bail, Context};
use sage::config::{ConfigManager, MachineConfig, SageConfig};
use sage::engines::evaluation::{Input, Machine, Tape};
use sage::engines::generation::{ConsoleProgressCallback, EvolutionEngine, FitnessHook};
use sage::engines::metrics::factorial::FACTORIAL_STEP_BUDGET;
use sage::engines::metrics::{FactorialTask, SortingTask};
use sage::functions::OperationCatalog;
use sage::types::{ProgramDisplay, Word};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const USAGE: &str = "usage:
  sage factorial <program.sg> [config.toml]
  sage sort <program.sg> [config.toml]
  sage run <program.sg> [input...]";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (Some(command), Some(program_path)) = (args.first(), args.get(1)) else {
        bail!("{}", USAGE);
    };

    match command.as_str() {
        "factorial" | "sort" => {
            let manager = ConfigManager::new();
            manager
                .load_layered(args.get(2).map(Path::new))
                .context("loading configuration")?;
            evolve(command, program_path, manager.get()?)
        }
        "run" => {
            let inputs = args[2..]
                .iter()
                .map(|arg| arg.parse::<Word>())
                .collect::<Result<Vec<_>, _>>()
                .context("inputs must be integers")?;
            run(program_path, inputs)
        }
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

fn load_program(path: &str) -> anyhow::Result<sage::Program> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    sage::parser::parse(&source).with_context(|| format!("parsing {}", path))
}

fn evolve(task: &str, path: &str, config: SageConfig) -> anyhow::Result<()> {
    let program = load_program(path)?;
    let hook: Arc<dyn FitnessHook> = match task {
        "factorial" => Arc::new(FactorialTask::new(MachineConfig {
            step_budget: FACTORIAL_STEP_BUDGET,
            ..config.machine.clone()
        })),
        _ => Arc::new(SortingTask::new(
            config.machine.clone(),
            config.evolution.seed.unwrap_or_default(),
        )),
    };

    log::info!("Evolving optimizations for '{}'...", path);
    let mut engine = EvolutionEngine::new(
        config.evolution.clone(),
        Arc::new(OperationCatalog::sage()),
        hook,
    );
    let result = engine.run_from_program(&program, ConsoleProgressCallback)?;

    println!("{}", ProgramDisplay(&result.best_program()?));
    println!("{} {}", result.initial_size, result.final_size);
    Ok(())
}

fn run(path: &str, inputs: Vec<Word>) -> anyhow::Result<()> {
    let program = load_program(path)?;
    let config = MachineConfig::default();
    let mut tape = Tape::new(config.tape_length, config.blank_word());
    let outcome = Machine::from_config(&config)
        .with_input(Input::scripted(inputs))
        .run(&program, &mut tape)?;

    let output: Vec<String> = outcome.output.iter().map(ToString::to_string).collect();
    println!("{}", output.join(" "));
    if outcome.exhausted {
        log::warn!("Run stopped after {} steps", outcome.steps);
    }
    Ok(())
}
