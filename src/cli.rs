use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{Config, SchedulerConfig};
use crate::interpreter::{Completion, Compiler, Engine, Fault, Node, Resumable, Value};
use crate::library::ScriptLibrary;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - run scripts as cooperative, tick-driven tasks", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load scripts (ESTree JSON) and run them one tick at a time
    Run {
        /// Script files; each file is its own script class
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Script class name (defaults to the file's stem). With several
        /// files each one is loaded as `<class>/<stem>`.
        #[arg(long)]
        class: Option<String>,

        /// Global function to call once all scripts are loaded
        #[arg(long)]
        call: Option<String>,

        /// Resumable steps per script per tick
        #[arg(long)]
        steps_per_tick: Option<usize>,

        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Compile a script and report diagnostics without running it
    Check {
        /// Script file (ESTree JSON)
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Log filter directive from the config `cli` selects; `warn` if it can't load
pub fn log_filter(cli: &Cli) -> String {
    Config::builder()
        .config_path(cli.config.clone().map(PathBuf::from))
        .build()
        .map(|config| config.logging.filter)
        .unwrap_or_else(|_| "warn".to_string())
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

/// Run an already parsed command line
pub async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config_path = cli.config.map(PathBuf::from);

    match cli.command {
        Commands::Run {
            files,
            class,
            call,
            steps_per_tick,
            max_ticks,
        } => {
            let config = Config::builder()
                .config_path(config_path)
                .steps_per_tick(steps_per_tick)
                .max_ticks(max_ticks)
                .build()
                .context("Failed to load configuration")?;

            let engine = Engine::with_error_callback(|message| eprintln!("warning: {}", message));
            engine.set_loop_yield_interval(config.scheduler.loop_yield_interval);
            engine.set_max_call_depth(config.scheduler.max_call_depth);
            install_host_functions(&engine);

            let classes = script_classes(class.as_deref(), &files)?;
            let mut library = ScriptLibrary::new(engine.clone());
            let mut tasks = Vec::new();
            for (file, class) in files.iter().zip(classes) {
                let loaded = library
                    .load_file(&class, file)
                    .with_context(|| format!("Failed to load {}", file.display()))?;
                tasks.push(Task::new(class, engine.run(&loaded.program)));
            }
            if let Some(entry) = call {
                let completion = engine.call_global(&entry, Vec::new());
                tasks.push(Task::new(format!("{}()", entry), completion));
            }

            let failures = Scheduler::new(config.scheduler).run(tasks).await;
            if failures > 0 {
                bail!("{} script(s) failed", failures);
            }
        }

        Commands::Check { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let tree = Node::from_json(&source)?;

            let reported = std::rc::Rc::new(std::cell::Cell::new(0usize));
            let counter = reported.clone();
            let engine = Engine::with_error_callback(move |message| {
                counter.set(counter.get() + 1);
                println!("{}", message);
            });
            Compiler::new(&engine).compile_program(&tree);

            match reported.get() {
                0 => println!("✓ {} compiled cleanly", file.display()),
                count => bail!("{} diagnostic(s) in {}", count, file.display()),
            }
        }

        Commands::Config => {
            let config = Config::builder()
                .config_path(config_path)
                .build()
                .context("Failed to load configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn class_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}

/// One script class per file. Reloading a class drops what it installed
/// before, so two files must never share one.
fn script_classes(class: Option<&str>, files: &[PathBuf]) -> Result<Vec<String>> {
    let mut classes: Vec<String> = Vec::with_capacity(files.len());
    for file in files {
        let label = match class {
            Some(class) if files.len() == 1 => class.to_string(),
            Some(class) => format!("{}/{}", class, class_name(file)),
            None => class_name(file),
        };
        if classes.contains(&label) {
            bail!(
                "{} maps to script class '{}', which another file already uses",
                file.display(),
                label
            );
        }
        classes.push(label);
    }
    Ok(classes)
}

/* ===================== Host Functions ===================== */

/// Globals every script run by the CLI can use
fn install_host_functions(engine: &Engine) {
    engine.define_global(
        "print",
        Value::native("print", |_, _, args| {
            let line: Vec<String> = args.as_slice().iter().map(Value::to_display_string).collect();
            println!("{}", line.join(" "));
            Completion::undefined()
        }),
    );
    engine.define_global(
        "log",
        Value::native("log", |_, _, args| {
            let line: Vec<String> = args.as_slice().iter().map(Value::to_display_string).collect();
            tracing::info!(target: "script", "{}", line.join(" "));
            Completion::undefined()
        }),
    );
    // wait(n): suspend the calling script for n steps
    engine.define_global(
        "wait",
        Value::native("wait", |_, _, args| {
            let steps = args.get(0).to_number();
            let steps = if steps.is_finite() && steps > 0.0 { steps as usize } else { 1 };
            Resumable::yield_ticks(steps)
        }),
    );
}

/* ===================== Tick Scheduler ===================== */

struct Task {
    name: String,
    state: TaskState,
}

enum TaskState {
    Running(Resumable),
    Done { ok: bool },
}

impl Task {
    fn new(name: String, completion: Completion) -> Self {
        let state = match completion {
            Completion::Ready(outcome) => TaskState::Done {
                ok: report_outcome(&name, outcome.map(|control| control.into_value())),
            },
            Completion::Pending(resumable) => TaskState::Running(resumable),
        };
        Self { name, state }
    }

    fn is_running(&self) -> bool {
        matches!(self.state, TaskState::Running(_))
    }
}

struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Drive every task to completion; returns how many ended in a fault
    async fn run(&self, mut tasks: Vec<Task>) -> usize {
        let period = Duration::from_millis(self.config.tick_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        let mut tick: u64 = 0;

        while tasks.iter().any(Task::is_running) {
            if self.config.max_ticks.is_some_and(|max| tick >= max) {
                tracing::warn!(tick, "tick limit reached with scripts still suspended");
                break;
            }
            interval.tick().await;
            tick += 1;

            for task in tasks.iter_mut() {
                let state = std::mem::replace(&mut task.state, TaskState::Done { ok: true });
                task.state = match state {
                    TaskState::Running(resumable) => {
                        match resumable.run_with_budget(self.config.steps_per_tick) {
                            Ok(outcome) => {
                                tracing::debug!(task = %task.name, tick, "script finished");
                                TaskState::Done {
                                    ok: report_outcome(
                                        &task.name,
                                        outcome.map(|control| control.into_value()),
                                    ),
                                }
                            }
                            Err(resumable) => TaskState::Running(resumable),
                        }
                    }
                    done => done,
                };
            }
        }

        tasks
            .iter()
            .filter(|task| matches!(task.state, TaskState::Done { ok: false }))
            .count()
    }
}

/// Print a finished task's result; `false` when it faulted
fn report_outcome(name: &str, outcome: std::result::Result<Value, Fault>) -> bool {
    match outcome {
        Ok(Value::Undefined) => true,
        Ok(value) => {
            println!("{} => {}", name, value.to_json());
            true
        }
        Err(fault) => {
            eprintln!("{}: {}", name, fault);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(max_ticks: Option<u64>) -> Scheduler {
        Scheduler::new(SchedulerConfig {
            steps_per_tick: 1,
            tick_interval_ms: 1,
            max_ticks,
            loop_yield_interval: 0,
            max_call_depth: 16,
        })
    }

    fn engine() -> Engine {
        let engine = Engine::new();
        install_host_functions(&engine);
        engine
    }

    #[test]
    fn test_class_name_from_file_stem() {
        assert_eq!(class_name(Path::new("scripts/shopkeeper.json")), "shopkeeper");
    }

    #[test]
    fn test_log_filter_follows_config_flag() {
        let path = std::env::temp_dir().join(format!("cadence-cli-log-{}.toml", std::process::id()));
        std::fs::write(&path, "[logging]\nfilter = \"cadence_core=trace\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "cadence",
            "check",
            "script.json",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(log_filter(&cli), "cadence_core=trace");
        std::fs::remove_file(&path).ok();

        let cli = Cli::try_parse_from(["cadence", "--config", "/no/such/cadence.toml", "config"])
            .unwrap();
        assert_eq!(log_filter(&cli), "warn");
    }

    #[test]
    fn test_script_classes_are_distinct_per_file() {
        let files = vec![PathBuf::from("a.json"), PathBuf::from("npc/b.json")];
        assert_eq!(script_classes(None, &files).unwrap(), vec!["a", "b"]);
        assert_eq!(
            script_classes(Some("shop"), &files).unwrap(),
            vec!["shop/a", "shop/b"]
        );
        assert_eq!(
            script_classes(Some("shop"), &files[..1]).unwrap(),
            vec!["shop"]
        );

        let clash = vec![PathBuf::from("x/npc.json"), PathBuf::from("y/npc.json")];
        assert!(script_classes(None, &clash).is_err());
    }

    #[test]
    fn test_files_under_one_class_keep_their_functions() {
        let dir = std::env::temp_dir().join(format!("cadence-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let function = |name: &str| {
            serde_json::json!({
                "type": "Program",
                "body": [{
                    "type": "FunctionDeclaration",
                    "id": {"type": "Identifier", "name": name},
                    "params": [],
                    "body": {"type": "BlockStatement", "body": []}
                }]
            })
            .to_string()
        };
        let files = vec![dir.join("a.json"), dir.join("b.json")];
        std::fs::write(&files[0], function("openShop")).unwrap();
        std::fs::write(&files[1], function("closeShop")).unwrap();

        let engine = engine();
        let mut library = ScriptLibrary::new(engine.clone());
        for (file, class) in files.iter().zip(script_classes(Some("shop"), &files).unwrap()) {
            library.load_file(&class, file).unwrap();
        }
        assert!(engine.global().get_own("openShop").is_some_and(|f| f.is_callable()));
        assert!(engine.global().get_own("closeShop").is_some_and(|f| f.is_callable()));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_scheduler_finishes_waiting_script() {
        let engine = engine();
        let task = Task::new("waiter".into(), engine.call_global("wait", vec![Value::Number(3.0)]));
        assert!(task.is_running());
        assert_eq!(scheduler(None).run(vec![task]).await, 0);
    }

    #[tokio::test]
    async fn test_scheduler_counts_faulted_scripts() {
        let tasks = vec![
            Task::new("ok".into(), Completion::undefined()),
            Task::new("thrown".into(), Completion::fault(Fault::Throw(Value::from("boom")))),
        ];
        assert_eq!(scheduler(None).run(tasks).await, 1);
    }

    #[tokio::test]
    async fn test_scheduler_stops_at_tick_limit() {
        let engine = engine();
        let task = Task::new(
            "sleeper".into(),
            engine.call_global("wait", vec![Value::Number(1000.0)]),
        );
        // Still suspended when the limit hits; not a failure
        assert_eq!(scheduler(Some(2)).run(vec![task]).await, 0);
    }
}
