use argh::FromArgs;
use log::debug;
use shell_pipeline::{Config, Halt, Interpreter};
use std::io;
use std::process::ExitCode;

#[derive(FromArgs)]
/// Line-oriented shell with pipes, redirection and command substitution.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit.
    command: Option<String>,

    #[argh(option, default = "String::from(shell_pipeline::config::DEFAULT_PROMPT)")]
    /// prompt shown by the interactive loop.
    prompt: String,

    #[argh(option, default = "shell_pipeline::config::DEFAULT_MAX_SUBSTITUTION_DEPTH")]
    /// how deeply command substitutions may nest.
    max_depth: usize,
}

fn init_logging() {
    let env = env_logger::Env::default().filter_or("SHELL_LOG", "warn");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let args: Args = argh::from_env();

    let config = Config {
        prompt: args.prompt,
        max_substitution_depth: args.max_depth,
    };
    let mut sh = Interpreter::default().with_config(config);

    if let Some(line) = args.command {
        debug!("main event=one-shot");
        return match sh.parse_and_evaluate(&line, &mut io::stdout()) {
            Ok(()) | Err(Halt::Exit) => ExitCode::SUCCESS,
            Err(Halt::Failed(err)) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    match sh.repl() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
