use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::Duration,
};
use typetally::{
    app::{App, Flow},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::SampleCorpus,
    history::ResultLog,
    logging,
    runtime::{CrosstermEventSource, EventSource, Runner},
};

const POLL_RATE_MS: u64 = 100;

/// timed typing practice with words-per-minute levels
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type the sample passage before the countdown runs out, then analyze your words per minute and typing level."
)]
pub struct Cli {
    /// length of the countdown in seconds
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// text analysis endpoint that answers {"words", "symbols"}
    #[clap(short = 'e', long)]
    endpoint: Option<String>,

    /// count words locally instead of calling the analysis endpoint
    #[clap(long)]
    offline: bool,

    /// analysis request timeout in seconds
    #[clap(long)]
    timeout: Option<u64>,

    /// json file of passages to practice with ({"name": .., "passages": [..]})
    #[clap(long)]
    samples: Option<PathBuf>,

    /// custom passage to type instead of a random sample
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// print a summary of past sessions and exit
    #[clap(long)]
    history: bool,

    /// store the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the stored configuration
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(seconds) = self.seconds {
            cfg.duration_secs = seconds;
        }
        if let Some(ref endpoint) = self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if self.offline {
            cfg.offline = true;
        }
        if let Some(timeout) = self.timeout {
            cfg.request_timeout_secs = timeout;
        }
        if let Some(ref samples) = self.samples {
            cfg.samples = Some(samples.clone());
        }
        cfg
    }

    fn corpus(&self, cfg: &Config) -> Result<SampleCorpus, Box<dyn Error>> {
        if let Some(ref prompt) = self.prompt {
            return Ok(SampleCorpus::single(prompt.clone()));
        }
        let corpus = match cfg.samples {
            Some(ref path) => SampleCorpus::from_path(path)?,
            None => SampleCorpus::builtin()?,
        };
        Ok(corpus)
    }
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let Some(log) = ResultLog::new() else {
        println!("no state directory available");
        return Ok(());
    };

    match log.summary()? {
        Some(summary) => println!("{summary}"),
        None => println!("no sessions recorded yet"),
    }
    Ok(())
}

/// Logging comes up before the stored config is read so load problems are recorded
fn load_config<S: ConfigStore>(cli: &Cli, store: &S, log_path: Option<&Path>) -> Config {
    if let Some(log_path) = log_path {
        if let Err(e) = logging::init(log_path) {
            eprintln!("logging disabled: {e}");
        }
    }
    cli.apply(store.load())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.history {
        return print_history();
    }

    let store = FileConfigStore::new();
    let cfg = load_config(&cli, &store, AppDirs::log_path().as_deref());
    if let Err(e) = cfg.validate() {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }
    if cli.save_config {
        store.save(&cfg)?;
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let corpus = cli.corpus(&cfg)?;
    let analyzer = cfg.build_analyzer()?;
    tracing::info!(
        corpus = %corpus.name,
        seconds = cfg.duration_secs,
        offline = cfg.offline,
        endpoint = %cfg.endpoint,
        "starting session"
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(POLL_RATE_MS),
    );
    let mut app = App::new(corpus, analyzer, cfg.duration_secs, runner.sender());
    if let Some(log) = ResultLog::new() {
        app = app.with_history(log);
    }

    let outcome = start_tui(&mut terminal, &mut app, &runner);

    // unmount: stop the countdown before the terminal goes back to normal
    drop(app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        if let Some(event) = runner.step() {
            if app.handle_event(event) == Flow::Quit {
                tracing::info!("quit requested");
                break;
            }
        }

        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
