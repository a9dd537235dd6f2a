use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use thiserror::Error;

use crate::analysis::{Analysis, AnalysisError, Analyzer};
use crate::corpus::SampleCorpus;
use crate::countdown::{Countdown, TICK_INTERVAL};
use crate::history::{HistoryRecord, ResultLog};
use crate::runtime::AppEvent;
use crate::scoring::ScoreResult;
use crate::session::{Phase, SessionState};
use crate::util::truncate_chars;

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("locked until the countdown ends")]
    Locked,
}

/// User-visible line under the result box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Analyzing,
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
struct PendingAnalysis {
    request: u64,
    elapsed_secs: u32,
}

/// Single owner of the typing session and everything derived from it
pub struct App {
    session: SessionState,
    text: String,
    sample: String,
    result: Option<ScoreResult>,
    status: Option<Status>,
    generation: u64,
    countdown: Option<Countdown>,
    tick_interval: Duration,
    pending: Option<PendingAnalysis>,
    next_request: u64,
    events: Sender<AppEvent>,
    analyzer: Arc<dyn Analyzer>,
    corpus: SampleCorpus,
    history: Option<ResultLog>,
}

impl App {
    pub fn new(
        corpus: SampleCorpus,
        analyzer: Arc<dyn Analyzer>,
        duration_secs: u32,
        events: Sender<AppEvent>,
    ) -> Self {
        let sample = corpus.pick_random_sample().to_string();

        Self {
            session: SessionState::new(duration_secs),
            text: String::new(),
            sample,
            result: None,
            status: None,
            generation: 0,
            countdown: None,
            tick_interval: TICK_INTERVAL,
            pending: None,
            next_request: 0,
            events,
            analyzer,
            corpus,
            history: None,
        }
    }

    pub fn with_history(mut self, history: ResultLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn result(&self) -> Option<&ScoreResult> {
        self.result.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown.as_ref().is_some_and(Countdown::is_running)
    }

    pub fn type_char(&mut self, c: char) {
        if !self.session.accepts_input() {
            return;
        }
        self.text.push(c);
        self.apply_input();
    }

    pub fn backspace(&mut self) {
        if !self.session.accepts_input() {
            return;
        }
        self.text.pop();
        self.apply_input();
    }

    fn apply_input(&mut self) {
        let before = self.session.phase();
        self.session = self.session.on_input(&self.text);

        if before == Phase::Idle && self.session.phase() == Phase::Running {
            tracing::info!(
                generation = self.generation,
                seconds = self.session.duration_secs,
                "typing started"
            );
            // a rejected action from before the start no longer applies
            self.status = None;
            self.countdown = Some(Countdown::start(
                self.events.clone(),
                self.generation,
                self.tick_interval,
            ));
        }
    }

    /// Apply one countdown second; ticks from an abandoned session are dropped
    pub fn on_tick(&mut self, generation: u64) {
        if generation != self.generation || !self.session.is_ticking() {
            tracing::debug!(generation, live = self.generation, "ignoring stale tick");
            return;
        }

        self.session = self.session.on_tick();

        if self.session.phase() == Phase::Expired {
            tracing::info!(generation, "countdown expired, actions unlocked");
            if let Some(mut countdown) = self.countdown.take() {
                countdown.cancel();
            }
        }
    }

    /// Send the typed text off for analysis without blocking the caller
    pub fn analyze(&mut self) -> Result<u64, ActionError> {
        if self.session.locked {
            return Err(ActionError::Locked);
        }

        let request = self.next_request;
        self.next_request += 1;
        self.pending = Some(PendingAnalysis {
            request,
            elapsed_secs: self.session.elapsed_secs(),
        });
        self.status = Some(Status::Analyzing);

        let analyzer = Arc::clone(&self.analyzer);
        let events = self.events.clone();
        let text = self.text.clone();
        thread::spawn(move || {
            let result = analyzer.analyze(&text);
            let _ = events.send(AppEvent::Analysis { request, result });
        });

        tracing::info!(request, chars = self.text.chars().count(), "analysis requested");
        Ok(request)
    }

    pub fn on_analysis(&mut self, request: u64, result: Result<Analysis, AnalysisError>) {
        let pending = match self.pending {
            Some(pending) if pending.request == request => pending,
            _ => {
                tracing::debug!(request, "dropping analysis for an earlier session");
                return;
            }
        };
        self.pending = None;

        match result.and_then(|analysis| ScoreResult::compute(analysis, pending.elapsed_secs)) {
            Ok(score) => {
                tracing::info!(request, wpm = score.wpm, level = %score.level, "analysis complete");
                self.record(&score, pending.elapsed_secs);
                self.result = Some(score);
                self.status = None;
            }
            Err(e) => {
                tracing::warn!(request, error = %e, "analysis failed");
                self.status = Some(Status::Failed(e.to_string()));
            }
        }
    }

    fn record(&self, score: &ScoreResult, elapsed_secs: u32) {
        if let Some(history) = &self.history {
            let record = HistoryRecord::new(score, self.session.duration_secs, elapsed_secs);
            if let Err(e) = history.append(&record) {
                tracing::warn!(path = %history.path().display(), error = %e, "could not record result");
            }
        }
    }

    /// Clear the session; only available once the countdown has ended
    pub fn reset(&mut self) -> Result<(), ActionError> {
        if self.session.locked {
            return Err(ActionError::Locked);
        }
        self.restart();
        Ok(())
    }

    /// Abandon whatever is in progress and start over on a fresh passage
    pub fn restart(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.generation += 1;
        self.session = self.session.reset();
        self.text.clear();
        self.result = None;
        self.status = None;
        self.pending = None;
        self.sample = self.corpus.pick_random_sample().to_string();

        tracing::debug!(
            generation = self.generation,
            sample = %truncate_chars(&self.sample, 32),
            "session reset"
        );
    }

    fn run_action(&mut self, action: fn(&mut Self) -> Result<(), ActionError>) {
        if let Err(e) = action(self) {
            self.status = Some(Status::Failed(e.to_string()));
        }
    }

    fn request_analysis(&mut self) -> Result<(), ActionError> {
        self.analyze().map(|_| ())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let typing = self.session.accepts_input();

        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if ctrl => return Flow::Quit,
            KeyCode::Char('a') if ctrl => self.run_action(Self::request_analysis),
            KeyCode::Char('l') if ctrl => self.run_action(Self::reset),
            KeyCode::Char('n') if ctrl => self.restart(),
            _ if ctrl => {}
            KeyCode::Char(c) if typing => self.type_char(c),
            KeyCode::Enter if typing => self.type_char('\n'),
            KeyCode::Backspace if typing => self.backspace(),
            // text entry is closed from here on, plain keys become actions
            KeyCode::Char('a') | KeyCode::Enter => self.run_action(Self::request_analysis),
            KeyCode::Char('c') => self.run_action(Self::reset),
            _ => {}
        }

        Flow::Continue
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Key(key) => return self.handle_key(key),
            AppEvent::Resize => {}
            AppEvent::Tick { generation } => self.on_tick(generation),
            AppEvent::Analysis { request, result } => self.on_analysis(request, result),
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LocalAnalyzer;
    use std::collections::HashSet;
    use std::sync::mpsc::{self, Receiver};

    const NEVER: Duration = Duration::from_secs(3600);

    struct FailingAnalyzer;

    impl Analyzer for FailingAnalyzer {
        fn analyze(&self, _text: &str) -> Result<Analysis, AnalysisError> {
            Err(AnalysisError::NetworkFailure("connection refused".into()))
        }
    }

    fn app_with(analyzer: Arc<dyn Analyzer>, secs: u32) -> (App, Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let corpus = SampleCorpus::single("hello world".to_string());
        let app = App::new(corpus, analyzer, secs, tx).with_tick_interval(NEVER);
        (app, rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn expire(app: &mut App) {
        for _ in 0..app.session().duration_secs {
            app.on_tick(app.generation());
        }
    }

    fn next_analysis(rx: &Receiver<AppEvent>) -> AppEvent {
        loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                ev @ AppEvent::Analysis { .. } => return ev,
                _ => continue,
            }
        }
    }

    #[test]
    fn test_new_app_is_idle() {
        let (app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);

        assert_eq!(app.session().phase(), Phase::Idle);
        assert_eq!(app.sample(), "hello world");
        assert!(app.text().is_empty());
        assert!(app.result().is_none());
        assert!(!app.is_counting_down());
    }

    #[test]
    fn test_first_keystroke_starts_countdown() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);

        type_str(&mut app, "h");

        assert_eq!(app.session().phase(), Phase::Running);
        assert!(app.is_counting_down());
        assert_eq!(app.text(), "h");
    }

    #[test]
    fn test_typing_does_not_restart_counter() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);

        type_str(&mut app, "he");
        app.on_tick(app.generation());
        type_str(&mut app, "llo");

        assert_eq!(app.session().seconds_remaining, 59);
        assert_eq!(app.text(), "hello");
    }

    #[test]
    fn test_backspace_edits_text() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);

        type_str(&mut app, "hex");
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.text(), "he\n");
    }

    #[test]
    fn test_actions_locked_while_running() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);
        type_str(&mut app, "hello");

        assert_eq!(app.analyze(), Err(ActionError::Locked));
        assert_eq!(app.reset(), Err(ActionError::Locked));

        app.handle_key(ctrl('a'));
        assert_eq!(
            app.status(),
            Some(&Status::Failed("locked until the countdown ends".into()))
        );
        assert_eq!(app.session().phase(), Phase::Running);
    }

    #[test]
    fn test_actions_locked_while_idle() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);
        assert_eq!(app.analyze(), Err(ActionError::Locked));
        assert_eq!(app.reset(), Err(ActionError::Locked));
    }

    #[test]
    fn test_locked_message_cleared_when_typing_starts() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);

        app.handle_key(ctrl('a'));
        assert_eq!(
            app.status(),
            Some(&Status::Failed("locked until the countdown ends".into()))
        );

        type_str(&mut app, "hello");
        app.on_tick(app.generation());

        assert_eq!(app.session().phase(), Phase::Running);
        assert!(app.status().is_none());
    }

    #[test]
    fn test_expiry_unlocks_and_stops_input() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 3);
        type_str(&mut app, "hello");
        expire(&mut app);

        assert_eq!(app.session().phase(), Phase::Expired);
        assert!(!app.session().locked);
        assert!(!app.is_counting_down());

        // plain characters no longer reach the text
        app.type_char('x');
        assert_eq!(app.text(), "hello");
    }

    #[test]
    fn test_stale_tick_after_restart_is_ignored() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);
        type_str(&mut app, "hel");
        let old_generation = app.generation();

        app.handle_key(ctrl('n'));
        assert!(!app.is_counting_down());
        type_str(&mut app, "h");

        app.on_tick(old_generation);
        assert_eq!(app.session().seconds_remaining, 60);

        app.on_tick(app.generation());
        assert_eq!(app.session().seconds_remaining, 59);
    }

    #[test]
    fn test_tick_in_idle_is_ignored() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);
        app.on_tick(app.generation());
        assert_eq!(app.session().seconds_remaining, 60);
    }

    #[test]
    fn test_analyze_after_expiry_scores() {
        let (mut app, rx) = app_with(Arc::new(LocalAnalyzer), 60);
        type_str(&mut app, "hello world");
        expire(&mut app);

        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.status(), Some(&Status::Analyzing));

        let event = next_analysis(&rx);
        app.handle_event(event);

        let result = app.result().unwrap();
        assert_eq!(result.word_count, 2);
        assert_eq!(result.symbol_count, 11);
        assert_eq!(result.wpm, 2);
        assert_eq!(result.summary(), "Very slow (< 20WPM) — 2 WPM");
        assert!(app.status().is_none());
    }

    #[test]
    fn test_analysis_failure_is_surfaced() {
        let (mut app, rx) = app_with(Arc::new(FailingAnalyzer), 2);
        type_str(&mut app, "hi");
        expire(&mut app);

        app.analyze().unwrap();
        app.handle_event(next_analysis(&rx));

        assert!(app.result().is_none());
        assert_eq!(
            app.status(),
            Some(&Status::Failed(
                "analysis service unavailable: connection refused".into()
            ))
        );
        // the session itself is untouched
        assert_eq!(app.session().phase(), Phase::Expired);
        assert_eq!(app.text(), "hi");
    }

    #[test]
    fn test_zero_elapsed_is_surfaced() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);
        app.pending = Some(PendingAnalysis {
            request: 9,
            elapsed_secs: 0,
        });

        app.on_analysis(
            9,
            Ok(Analysis {
                words: 2,
                symbols: 11,
            }),
        );

        assert_eq!(
            app.status(),
            Some(&Status::Failed(AnalysisError::ZeroElapsed.to_string()))
        );
        assert!(app.result().is_none());
    }

    #[test]
    fn test_analysis_from_before_reset_is_dropped() {
        let (mut app, rx) = app_with(Arc::new(LocalAnalyzer), 1);
        type_str(&mut app, "hello world");
        expire(&mut app);
        app.analyze().unwrap();
        let event = next_analysis(&rx);

        app.reset().unwrap();
        app.handle_event(event);

        assert!(app.result().is_none());
        assert!(app.status().is_none());
    }

    #[test]
    fn test_reset_restores_fresh_session() {
        let (mut app, rx) = app_with(Arc::new(LocalAnalyzer), 60);
        type_str(&mut app, "hello world");
        expire(&mut app);
        app.analyze().unwrap();
        app.handle_event(next_analysis(&rx));
        assert!(app.result().is_some());

        app.handle_key(key(KeyCode::Char('c')));

        let session = app.session();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.seconds_remaining, 60);
        assert!(session.locked);
        assert!(!session.has_started);
        assert!(app.text().is_empty());
        assert!(app.result().is_none());
        assert_eq!(app.sample(), "hello world");
    }

    #[test]
    fn test_reset_picks_a_new_sample() {
        let (tx, _rx) = mpsc::channel();
        let corpus = SampleCorpus::from_json(
            r#"{"name": "pair", "passages": ["first passage", "second passage"]}"#,
        )
        .unwrap();
        let passages = corpus.passages.clone();
        let mut app = App::new(corpus, Arc::new(LocalAnalyzer), 1, tx).with_tick_interval(NEVER);

        let mut seen = HashSet::new();
        seen.insert(app.sample().to_string());
        for _ in 0..200 {
            type_str(&mut app, "x");
            expire(&mut app);
            app.handle_key(key(KeyCode::Char('c')));

            assert_eq!(app.session().phase(), Phase::Idle);
            assert!(passages.iter().any(|p| p == app.sample()));
            seen.insert(app.sample().to_string());
        }

        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_escape_and_ctrl_c_quit() {
        let (mut app, _rx) = app_with(Arc::new(LocalAnalyzer), 60);
        assert_eq!(app.handle_key(key(KeyCode::Esc)), Flow::Quit);
        assert_eq!(app.handle_key(ctrl('c')), Flow::Quit);
        assert_eq!(app.handle_key(key(KeyCode::Char('c'))), Flow::Continue);
    }

    #[test]
    fn test_successful_analysis_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResultLog::with_path(dir.path().join("history.csv"));
        let (mut app, rx) = app_with(Arc::new(LocalAnalyzer), 1);
        app = app.with_history(log.clone());

        type_str(&mut app, "one two three");
        expire(&mut app);
        app.analyze().unwrap();
        app.handle_event(next_analysis(&rx));

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].words, 3);
        assert_eq!(records[0].wpm, 180);
        assert_eq!(records[0].elapsed_secs, 1);
    }

    #[test]
    fn test_countdown_ticks_reach_the_channel() {
        let (tx, rx) = mpsc::channel();
        let corpus = SampleCorpus::single("hi".to_string());
        let mut app = App::new(corpus, Arc::new(LocalAnalyzer), 2, tx)
            .with_tick_interval(Duration::from_millis(5));

        app.type_char('h');

        while app.session().phase() != Phase::Expired {
            let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            app.handle_event(event);
        }
        assert!(!app.session().locked);
        assert!(!app.is_counting_down());
    }
}
